//! Resolves a gateway document into a fully validated, in-memory [`Gateway`]:
//! parse the gateway document, load and validate each referenced ECU
//! document, merge and normalise each ECU's service catalog files, then
//! check cross-ECU and intra-catalog uniqueness.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use crate::documents::{EcuDocument, GatewayDocument, ResponseDocument, ServiceCatalogDocument, ServiceEntryDocument};
use crate::error::ConfigError;
use crate::hexutil::{parse_hex_bytes, parse_u16_address, parse_u8, to_upper_hex};
use crate::model::{Ecu, Gateway, RequestPattern, ResponseEntry, ServiceCatalog, ServiceEntry};

/// Load and fully resolve a gateway rooted at `gateway_path`. All relative
/// references (ECU files, service catalog files) are resolved relative to
/// the directory containing the file that names them.
pub fn load_gateway(gateway_path: impl AsRef<Path>) -> Result<Gateway, ConfigError> {
    let gateway_path = gateway_path.as_ref();
    let base_dir = gateway_path.parent().unwrap_or_else(|| Path::new("."));

    let doc: GatewayDocument = parse_yaml(gateway_path)?;

    let protocol_version =
        parse_u8(&doc.protocol.version).map_err(|reason| ConfigError::schema(gateway_path, "protocol.version", reason))?;
    let inverse_protocol_version = match &doc.protocol.inverse_version {
        Some(s) => parse_u8(s).map_err(|reason| ConfigError::schema(gateway_path, "protocol.inverse_version", reason))?,
        None => !protocol_version,
    };

    let vin = parse_vin(&doc.vehicle.vin).map_err(|reason| ConfigError::schema(gateway_path, "vehicle.vin", reason))?;
    let eid = parse_fixed_hex::<6>(&doc.vehicle.eid)
        .map_err(|reason| ConfigError::schema(gateway_path, "vehicle.eid", reason))?;
    let gid = parse_fixed_hex::<6>(&doc.vehicle.gid)
        .map_err(|reason| ConfigError::schema(gateway_path, "vehicle.gid", reason))?;
    let logical_address = parse_u16_address(&doc.vehicle.logical_address)
        .map_err(|reason| ConfigError::schema(gateway_path, "vehicle.logical_address", reason))?;

    let power_mode_cycle = doc
        .power_mode
        .status_cycle
        .iter()
        .map(|s| parse_u8(s))
        .collect::<Result<Vec<u8>, String>>()
        .map_err(|reason| ConfigError::schema(gateway_path, "power_mode.status_cycle", reason))?;

    let mut ecus = Vec::with_capacity(doc.ecus.len());
    let mut seen_targets: HashSet<u16> = HashSet::new();
    for ecu_rel_path in &doc.ecus {
        let ecu_path = base_dir.join(ecu_rel_path);
        let ecu = load_ecu(&ecu_path)?;
        if !seen_targets.insert(ecu.target_address) {
            return Err(ConfigError::DuplicateTarget {
                address: ecu.target_address,
            });
        }
        ecus.push(ecu);
    }

    let total_services: usize = ecus.iter().map(|e| e.catalog.entries.len()).sum();
    info!(
        ecus = ecus.len(),
        services = total_services,
        gateway = %doc.name,
        "configuration load summary"
    );

    Ok(Gateway {
        name: doc.name,
        description: doc.description,
        host: doc.network.host,
        port: doc.network.port,
        max_connections: doc.network.max_connections,
        idle_timeout: Duration::from_secs(doc.network.timeout_s),
        protocol_version,
        inverse_protocol_version,
        vin,
        eid,
        gid,
        logical_address,
        ecus,
        power_mode_cycle,
    })
}

fn load_ecu(ecu_path: &Path) -> Result<Ecu, ConfigError> {
    let base_dir = ecu_path.parent().unwrap_or_else(|| Path::new("."));
    let doc: EcuDocument = parse_yaml(ecu_path)?;

    let target_address = parse_u16_address(&doc.target_address)
        .map_err(|reason| ConfigError::schema(ecu_path, "target_address", reason))?;
    let functional_address = doc
        .functional_address
        .as_deref()
        .map(parse_u16_address)
        .transpose()
        .map_err(|reason| ConfigError::schema(ecu_path, "functional_address", reason))?;
    let tester_addresses = doc
        .tester_addresses
        .iter()
        .map(|s| parse_u16_address(s))
        .collect::<Result<Vec<u16>, String>>()
        .map_err(|reason| ConfigError::schema(ecu_path, "tester_addresses", reason))?;

    // Parse and merge every service catalog file this ECU references, later
    // files overriding earlier keys within the same section (with a warning).
    let mut merged: HashMap<String, HashMap<String, ServiceEntryDocument>> = HashMap::new();
    for file_rel in &doc.uds_services.files {
        let file_path = base_dir.join(file_rel);
        let sections: ServiceCatalogDocument = parse_yaml(&file_path)?;
        for (section_name, entries) in sections {
            let section = merged.entry(section_name.clone()).or_default();
            for (service_name, entry) in entries {
                if section.contains_key(&service_name) {
                    warn!(
                        ecu = %doc.name,
                        file = %file_path.display(),
                        section = %section_name,
                        service = %service_name,
                        "service definition overridden by later catalog file"
                    );
                }
                section.insert(service_name, entry);
            }
        }
    }

    // Build this ECU's effective catalog from its common_services and
    // specific_services name lists, in declaration order.
    let mut entries = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    for (section_name, names) in [
        ("common_services", &doc.uds_services.common_services),
        ("specific_services", &doc.uds_services.specific_services),
    ] {
        let section = merged.get(section_name);
        for name in names {
            let raw = section
                .and_then(|s| s.get(name))
                .ok_or_else(|| ConfigError::Reference {
                    path: ecu_path.to_path_buf(),
                    reference: format!("{section_name}.{name}"),
                })?;
            if !seen_names.insert(name.clone()) {
                continue; // same name referenced from both lists: keep first
            }
            entries.push(normalize_service(ecu_path, name, raw)?);
        }
    }

    validate_catalog_uniqueness(&doc.name, &entries)?;

    Ok(Ecu {
        name: doc.name,
        description: doc.description,
        target_address,
        functional_address,
        tester_addresses,
        catalog: ServiceCatalog { entries },
    })
}

// Normalise a raw service entry's request pattern and responses, and
// validate `no_response` consistency.
fn normalize_service(
    ecu_path: &Path,
    name: &str,
    raw: &ServiceEntryDocument,
) -> Result<ServiceEntry, ConfigError> {
    let request = if let Some(pattern) = raw.request.strip_prefix("regex:") {
        let compiled = Regex::new(&format!("(?i){pattern}")).map_err(|source| ConfigError::BadRegex {
            context: format!("{}: service {name}", ecu_path.display()),
            pattern: pattern.to_string(),
            source,
        })?;
        RequestPattern::Regex(compiled)
    } else {
        let cleaned = raw
            .request
            .strip_prefix("0x")
            .or_else(|| raw.request.strip_prefix("0X"))
            .unwrap_or(&raw.request);
        if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::BadHex {
                context: format!("{}: service {name}", ecu_path.display()),
                value: raw.request.clone(),
            });
        }
        RequestPattern::Exact(cleaned.to_uppercase())
    };

    let responses: Vec<ResponseEntry> = raw
        .responses
        .iter()
        .map(|r| match r {
            ResponseDocument::Bare(hex) => parse_hex_bytes(hex)
                .map(|bytes| ResponseEntry { bytes, delay_ms: None })
                .map_err(|reason| ConfigError::schema(ecu_path, format!("service {name}.responses"), reason)),
            ResponseDocument::Detailed { response, delay_ms } => parse_hex_bytes(response)
                .map(|bytes| ResponseEntry {
                    bytes,
                    delay_ms: *delay_ms,
                })
                .map_err(|reason| ConfigError::schema(ecu_path, format!("service {name}.responses"), reason)),
        })
        .collect::<Result<_, _>>()?;

    if raw.no_response && !responses.is_empty() {
        warn!(
            service = %name,
            "no_response is true but responses were also configured; responses will be ignored"
        );
    }
    if !raw.no_response && responses.is_empty() {
        return Err(ConfigError::schema(
            ecu_path,
            format!("service {name}"),
            "must have at least one response or set no_response: true",
        ));
    }

    Ok(ServiceEntry {
        name: name.to_string(),
        request,
        responses,
        supports_functional: raw.supports_functional,
        no_response: raw.no_response,
        delay_ms: raw.delay_ms,
    })
}

// Within one ECU's catalog, (request pattern, supports_functional) must be
// unique — two services cannot shadow each other on the same traffic.
fn validate_catalog_uniqueness(ecu_name: &str, entries: &[ServiceEntry]) -> Result<(), ConfigError> {
    let mut seen: HashSet<(String, bool)> = HashSet::new();
    for entry in entries {
        let key_str = match &entry.request {
            RequestPattern::Exact(s) => format!("exact:{s}"),
            RequestPattern::Regex(r) => format!("regex:{}", r.as_str()),
        };
        if !seen.insert((key_str.clone(), entry.supports_functional)) {
            return Err(ConfigError::DuplicateService {
                ecu: ecu_name.to_string(),
                request: key_str,
                supports_functional: entry.supports_functional,
            });
        }
    }
    Ok(())
}

fn parse_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::parse(path, e))
}

fn parse_vin(s: &str) -> Result<[u8; 17], String> {
    let bytes = s.as_bytes();
    if bytes.len() != 17 || !bytes.iter().all(|b| b.is_ascii()) {
        return Err(format!("VIN must be exactly 17 ASCII bytes, got {} bytes", bytes.len()));
    }
    let mut vin = [0u8; 17];
    vin.copy_from_slice(bytes);
    Ok(vin)
}

fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() != N {
        return Err(format!("expected {N} bytes, got {}", bytes.len()));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Render the canonical uppercase-no-prefix hex form of a byte slice; used by
/// `doip-runtime` to canonicalise incoming UDS bytes before matching.
pub fn render_hex(bytes: &[u8]) -> String {
    to_upper_hex(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_minimal_gateway() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "services.yaml",
            r#"
common_services:
  read_vin:
    request: "22F190"
    responses:
      - "62F1901234567890ABCDEF"
"#,
        );
        write(
            dir.path(),
            "ecu.yaml",
            r#"
name: "Engine ECU"
target_address: "0x1000"
tester_addresses: ["0x0E00"]
uds_services:
  files: ["services.yaml"]
  common_services: ["read_vin"]
"#,
        );
        let gateway_path = write(
            dir.path(),
            "gateway.yaml",
            r#"
name: "Test Gateway"
network:
  host: "0.0.0.0"
  port: 13400
  max_connections: 8
  timeout_s: 5
protocol:
  version: "0x02"
vehicle:
  vin: "WVWZZZ1JZXW000001"
  eid: "AABBCCDDEEFF"
  gid: "112233445566"
  logical_address: "0x1000"
ecus: ["ecu.yaml"]
"#,
        );

        let gateway = load_gateway(&gateway_path).unwrap();
        assert_eq!(gateway.protocol_version, 0x02);
        assert_eq!(gateway.inverse_protocol_version, 0xFD);
        assert_eq!(gateway.ecus.len(), 1);
        assert_eq!(gateway.ecus[0].catalog.entries.len(), 1);
        assert_eq!(gateway.ecus[0].target_address, 0x1000);
    }

    #[test]
    fn duplicate_target_address_is_rejected() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "services.yaml",
            r#"
common_services:
  read_vin:
    request: "22F190"
    responses: ["62F190"]
"#,
        );
        for n in ["a.yaml", "b.yaml"] {
            write(
                dir.path(),
                n,
                r#"
name: "ECU"
target_address: "0x1000"
tester_addresses: ["0x0E00"]
uds_services:
  files: ["services.yaml"]
  common_services: ["read_vin"]
"#,
            );
        }
        let gateway_path = write(
            dir.path(),
            "gateway.yaml",
            r#"
name: "Test Gateway"
network: {host: "0.0.0.0", port: 13400, max_connections: 8, timeout_s: 5}
protocol: {version: "0x02"}
vehicle:
  vin: "WVWZZZ1JZXW000001"
  eid: "AABBCCDDEEFF"
  gid: "112233445566"
  logical_address: "0x1000"
ecus: ["a.yaml", "b.yaml"]
"#,
        );

        let err = load_gateway(&gateway_path).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTarget { address: 0x1000 }));
    }

    #[test]
    fn unknown_service_reference_is_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "services.yaml", "common_services: {}\n");
        write(
            dir.path(),
            "ecu.yaml",
            r#"
name: "ECU"
target_address: "0x1000"
tester_addresses: ["0x0E00"]
uds_services:
  files: ["services.yaml"]
  common_services: ["does_not_exist"]
"#,
        );
        let gateway_path = write(
            dir.path(),
            "gateway.yaml",
            r#"
name: "Test Gateway"
network: {host: "0.0.0.0", port: 13400, max_connections: 8, timeout_s: 5}
protocol: {version: "0x02"}
vehicle:
  vin: "WVWZZZ1JZXW000001"
  eid: "AABBCCDDEEFF"
  gid: "112233445566"
  logical_address: "0x1000"
ecus: ["ecu.yaml"]
"#,
        );

        let err = load_gateway(&gateway_path).unwrap_err();
        assert!(matches!(err, ConfigError::Reference { .. }));
    }

    #[test]
    fn no_response_true_with_responses_warns_but_succeeds() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "services.yaml",
            r#"
common_services:
  clear_dtc:
    request: "14FFFFFF"
    no_response: true
    responses: ["54"]
"#,
        );
        write(
            dir.path(),
            "ecu.yaml",
            r#"
name: "ECU"
target_address: "0x1000"
tester_addresses: ["0x0E00"]
uds_services:
  files: ["services.yaml"]
  common_services: ["clear_dtc"]
"#,
        );
        let gateway_path = write(
            dir.path(),
            "gateway.yaml",
            r#"
name: "Test Gateway"
network: {host: "0.0.0.0", port: 13400, max_connections: 8, timeout_s: 5}
protocol: {version: "0x02"}
vehicle:
  vin: "WVWZZZ1JZXW000001"
  eid: "AABBCCDDEEFF"
  gid: "112233445566"
  logical_address: "0x1000"
ecus: ["ecu.yaml"]
"#,
        );

        let gateway = load_gateway(&gateway_path).unwrap();
        assert!(gateway.ecus[0].catalog.entries[0].no_response);
    }
}
