//! Raw `serde::Deserialize` shapes for the three YAML document kinds:
//! gateway, ECU, and service catalog. These are intentionally permissive
//! (addresses and byte strings are plain `String`s) — [`crate::loader`] does
//! the strict validation so failures carry a file+key pointer instead of a
//! raw serde error.

use std::collections::HashMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GatewayDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub network: NetworkSection,
    pub protocol: ProtocolSection,
    pub vehicle: VehicleSection,
    pub ecus: Vec<String>,
    #[serde(default)]
    pub power_mode: PowerModeSection,
}

/// UDP diagnostic power mode status cycle. Defaults to a single "ready"
/// status of `0x01` when omitted.
#[derive(Debug, Deserialize)]
pub struct PowerModeSection {
    #[serde(default = "default_power_mode_cycle")]
    pub status_cycle: Vec<String>,
}

impl Default for PowerModeSection {
    fn default() -> Self {
        Self {
            status_cycle: default_power_mode_cycle(),
        }
    }
}

fn default_power_mode_cycle() -> Vec<String> {
    vec!["0x01".to_string()]
}

#[derive(Debug, Deserialize)]
pub struct NetworkSection {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub timeout_s: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolSection {
    pub version: String,
    #[serde(default)]
    pub inverse_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VehicleSection {
    pub vin: String,
    pub eid: String,
    pub gid: String,
    pub logical_address: String,
}

#[derive(Debug, Deserialize)]
pub struct EcuDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target_address: String,
    #[serde(default)]
    pub functional_address: Option<String>,
    #[serde(default)]
    pub tester_addresses: Vec<String>,
    pub uds_services: UdsServicesSection,
}

#[derive(Debug, Deserialize)]
pub struct UdsServicesSection {
    pub files: Vec<String>,
    #[serde(default)]
    pub common_services: Vec<String>,
    #[serde(default)]
    pub specific_services: Vec<String>,
}

/// A service catalog file: section name (e.g. `common_services`) -> service
/// name -> entry.
pub type ServiceCatalogDocument = HashMap<String, HashMap<String, ServiceEntryDocument>>;

#[derive(Debug, Deserialize)]
pub struct ServiceEntryDocument {
    pub request: String,
    #[serde(default)]
    pub responses: Vec<ResponseDocument>,
    #[serde(default = "default_true")]
    pub supports_functional: bool,
    #[serde(default)]
    pub no_response: bool,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResponseDocument {
    Bare(String),
    Detailed {
        response: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
}
