//! The service matcher: exact match first, then regex, honoring
//! functional-addressing eligibility.

use doip_config::model::{RequestPattern, ServiceCatalog, ServiceEntry};

use crate::error::MatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Physical,
    Functional,
}

/// Render UDS payload bytes as the canonical uppercase hex string (no
/// separators, no `0x` prefix) requests are matched against.
pub fn render_hex(uds_bytes: &[u8]) -> String {
    uds_bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Find the first service in `catalog` matching `uds_bytes` under `mode`.
/// Exact patterns are tried in declaration order before any regex pattern is
/// tried, also in declaration order. A candidate whose
/// `supports_functional` is false is skipped (not merely rejected) when
/// `mode` is [`AddressMode::Functional`] — matching continues past it.
pub fn match_service<'a>(
    catalog: &'a ServiceCatalog,
    uds_bytes: &[u8],
    mode: AddressMode,
) -> Result<&'a ServiceEntry, MatchError> {
    let hex = render_hex(uds_bytes);
    let eligible = |entry: &ServiceEntry| mode == AddressMode::Physical || entry.supports_functional;

    for entry in catalog.iter() {
        if let RequestPattern::Exact(pattern) = &entry.request {
            if pattern == &hex && eligible(entry) {
                return Ok(entry);
            }
        }
    }

    let prefixed = format!("0x{hex}");
    for entry in catalog.iter() {
        if let RequestPattern::Regex(regex) = &entry.request {
            if (regex.is_match(&hex) || regex.is_match(&prefixed)) && eligible(entry) {
                return Ok(entry);
            }
        }
    }

    Err(MatchError::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doip_config::model::{ResponseEntry, ServiceEntry};
    use regex::Regex;

    fn exact_entry(name: &str, request: &str, supports_functional: bool) -> ServiceEntry {
        ServiceEntry {
            name: name.to_string(),
            request: RequestPattern::Exact(request.to_string()),
            responses: vec![ResponseEntry {
                bytes: vec![0x62],
                delay_ms: None,
            }],
            supports_functional,
            no_response: false,
            delay_ms: None,
        }
    }

    #[test]
    fn exact_match_is_preferred_over_regex() {
        let mut catalog = ServiceCatalog::default();
        catalog.entries.push(ServiceEntry {
            name: "regex_any".to_string(),
            request: RequestPattern::Regex(Regex::new("(?i)^22.*$").unwrap()),
            responses: vec![ResponseEntry {
                bytes: vec![0x01],
                delay_ms: None,
            }],
            supports_functional: true,
            no_response: false,
            delay_ms: None,
        });
        catalog.entries.push(exact_entry("exact_vin", "22F190", true));

        let found = match_service(&catalog, &[0x22, 0xF1, 0x90], AddressMode::Physical).unwrap();
        assert_eq!(found.name, "exact_vin");
    }

    #[test]
    fn functional_mode_skips_physical_only_service() {
        let mut catalog = ServiceCatalog::default();
        catalog.entries.push(exact_entry("physical_only", "22F190", false));
        assert_eq!(
            match_service(&catalog, &[0x22, 0xF1, 0x90], AddressMode::Functional),
            Err(MatchError::NoMatch)
        );
        assert!(match_service(&catalog, &[0x22, 0xF1, 0x90], AddressMode::Physical).is_ok());
    }

    #[test]
    fn regex_matches_with_and_without_0x_prefix() {
        let mut catalog = ServiceCatalog::default();
        catalog.entries.push(ServiceEntry {
            name: "rpm".to_string(),
            request: RequestPattern::Regex(Regex::new("(?i)^220C[0-9A-F]{2}$").unwrap()),
            responses: vec![ResponseEntry {
                bytes: vec![0x62],
                delay_ms: None,
            }],
            supports_functional: true,
            no_response: false,
            delay_ms: None,
        });

        assert!(match_service(&catalog, &[0x22, 0x0C, 0x01], AddressMode::Physical).is_ok());
        // does not match a 4-byte request (one extra trailing byte)
        assert_eq!(
            match_service(&catalog, &[0x22, 0x0C, 0x01, 0x00], AddressMode::Physical),
            Err(MatchError::NoMatch)
        );
    }
}
