//! The resolved, validated, in-memory gateway — the output of the loader and
//! the input every other component (matcher, addressing, session engine)
//! reads for the lifetime of the process. Immutable once built.

use std::time::Duration;

use regex::Regex;

/// Process-wide singleton materialised by [`crate::loader::load_gateway`].
#[derive(Debug)]
pub struct Gateway {
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub protocol_version: u8,
    pub inverse_protocol_version: u8,
    pub vin: [u8; 17],
    pub eid: [u8; 6],
    pub gid: [u8; 6],
    pub logical_address: u16,
    /// Declaration order is significant: functional fanout and the response
    /// list exposed to callers preserve it.
    pub ecus: Vec<Ecu>,
    /// Status bytes the UDP responder cycles through for Diagnostic Power
    /// Mode requests; defaults to a single `0x01` ("ready").
    pub power_mode_cycle: Vec<u8>,
}

impl Gateway {
    /// Physical address resolution: the single ECU whose `target_address`
    /// matches, if any.
    pub fn find_physical(&self, target_address: u16) -> Option<&Ecu> {
        self.ecus.iter().find(|e| e.target_address == target_address)
    }

    /// Functional address resolution: every ECU declaring this functional
    /// group address, in declaration order.
    pub fn find_functional(&self, functional_address: u16) -> Vec<&Ecu> {
        self.ecus
            .iter()
            .filter(|e| e.functional_address == Some(functional_address))
            .collect()
    }
}

/// A virtual ECU, keyed by its unique target address.
#[derive(Debug)]
pub struct Ecu {
    pub name: String,
    pub description: String,
    pub target_address: u16,
    pub functional_address: Option<u16>,
    pub tester_addresses: Vec<u16>,
    pub catalog: ServiceCatalog,
}

impl Ecu {
    pub fn allows_tester(&self, source_address: u16) -> bool {
        self.tester_addresses.contains(&source_address)
    }
}

/// An ECU's resolved set of services, in declaration order. Matching order
/// matters: services are tried in this order and the first match wins.
#[derive(Debug, Default)]
pub struct ServiceCatalog {
    pub entries: Vec<ServiceEntry>,
}

impl ServiceCatalog {
    pub fn iter(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter()
    }
}

/// A compiled request-matching pattern: either an exact uppercase hex string
/// (no `0x` prefix, no separators) or a pre-compiled case-insensitive regex.
#[derive(Debug)]
pub enum RequestPattern {
    Exact(String),
    Regex(Regex),
}

/// A single named service within an ECU's catalog.
#[derive(Debug)]
pub struct ServiceEntry {
    pub name: String,
    pub request: RequestPattern,
    pub responses: Vec<ResponseEntry>,
    pub supports_functional: bool,
    pub no_response: bool,
    pub delay_ms: Option<u64>,
}

/// One entry in a service's response cycle.
#[derive(Debug, Clone)]
pub struct ResponseEntry {
    pub bytes: Vec<u8>,
    pub delay_ms: Option<u64>,
}
