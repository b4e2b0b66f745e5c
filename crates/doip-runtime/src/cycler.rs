//! The response cycler: the only mutable process-wide state in the gateway.
//! Guarded by a single mutex, the same way session state elsewhere in this
//! codebase is guarded with `parking_lot`.

use std::collections::HashMap;

use doip_config::model::ServiceEntry;
use parking_lot::Mutex;

/// What the cycler produced for a matched service.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// `no_response: true` — emit no UDS response body; cycle state is
    /// untouched.
    NoBody,
    Response {
        bytes: Vec<u8>,
        delay_ms: u64,
        index: usize,
    },
}

type CycleKey = (u16, String);

/// Shared, mutex-guarded table mapping `(target_address, service_name)` to
/// the next response index. Owned by the server orchestrator and shared by
/// every concurrent session so all sessions observe the same rotation.
#[derive(Default)]
pub struct CycleTable {
    next_index: Mutex<HashMap<CycleKey, usize>>,
}

impl CycleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the next response for `entry` on `target_address`, advancing
    /// the cycle state atomically. Computes the effective delay as
    /// `response.delay_ms` else `entry.delay_ms` else `0`.
    pub fn select(&self, target_address: u16, entry: &ServiceEntry) -> CycleOutcome {
        if entry.no_response {
            return CycleOutcome::NoBody;
        }

        let key: CycleKey = (target_address, entry.name.clone());
        let mut table = self.next_index.lock();
        let index = *table.get(&key).unwrap_or(&0);
        let response = &entry.responses[index % entry.responses.len()];
        let next = (index + 1) % entry.responses.len();
        table.insert(key, next);

        let delay_ms = response.delay_ms.or(entry.delay_ms).unwrap_or(0);
        CycleOutcome::Response {
            bytes: response.bytes.clone(),
            delay_ms,
            index,
        }
    }

    pub fn reset_all(&self) {
        self.next_index.lock().clear();
    }

    pub fn reset_ecu(&self, target_address: u16) {
        self.next_index.lock().retain(|(addr, _), _| *addr != target_address);
    }

    pub fn reset_service(&self, service_name: &str) {
        self.next_index.lock().retain(|(_, name), _| name != service_name);
    }

    pub fn reset_target_service(&self, target_address: u16, service_name: &str) {
        self.next_index.lock().remove(&(target_address, service_name.to_string()));
    }

    /// Generic index cycling for keys that aren't a catalog [`ServiceEntry`]
    /// — used by the UDP responder's Diagnostic Power Mode status cycle,
    /// which reuses this table with a synthetic key rather than a second,
    /// parallel piece of mutable state.
    pub fn next_raw_index(&self, target_address: u16, key_name: &str, len: usize) -> usize {
        let key: CycleKey = (target_address, key_name.to_string());
        let mut table = self.next_index.lock();
        let index = *table.get(&key).unwrap_or(&0) % len;
        table.insert(key, (index + 1) % len);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doip_config::model::{RequestPattern, ResponseEntry};

    fn entry_with(responses: Vec<&str>, no_response: bool) -> ServiceEntry {
        ServiceEntry {
            name: "svc".to_string(),
            request: RequestPattern::Exact("22F190".to_string()),
            responses: responses
                .into_iter()
                .map(|h| ResponseEntry {
                    bytes: vec![u8::from_str_radix(h, 16).unwrap()],
                    delay_ms: None,
                })
                .collect(),
            supports_functional: true,
            no_response,
            delay_ms: None,
        }
    }

    #[test]
    fn cycles_through_responses_and_wraps() {
        let table = CycleTable::new();
        let entry = entry_with(vec!["AA", "BB", "CC"], false);

        let r1 = table.select(0x1000, &entry);
        let r2 = table.select(0x1000, &entry);
        let r3 = table.select(0x1000, &entry);
        let r4 = table.select(0x1000, &entry);

        let bytes = |o: &CycleOutcome| match o {
            CycleOutcome::Response { bytes, .. } => bytes.clone(),
            CycleOutcome::NoBody => panic!("expected a response"),
        };
        assert_eq!(bytes(&r1), vec![0xAA]);
        assert_eq!(bytes(&r2), vec![0xBB]);
        assert_eq!(bytes(&r3), vec![0xCC]);
        assert_eq!(bytes(&r4), vec![0xAA]);
    }

    #[test]
    fn single_response_always_returns_it_and_still_advances() {
        let table = CycleTable::new();
        let entry = entry_with(vec!["AA"], false);
        for _ in 0..3 {
            let outcome = table.select(0x1000, &entry);
            match outcome {
                CycleOutcome::Response { bytes, index, .. } => {
                    assert_eq!(bytes, vec![0xAA]);
                    assert_eq!(index, 0);
                }
                CycleOutcome::NoBody => panic!("expected a response"),
            }
        }
    }

    #[test]
    fn independent_keys_do_not_interfere() {
        let table = CycleTable::new();
        let entry = entry_with(vec!["AA", "BB"], false);
        table.select(0x1000, &entry); // advances (0x1000, svc) to 1
        let second = table.select(0x2000, &entry); // independent key, starts at 0
        match second {
            CycleOutcome::Response { index, .. } => assert_eq!(index, 0),
            _ => panic!(),
        }
    }

    #[test]
    fn no_response_entry_returns_no_body_and_does_not_touch_state() {
        let table = CycleTable::new();
        let entry = entry_with(vec!["AA"], true);
        match table.select(0x1000, &entry) {
            CycleOutcome::NoBody => {}
            _ => panic!("expected NoBody"),
        }
        assert!(table.next_index.lock().is_empty());
    }

    #[test]
    fn reset_operations_scope_correctly() {
        let table = CycleTable::new();
        let entry = entry_with(vec!["AA", "BB"], false);
        table.select(0x1000, &entry);
        table.select(0x2000, &entry);

        table.reset_ecu(0x1000);
        assert_eq!(*table.next_index.lock().get(&(0x2000, "svc".to_string())).unwrap(), 1);
        assert!(table.next_index.lock().get(&(0x1000, "svc".to_string())).is_none());

        table.select(0x1000, &entry);
        table.reset_service("svc");
        assert!(table.next_index.lock().is_empty());
    }
}
