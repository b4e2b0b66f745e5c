//! Addressing & ACL resolution: target address -> physical ECU or
//! functional-group fanout, filtered by per-ECU tester ACLs.

use doip_config::model::{Ecu, Gateway};

use crate::matcher::AddressMode;

/// One ECU that should answer a request, along with the addressing mode
/// under which it was resolved.
pub struct ResolvedTarget<'a> {
    pub ecu: &'a Ecu,
    pub mode: AddressMode,
}

/// Resolve `target_address` to the ECUs that should see this request, in
/// ECU declaration order. Physical addressing wins outright over functional
/// (a target address cannot simultaneously be one ECU's unique address and
/// another group's functional address in a valid configuration, but if it
/// did, physical takes priority).
pub fn resolve_targets(gateway: &Gateway, target_address: u16) -> Vec<ResolvedTarget<'_>> {
    if let Some(ecu) = gateway.find_physical(target_address) {
        return vec![ResolvedTarget {
            ecu,
            mode: AddressMode::Physical,
        }];
    }
    gateway
        .find_functional(target_address)
        .into_iter()
        .map(|ecu| ResolvedTarget {
            ecu,
            mode: AddressMode::Functional,
        })
        .collect()
}

/// Filter a resolved target list down to the ECUs that accept `source_address`
/// as a known tester. For functional fanout this silently partitions the
/// broadcast into the allowed subset.
pub fn filter_allowed<'a>(
    targets: Vec<ResolvedTarget<'a>>,
    source_address: u16,
) -> Vec<ResolvedTarget<'a>> {
    targets
        .into_iter()
        .filter(|t| t.ecu.allows_tester(source_address))
        .collect()
}
