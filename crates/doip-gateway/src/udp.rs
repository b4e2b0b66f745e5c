//! The UDP responder: single-threaded, one datagram per iteration, stateless
//! except for the power-mode status cycle it shares with the TCP engine's
//! cycle table.

use std::sync::Arc;

use doip_config::model::Gateway;
use doip_core::header::PayloadType;
use doip_core::payload::{
    decode_eid_request, DiagnosticPowerModeResponse, EntityStatusResponse,
    VehicleIdentificationResponse,
};
use doip_core::{decode_frame, encode_frame};
use doip_runtime::CycleTable;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

const POWER_MODE_CYCLE_KEY: &str = "__power_mode__";

/// Runs until the socket errors out or the process exits; the orchestrator
/// spawns this as its own task so it never blocks TCP accept.
pub async fn run(
    socket: UdpSocket,
    gateway: Arc<Gateway>,
    cycle_table: Arc<CycleTable>,
    open_tcp_sockets: Arc<std::sync::atomic::AtomicUsize>,
) {
    let mut buf = [0u8; 4096];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "UDP recv failed");
                continue;
            }
        };

        let decoded = match decode_frame(&buf[..len]) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, %peer, "dropping malformed UDP datagram");
                continue;
            }
        };

        let Some(payload_type) = PayloadType::from_code(decoded.header.payload_type_code) else {
            debug!(code = decoded.header.payload_type_code, %peer, "dropping unknown UDP payload type");
            continue;
        };

        let reply = match payload_type {
            PayloadType::VehicleIdentificationRequest => Some(vehicle_identification_reply(&gateway)),
            PayloadType::VehicleIdentificationRequestByEid => {
                match decode_eid_request(decoded.body) {
                    Ok(eid) if eid == gateway.eid => Some(vehicle_identification_reply(&gateway)),
                    Ok(_) => None, // EID mismatch: drop the datagram
                    Err(e) => {
                        debug!(error = %e, %peer, "malformed EID request");
                        None
                    }
                }
            }
            PayloadType::EntityStatusRequest => Some(entity_status_reply(&gateway, &open_tcp_sockets)),
            PayloadType::DiagnosticPowerModeRequest => {
                Some(power_mode_reply(&gateway, &cycle_table))
            }
            _ => {
                debug!(?payload_type, %peer, "dropping UDP payload type not handled by the responder");
                None
            }
        };

        if let Some(reply) = reply {
            if let Err(e) = socket.send_to(&reply, peer).await {
                warn!(error = %e, %peer, "failed to send UDP reply");
            } else {
                info!(%peer, ?payload_type, "answered UDP request");
            }
        }
    }
}

fn vehicle_identification_reply(gateway: &Gateway) -> Vec<u8> {
    let body = VehicleIdentificationResponse {
        vin: gateway.vin,
        logical_address: gateway.logical_address,
        eid: gateway.eid,
        gid: gateway.gid,
        further_action_required: 0x00,
        vin_gid_sync_status: 0x00,
    }
    .encode();
    encode_frame(gateway.protocol_version, PayloadType::VehicleAnnouncement, &body)
}

fn entity_status_reply(gateway: &Gateway, open_tcp_sockets: &std::sync::atomic::AtomicUsize) -> Vec<u8> {
    let body = EntityStatusResponse {
        node_type: EntityStatusResponse::NODE_TYPE_GATEWAY,
        max_concurrent_sockets: gateway.max_connections.min(u8::MAX as usize) as u8,
        currently_open_sockets: open_tcp_sockets
            .load(std::sync::atomic::Ordering::Relaxed)
            .min(u8::MAX as usize) as u8,
        max_data_size: 0xFFFF_FFFF,
    }
    .encode();
    encode_frame(gateway.protocol_version, PayloadType::EntityStatusResponse, &body)
}

fn power_mode_reply(gateway: &Gateway, cycle_table: &CycleTable) -> Vec<u8> {
    let index = cycle_table.next_raw_index(
        gateway.logical_address,
        POWER_MODE_CYCLE_KEY,
        gateway.power_mode_cycle.len(),
    );
    let status = gateway.power_mode_cycle[index];
    let body = DiagnosticPowerModeResponse { status }.encode();
    encode_frame(gateway.protocol_version, PayloadType::DiagnosticPowerModeResponse, &body)
}
