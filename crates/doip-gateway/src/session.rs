//! The TCP session engine: one task per accepted connection, running the
//! UNACTIVATED → ACTIVATED → CLOSED state machine.

use std::sync::Arc;
use std::time::Duration;

use doip_config::model::Gateway;
use doip_core::header::{PayloadType, HEADER_LEN};
use doip_core::payload::{
    AliveCheckResponse, DiagnosticAckCode, DiagnosticMessage, DiagnosticMessageAck,
    GenericHeaderNack, HeaderNackCode, RoutingActivationCode, RoutingActivationRequest,
    RoutingActivationResponse,
};
use doip_core::{decode_frame, encode_frame};
use doip_runtime::{filter_allowed, match_service, resolve_targets, AddressMode, CycleOutcome, CycleTable, NegativeResponseCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unactivated,
    Activated { source_address: u16 },
}

/// Drives one accepted TCP connection to completion. Never panics on
/// malformed client input; all protocol-level failures are converted into
/// a NACK/close decision and a logged [`SessionError`].
pub async fn run(mut stream: TcpStream, peer: std::net::SocketAddr, gateway: Arc<Gateway>, cycle_table: Arc<CycleTable>) {
    let mut state = State::Unactivated;
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut read_buf = [0u8; 4096];

    let result = 'session: loop {
        // Pull bytes until we have a full frame: header first, then its
        // declared-length body, so a genuine `ShortBuffer` never fires on a
        // stream that simply hasn't delivered the rest of the frame yet.
        while buf.len() < HEADER_LEN {
            match read_more(&mut stream, &mut read_buf, &mut buf, gateway.idle_timeout).await {
                Ok(true) => {}
                Ok(false) => break 'session Ok(()),
                Err(e) => break 'session Err(e),
            }
        }
        let declared_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        while buf.len() < HEADER_LEN + declared_len {
            match read_more(&mut stream, &mut read_buf, &mut buf, gateway.idle_timeout).await {
                Ok(true) => {}
                Ok(false) => break 'session Ok(()),
                Err(e) => break 'session Err(e),
            }
        }

        let decoded = match decode_frame(&buf) {
            Ok(d) => d,
            Err(e) => {
                if e.triggers_header_nack() {
                    let nack = GenericHeaderNack::new(HeaderNackCode::IncorrectPatternFormat);
                    let frame = encode_frame(gateway.protocol_version, PayloadType::GenericHeaderNack, &nack.encode());
                    let _ = stream.write_all(&frame).await;
                }
                break 'session Err(SessionError::HeaderDecode(e));
            }
        };
        let consumed = decoded.consumed;
        let payload_type = PayloadType::from_code(decoded.header.payload_type_code);
        let body = decoded.body.to_vec();
        buf.drain(..consumed);

        match handle_frame(&mut stream, &gateway, &cycle_table, &mut state, payload_type, &body).await {
            Ok(ControlFlow::Continue) => {}
            Ok(ControlFlow::Close) => break 'session Ok(()),
            Err(e) => break 'session Err(e),
        }
    };

    match result {
        Ok(()) => info!(%peer, "session closed"),
        Err(e) => info!(%peer, error = %e, "session closed with error"),
    }
}

enum ControlFlow {
    Continue,
    Close,
}

async fn read_more(
    stream: &mut TcpStream,
    read_buf: &mut [u8],
    buf: &mut Vec<u8>,
    idle_timeout: Duration,
) -> Result<bool, SessionError> {
    let n = tokio::time::timeout(idle_timeout, stream.read(read_buf))
        .await
        .map_err(|_| SessionError::IdleTimeout)??;
    if n == 0 {
        return Ok(false);
    }
    buf.extend_from_slice(&read_buf[..n]);
    Ok(true)
}

async fn handle_frame(
    stream: &mut TcpStream,
    gateway: &Gateway,
    cycle_table: &CycleTable,
    state: &mut State,
    payload_type: Option<PayloadType>,
    body: &[u8],
) -> Result<ControlFlow, SessionError> {
    match *state {
        State::Unactivated => handle_unactivated(stream, gateway, state, payload_type, body).await,
        State::Activated { source_address } => {
            handle_activated(stream, gateway, cycle_table, source_address, payload_type, body).await
        }
    }
}

async fn handle_unactivated(
    stream: &mut TcpStream,
    gateway: &Gateway,
    state: &mut State,
    payload_type: Option<PayloadType>,
    body: &[u8],
) -> Result<ControlFlow, SessionError> {
    if payload_type != Some(PayloadType::RoutingActivationRequest) {
        let code = payload_type.map_or(0, PayloadType::code);
        let nack = GenericHeaderNack::new(HeaderNackCode::InvalidPayloadTypeInState);
        let frame = encode_frame(gateway.protocol_version, PayloadType::GenericHeaderNack, &nack.encode());
        stream.write_all(&frame).await.map_err(SessionError::Io)?;
        warn!(code, "payload type not valid before routing activation, closing session");
        return Ok(ControlFlow::Close);
    }

    let request = RoutingActivationRequest::decode(body).map_err(SessionError::HeaderDecode)?;
    let allowed = gateway
        .ecus
        .iter()
        .any(|ecu| ecu.allows_tester(request.source_address));

    let code = if allowed {
        RoutingActivationCode::Success
    } else {
        RoutingActivationCode::UnknownSourceAddress
    };
    let response = RoutingActivationResponse::new(request.source_address, gateway.logical_address, code);
    let frame = encode_frame(gateway.protocol_version, PayloadType::RoutingActivationResponse, &response.encode());
    stream.write_all(&frame).await.map_err(SessionError::Io)?;

    if allowed {
        info!(source_address = request.source_address, "routing activation succeeded");
        *state = State::Activated {
            source_address: request.source_address,
        };
        Ok(ControlFlow::Continue)
    } else {
        warn!(source_address = request.source_address, "routing activation refused: unknown source address");
        Ok(ControlFlow::Close)
    }
}

async fn handle_activated(
    stream: &mut TcpStream,
    gateway: &Gateway,
    cycle_table: &CycleTable,
    source_address: u16,
    payload_type: Option<PayloadType>,
    body: &[u8],
) -> Result<ControlFlow, SessionError> {
    match payload_type {
        Some(PayloadType::AliveCheckRequest) => {
            let response = AliveCheckResponse {
                gateway_logical_address: gateway.logical_address,
            };
            let frame = encode_frame(gateway.protocol_version, PayloadType::AliveCheckResponse, &response.encode());
            stream.write_all(&frame).await.map_err(SessionError::Io)?;
            Ok(ControlFlow::Continue)
        }
        Some(PayloadType::AliveCheckResponse) => Ok(ControlFlow::Continue),
        Some(PayloadType::DiagnosticMessage) => {
            handle_diagnostic_message(stream, gateway, cycle_table, source_address, body).await
        }
        other => {
            let code = other.map_or(0, PayloadType::code);
            let nack = GenericHeaderNack::new(HeaderNackCode::InvalidPayloadTypeInState);
            let frame = encode_frame(gateway.protocol_version, PayloadType::GenericHeaderNack, &nack.encode());
            stream.write_all(&frame).await.map_err(SessionError::Io)?;
            debug!(code, "unexpected payload type while activated, ignoring");
            Ok(ControlFlow::Continue)
        }
    }
}

/// The UDS service ID an NRC response echoes back. A request body shorter
/// than one byte has no SID to echo; `0x00` is used as a harmless filler
/// rather than panicking on an empty slice.
fn sid_of(uds_payload: &[u8]) -> u8 {
    uds_payload.first().copied().unwrap_or(0)
}

async fn handle_diagnostic_message(
    stream: &mut TcpStream,
    gateway: &Gateway,
    cycle_table: &CycleTable,
    session_source: u16,
    body: &[u8],
) -> Result<ControlFlow, SessionError> {
    let message = DiagnosticMessage::decode(body).map_err(SessionError::HeaderDecode)?;

    if message.source_address != session_source {
        let nack = DiagnosticMessageAck::new(
            message.source_address,
            message.target_address,
            DiagnosticAckCode::InvalidSourceAddress,
        );
        let frame = encode_frame(gateway.protocol_version, PayloadType::DiagnosticMessageNegativeAck, &nack.encode());
        stream.write_all(&frame).await.map_err(SessionError::Io)?;
        return Ok(ControlFlow::Continue);
    }

    let resolved = resolve_targets(gateway, message.target_address);
    if resolved.is_empty() {
        let nack = DiagnosticMessageAck::new(
            message.source_address,
            message.target_address,
            DiagnosticAckCode::UnknownTargetAddress,
        );
        let frame = encode_frame(gateway.protocol_version, PayloadType::DiagnosticMessageNegativeAck, &nack.encode());
        stream.write_all(&frame).await.map_err(SessionError::Io)?;
        return Ok(ControlFlow::Continue);
    }

    let is_functional = resolved[0].mode == AddressMode::Functional;
    let allowed = filter_allowed(resolved, message.source_address);
    if allowed.is_empty() {
        let nrc_body = NegativeResponseCode::SecurityAccessDenied.response_body(sid_of(&message.uds_payload));
        let response = DiagnosticMessage {
            source_address: message.target_address,
            target_address: message.source_address,
            uds_payload: nrc_body,
        };
        let frame = encode_frame(gateway.protocol_version, PayloadType::DiagnosticMessage, &response.encode());
        stream.write_all(&frame).await.map_err(SessionError::Io)?;
        return Ok(ControlFlow::Continue);
    }

    let ack = DiagnosticMessageAck::new(message.source_address, message.target_address, DiagnosticAckCode::PositiveAck);
    let frame = encode_frame(gateway.protocol_version, PayloadType::DiagnosticMessagePositiveAck, &ack.encode());
    stream.write_all(&frame).await.map_err(SessionError::Io)?;

    for target in allowed {
        let mode = if is_functional { AddressMode::Functional } else { AddressMode::Physical };
        let uds_body = match match_service(&target.ecu.catalog, &message.uds_payload, mode) {
            Ok(entry) => match cycle_table.select(target.ecu.target_address, entry) {
                CycleOutcome::NoBody => None,
                CycleOutcome::Response { bytes, delay_ms, index } => {
                    debug!(
                        target = target.ecu.target_address,
                        service = entry.name.as_str(),
                        index,
                        delay_ms,
                        "matched service"
                    );
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Some(bytes)
                }
            },
            // `MatchError` is `#[non_exhaustive]`; every variant it has today
            // (just `NoMatch`) and any added later disposes the same way:
            // the request didn't resolve to a service this ECU can answer.
            Err(_) => Some(NegativeResponseCode::ServiceNotSupported.response_body(sid_of(&message.uds_payload))),
        };

        if let Some(uds_payload) = uds_body {
            let response = DiagnosticMessage {
                source_address: target.ecu.target_address,
                target_address: message.source_address,
                uds_payload,
            };
            let frame = encode_frame(gateway.protocol_version, PayloadType::DiagnosticMessage, &response.encode());
            stream.write_all(&frame).await.map_err(SessionError::Io)?;
        }
    }

    Ok(ControlFlow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_equality_distinguishes_source_address() {
        let a = State::Activated { source_address: 1 };
        let b = State::Activated { source_address: 2 };
        assert_ne!(a, b);
    }
}
