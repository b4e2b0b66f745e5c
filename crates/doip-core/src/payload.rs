//! Per-payload-type body encoding/decoding (ISO 13400-2 section 7.3-7.8).

use crate::error::DecodeError;

pub const VIN_LEN: usize = 17;
pub const EID_LEN: usize = 6;
pub const GID_LEN: usize = 6;

/// Generic Header NACK codes (ISO 13400-2 table 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderNackCode {
    IncorrectPatternFormat = 0x00,
    UnknownPayloadType = 0x01,
    MessageTooLarge = 0x02,
    OutOfMemory = 0x03,
    InvalidPayloadLength = 0x04,
    InvalidPayloadTypeInState = 0x06,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericHeaderNack {
    pub code: u8,
}

impl GenericHeaderNack {
    pub fn new(code: HeaderNackCode) -> Self {
        Self { code: code as u8 }
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![self.code]
    }
}

/// Vehicle Identification Response / Vehicle Announcement body (0x0004).
/// Fixed 33 bytes: VIN(17) || logical address(2, BE) || EID(6) || GID(6) ||
/// further-action-required(1) || VIN/GID sync status(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentificationResponse {
    pub vin: [u8; VIN_LEN],
    pub logical_address: u16,
    pub eid: [u8; EID_LEN],
    pub gid: [u8; GID_LEN],
    pub further_action_required: u8,
    pub vin_gid_sync_status: u8,
}

impl VehicleIdentificationResponse {
    pub const ENCODED_LEN: usize = VIN_LEN + 2 + EID_LEN + GID_LEN + 1 + 1;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(&self.vin);
        out.extend_from_slice(&self.logical_address.to_be_bytes());
        out.extend_from_slice(&self.eid);
        out.extend_from_slice(&self.gid);
        out.push(self.further_action_required);
        out.push(self.vin_gid_sync_status);
        out
    }
}

/// Routing Activation Request body (0x0005). 7 bytes minimum, with an
/// optional trailing 4-byte OEM-specific field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingActivationRequest {
    pub source_address: u16,
    pub activation_type: u8,
    pub oem_specific: Option<[u8; 4]>,
}

impl RoutingActivationRequest {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() < 7 {
            return Err(DecodeError::MalformedBody {
                payload_type: 0x0005,
                reason: "routing activation request shorter than 7 bytes",
            });
        }
        let source_address = u16::from_be_bytes([body[0], body[1]]);
        let activation_type = body[2];
        let oem_specific = if body.len() >= 11 {
            Some([body[7], body[8], body[9], body[10]])
        } else {
            None
        };
        Ok(Self {
            source_address,
            activation_type,
            oem_specific,
        })
    }
}

/// Routing Activation Response codes (ISO 13400-2 table 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingActivationCode {
    UnknownSourceAddress = 0x00,
    NoFreeSocket = 0x01,
    WrongSourceAddress = 0x02,
    SourceAddressAlreadyActive = 0x03,
    MissingAuthentication = 0x0A,
    UnsupportedActivationType = 0x06,
    Success = 0x10,
}

/// Routing Activation Response body (0x0006). 13 bytes, struct `!HHBLL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingActivationResponse {
    pub tester_source_address: u16,
    pub gateway_logical_address: u16,
    pub response_code: u8,
    pub reserved: u32,
    pub oem_reserved: u32,
}

impl RoutingActivationResponse {
    pub const ENCODED_LEN: usize = 13;

    pub fn new(
        tester_source_address: u16,
        gateway_logical_address: u16,
        response_code: RoutingActivationCode,
    ) -> Self {
        Self {
            tester_source_address,
            gateway_logical_address,
            response_code: response_code as u8,
            reserved: 0,
            oem_reserved: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(&self.tester_source_address.to_be_bytes());
        out.extend_from_slice(&self.gateway_logical_address.to_be_bytes());
        out.push(self.response_code);
        out.extend_from_slice(&self.reserved.to_be_bytes());
        out.extend_from_slice(&self.oem_reserved.to_be_bytes());
        out
    }
}

/// Diagnostic Message body (0x8001): source(2) || target(2) || UDS bytes(>=1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub source_address: u16,
    pub target_address: u16,
    pub uds_payload: Vec<u8>,
}

impl DiagnosticMessage {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        if body.len() < 5 {
            return Err(DecodeError::MalformedBody {
                payload_type: 0x8001,
                reason: "diagnostic message shorter than 5 bytes",
            });
        }
        Ok(Self {
            source_address: u16::from_be_bytes([body[0], body[1]]),
            target_address: u16::from_be_bytes([body[2], body[3]]),
            uds_payload: body[4..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.uds_payload.len());
        out.extend_from_slice(&self.source_address.to_be_bytes());
        out.extend_from_slice(&self.target_address.to_be_bytes());
        out.extend_from_slice(&self.uds_payload);
        out
    }
}

/// Diagnostic Message ACK/NACK codes carried in 0x8002/0x8003 bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticAckCode {
    PositiveAck = 0x00,
    InvalidSourceAddress = 0x02,
    UnknownTargetAddress = 0x03,
    MessageTooLarge = 0x04,
    OutOfMemory = 0x05,
    TargetUnreachable = 0x06,
    UnknownNetwork = 0x07,
    TransportProtocolError = 0x08,
}

/// Diagnostic Message ACK body (0x8002/0x8003): source(2) || target(2) ||
/// ack/nack code(1) || optional preview of the original UDS bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessageAck {
    pub source_address: u16,
    pub target_address: u16,
    pub ack_code: u8,
    pub preview: Vec<u8>,
}

impl DiagnosticMessageAck {
    pub fn new(source_address: u16, target_address: u16, ack_code: DiagnosticAckCode) -> Self {
        Self {
            source_address,
            target_address,
            ack_code: ack_code as u8,
            preview: Vec::new(),
        }
    }

    pub fn with_preview(mut self, preview: Vec<u8>) -> Self {
        self.preview = preview;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.preview.len());
        out.extend_from_slice(&self.source_address.to_be_bytes());
        out.extend_from_slice(&self.target_address.to_be_bytes());
        out.push(self.ack_code);
        out.extend_from_slice(&self.preview);
        out
    }
}

/// Entity Status Response body (0x4002): node type(1) || max concurrent TCP
/// sockets(1) || currently open TCP sockets(1) || max data size(4, BE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatusResponse {
    pub node_type: u8,
    pub max_concurrent_sockets: u8,
    pub currently_open_sockets: u8,
    pub max_data_size: u32,
}

impl EntityStatusResponse {
    pub const NODE_TYPE_GATEWAY: u8 = 0x00;
    pub const ENCODED_LEN: usize = 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.push(self.node_type);
        out.push(self.max_concurrent_sockets);
        out.push(self.currently_open_sockets);
        out.extend_from_slice(&self.max_data_size.to_be_bytes());
        out
    }
}

/// Diagnostic Power Mode Response body (0x4004): 1 byte status, not 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticPowerModeResponse {
    pub status: u8,
}

impl DiagnosticPowerModeResponse {
    pub const ENCODED_LEN: usize = 1;

    pub fn encode(&self) -> Vec<u8> {
        vec![self.status]
    }
}

/// Alive Check Response body (0x0008): gateway logical address(2, BE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliveCheckResponse {
    pub gateway_logical_address: u16,
}

impl AliveCheckResponse {
    pub const ENCODED_LEN: usize = 2;

    pub fn encode(&self) -> Vec<u8> {
        self.gateway_logical_address.to_be_bytes().to_vec()
    }
}

/// Vehicle Identification Request by EID body (0x0003): EID(6).
pub fn decode_eid_request(body: &[u8]) -> Result<[u8; EID_LEN], DecodeError> {
    if body.len() < EID_LEN {
        return Err(DecodeError::MalformedBody {
            payload_type: 0x0003,
            reason: "EID request shorter than 6 bytes",
        });
    }
    let mut eid = [0u8; EID_LEN];
    eid.copy_from_slice(&body[..EID_LEN]);
    Ok(eid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_identification_response_is_33_bytes() {
        let eid: Vec<u8> = hex::decode("111111111111").unwrap();
        let gid: Vec<u8> = hex::decode("222222222222").unwrap();
        let resp = VehicleIdentificationResponse {
            vin: *b"WVWZZZ1JZXW000001",
            logical_address: 0x1000,
            eid: eid.try_into().unwrap(),
            gid: gid.try_into().unwrap(),
            further_action_required: 0x00,
            vin_gid_sync_status: 0x00,
        };
        assert_eq!(resp.encode().len(), 33);
    }

    #[test]
    fn power_mode_response_is_one_byte() {
        let resp = DiagnosticPowerModeResponse { status: 0x01 };
        assert_eq!(resp.encode(), vec![0x01]);
    }

    #[test]
    fn routing_activation_response_layout() {
        let resp = RoutingActivationResponse::new(0x0E00, 0x1000, RoutingActivationCode::Success);
        let encoded = resp.encode();
        assert_eq!(
            encoded,
            vec![0x0E, 0x00, 0x10, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn routing_activation_request_requires_seven_bytes() {
        let body = [0x0E, 0x00, 0x00, 0, 0, 0, 0];
        let parsed = RoutingActivationRequest::decode(&body).unwrap();
        assert_eq!(parsed.source_address, 0x0E00);
        assert_eq!(parsed.activation_type, 0x00);
        assert_eq!(parsed.oem_specific, None);
    }

    #[test]
    fn diagnostic_message_roundtrip() {
        let msg = DiagnosticMessage {
            source_address: 0x0E00,
            target_address: 0x1000,
            uds_payload: vec![0x22, 0xF1, 0x90],
        };
        let encoded = msg.encode();
        let decoded = DiagnosticMessage::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }
}
