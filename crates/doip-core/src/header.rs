//! The 8-byte DoIP header that precedes every frame (ISO 13400-2 section 7.2).

use crate::error::DecodeError;

pub const HEADER_LEN: usize = 8;

/// Payload type codes recognised by this gateway (ISO 13400-2:2025, table 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    GenericHeaderNack,
    VehicleIdentificationRequest,
    VehicleIdentificationRequestByEid,
    VehicleAnnouncement,
    RoutingActivationRequest,
    RoutingActivationResponse,
    AliveCheckRequest,
    AliveCheckResponse,
    EntityStatusRequest,
    EntityStatusResponse,
    DiagnosticPowerModeRequest,
    DiagnosticPowerModeResponse,
    DiagnosticMessage,
    DiagnosticMessagePositiveAck,
    DiagnosticMessageNegativeAck,
}

impl PayloadType {
    pub const fn code(self) -> u16 {
        match self {
            PayloadType::GenericHeaderNack => 0x0000,
            PayloadType::VehicleIdentificationRequest => 0x0001,
            PayloadType::VehicleIdentificationRequestByEid => 0x0003,
            PayloadType::VehicleAnnouncement => 0x0004,
            PayloadType::RoutingActivationRequest => 0x0005,
            PayloadType::RoutingActivationResponse => 0x0006,
            PayloadType::AliveCheckRequest => 0x0007,
            PayloadType::AliveCheckResponse => 0x0008,
            PayloadType::EntityStatusRequest => 0x4001,
            PayloadType::EntityStatusResponse => 0x4002,
            PayloadType::DiagnosticPowerModeRequest => 0x4003,
            PayloadType::DiagnosticPowerModeResponse => 0x4004,
            PayloadType::DiagnosticMessage => 0x8001,
            PayloadType::DiagnosticMessagePositiveAck => 0x8002,
            PayloadType::DiagnosticMessageNegativeAck => 0x8003,
        }
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x0000 => PayloadType::GenericHeaderNack,
            0x0001 => PayloadType::VehicleIdentificationRequest,
            0x0003 => PayloadType::VehicleIdentificationRequestByEid,
            0x0004 => PayloadType::VehicleAnnouncement,
            0x0005 => PayloadType::RoutingActivationRequest,
            0x0006 => PayloadType::RoutingActivationResponse,
            0x0007 => PayloadType::AliveCheckRequest,
            0x0008 => PayloadType::AliveCheckResponse,
            0x4001 => PayloadType::EntityStatusRequest,
            0x4002 => PayloadType::EntityStatusResponse,
            0x4003 => PayloadType::DiagnosticPowerModeRequest,
            0x4004 => PayloadType::DiagnosticPowerModeResponse,
            0x8001 => PayloadType::DiagnosticMessage,
            0x8002 => PayloadType::DiagnosticMessagePositiveAck,
            0x8003 => PayloadType::DiagnosticMessageNegativeAck,
            _ => return None,
        })
    }
}

/// The parsed 8-byte header. `payload_length` is the length of the body that
/// follows, not counting these 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoipHeader {
    pub protocol_version: u8,
    pub inverse_protocol_version: u8,
    pub payload_type_code: u16,
    pub payload_length: u32,
}

impl DoipHeader {
    pub fn new(protocol_version: u8, payload_type: PayloadType, payload_length: u32) -> Self {
        Self {
            protocol_version,
            inverse_protocol_version: !protocol_version,
            payload_type_code: payload_type.code(),
            payload_length,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.protocol_version);
        out.push(self.inverse_protocol_version);
        out.extend_from_slice(&self.payload_type_code.to_be_bytes());
        out.extend_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode the 8-byte header from the front of `buf`. Validates the
    /// inverse-protocol relationship and that the declared length does not
    /// overrun the remaining buffer; does not validate the payload type
    /// (unknown payload types decode successfully at the header level —
    /// `PayloadType::from_code` returns `None` and the caller's dispatch
    /// layer decides how to respond).
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_LEN {
            return Err(DecodeError::ShortBuffer {
                need: HEADER_LEN,
                have: buf.len(),
            });
        }
        let protocol_version = buf[0];
        let inverse_protocol_version = buf[1];
        let expected_inverse = !protocol_version;
        if inverse_protocol_version != expected_inverse {
            return Err(DecodeError::BadInverseProtocol {
                expected: expected_inverse,
                actual: inverse_protocol_version,
            });
        }
        let payload_type_code = u16::from_be_bytes([buf[2], buf[3]]);
        let payload_length = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let available = buf.len() - HEADER_LEN;
        if payload_length as usize > available {
            return Err(DecodeError::BadLength {
                declared: payload_length,
                available,
            });
        }
        Ok(Self {
            protocol_version,
            inverse_protocol_version,
            payload_type_code,
            payload_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let header = DoipHeader::new(0x02, PayloadType::RoutingActivationRequest, 7);
        let mut buf = Vec::new();
        header.encode(&mut buf);
        buf.extend_from_slice(&[0u8; 7]);
        let decoded = DoipHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn bad_inverse_is_rejected() {
        let buf = [0x02, 0x02, 0x00, 0x05, 0, 0, 0, 0];
        assert_eq!(
            DoipHeader::decode(&buf),
            Err(DecodeError::BadInverseProtocol {
                expected: 0xFD,
                actual: 0x02,
            })
        );
    }

    #[test]
    fn short_buffer_is_rejected() {
        let buf = [0x02, 0xFD, 0x00];
        assert_eq!(
            DoipHeader::decode(&buf),
            Err(DecodeError::ShortBuffer { need: 8, have: 3 })
        );
    }

    #[test]
    fn overrunning_length_is_rejected() {
        let buf = [0x02, 0xFD, 0x00, 0x05, 0x00, 0x00, 0x00, 0x7F];
        assert_eq!(
            DoipHeader::decode(&buf),
            Err(DecodeError::BadLength {
                declared: 0x7F,
                available: 0,
            })
        );
    }
}
