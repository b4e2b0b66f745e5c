use thiserror::Error;

/// Failures that can occur while decoding a DoIP frame off the wire.
///
/// Only [`DecodeError::ShortBuffer`] and [`DecodeError::BadInverseProtocol`] are
/// header-level failures the protocol defines a Generic Header NACK for; the
/// remaining variants are body-level and are disposed of by closing the
/// connection (see `doip-gateway`'s session engine).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need at least {need} bytes, have {have}")]
    ShortBuffer { need: usize, have: usize },

    #[error("inverse protocol version mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadInverseProtocol { expected: u8, actual: u8 },

    #[error("declared payload length {declared} exceeds available buffer ({available} bytes)")]
    BadLength { declared: u32, available: usize },

    #[error("malformed body for payload type 0x{payload_type:04X}: {reason}")]
    MalformedBody { payload_type: u16, reason: &'static str },
}

impl DecodeError {
    /// Whether this failure is defined by ISO 13400-2 to produce a Generic
    /// Header NACK reply (as opposed to a silent drop / connection close).
    pub fn triggers_header_nack(&self) -> bool {
        matches!(
            self,
            DecodeError::ShortBuffer { .. } | DecodeError::BadInverseProtocol { .. }
        )
    }
}
