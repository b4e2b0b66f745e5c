//! Whole-frame (header + body) encode/decode, used by both the TCP session
//! engine and the UDP responder.

use crate::error::DecodeError;
use crate::header::{DoipHeader, PayloadType, HEADER_LEN};

/// Encode a complete frame: 8-byte header followed by `body`.
pub fn encode_frame(protocol_version: u8, payload_type: PayloadType, body: &[u8]) -> Vec<u8> {
    let header = DoipHeader::new(protocol_version, payload_type, body.len() as u32);
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    header.encode(&mut out);
    out.extend_from_slice(body);
    out
}

/// A successfully decoded frame: the header, the body slice, and the total
/// number of bytes consumed from the input (header + body), which callers
/// buffering a TCP stream use to advance past this frame.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    pub header: DoipHeader,
    pub body: &'a [u8],
    pub consumed: usize,
}

/// Decode one frame from the front of `buf`. Does not require `buf` to
/// contain exactly one frame — trailing bytes beyond `consumed` are left for
/// the caller (this is how a streaming TCP reader pulls frames one at a time
/// out of an accumulating read buffer).
pub fn decode_frame(buf: &[u8]) -> Result<DecodedFrame<'_>, DecodeError> {
    let header = DoipHeader::decode(buf)?;
    let body_start = HEADER_LEN;
    let body_end = body_start + header.payload_length as usize;
    Ok(DecodedFrame {
        header,
        body: &buf[body_start..body_end],
        consumed: body_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_is_identity() {
        let body = [0x0E, 0x00, 0x10, 0x00, 0x22, 0xF1, 0x90];
        let frame = encode_frame(0x02, PayloadType::DiagnosticMessage, &body);
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.header.protocol_version, 0x02);
        assert_eq!(decoded.header.payload_type_code, PayloadType::DiagnosticMessage.code());
        assert_eq!(decoded.body, &body);
        assert_eq!(decoded.consumed, frame.len());
    }

    #[test]
    fn decode_stops_at_declared_length_with_trailing_bytes() {
        let body = [0x01, 0x02, 0x03];
        let mut frame = encode_frame(0x02, PayloadType::DiagnosticMessage, &body);
        frame.extend_from_slice(&[0xAA, 0xBB]); // start of a second frame
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.body, &body);
        assert_eq!(decoded.consumed, frame.len() - 2);
    }
}
