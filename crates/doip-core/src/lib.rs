//! DoIP (ISO 13400-2) wire protocol: the 8-byte header plus per-payload-type
//! body framing. This crate has no knowledge of gateways, ECUs, or UDS
//! service catalogs — it is pure wire format, shared by the TCP session
//! engine and the UDP responder in `doip-gateway`.

pub mod error;
pub mod frame;
pub mod header;
pub mod payload;

pub use error::DecodeError;
pub use frame::{decode_frame, encode_frame, DecodedFrame};
pub use header::{DoipHeader, PayloadType, HEADER_LEN};
