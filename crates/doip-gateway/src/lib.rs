//! The TCP session engine (C6), UDP responder (C5), and server orchestrator
//! (C7): everything that touches a live socket. Built on `doip-core` for wire
//! framing and `doip-runtime` for matching, cycling, and addressing.

pub mod error;
mod session;
mod server;
mod udp;

pub use error::SessionError;
pub use server::{bind, run, serve};
