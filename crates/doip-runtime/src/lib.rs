//! The per-ECU UDS request matching engine (C3) and addressing/ACL
//! resolution (C4). Operates purely on the immutable model produced by
//! `doip-config`; all mutable state lives in [`cycler::CycleTable`].

pub mod addressing;
pub mod cycler;
pub mod error;
pub mod matcher;
pub mod nrc;

pub use addressing::{filter_allowed, resolve_targets, ResolvedTarget};
pub use cycler::{CycleOutcome, CycleTable};
pub use error::MatchError;
pub use matcher::{match_service, render_hex, AddressMode};
pub use nrc::NegativeResponseCode;
