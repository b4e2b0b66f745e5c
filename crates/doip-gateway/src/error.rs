use thiserror::Error;

/// Why a TCP session ended. Carried only for logging — the session loop
/// itself never surfaces this to a caller, it just stops.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("idle timeout exceeded")]
    IdleTimeout,

    #[error("header decode failure: {0}")]
    HeaderDecode(#[from] doip_core::DecodeError),
}
