use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort gateway startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path}: {key}: {reason}")]
    Schema {
        path: PathBuf,
        key: String,
        reason: String,
    },

    #[error("{path}: references unknown {reference}")]
    Reference { path: PathBuf, reference: String },

    #[error("duplicate ECU target address 0x{address:04X}")]
    DuplicateTarget { address: u16 },

    #[error("ECU {ecu}: duplicate service request pattern {request:?} (supports_functional={supports_functional})")]
    DuplicateService {
        ecu: String,
        request: String,
        supports_functional: bool,
    },

    #[error("{context}: invalid hex string {value:?}")]
    BadHex { context: String, value: String },

    #[error("{context}: invalid regex {pattern:?}: {source}")]
    BadRegex {
        context: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn schema(path: impl Into<PathBuf>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}
