//! The hierarchical configuration loader: resolves a gateway document plus
//! its referenced ECU and service catalog documents into a fully validated,
//! immutable [`model::Gateway`].

pub mod documents;
pub mod error;
pub mod hexutil;
pub mod loader;
pub mod model;

pub use error::ConfigError;
pub use loader::load_gateway;
pub use model::{Ecu, Gateway, RequestPattern, ResponseEntry, ServiceCatalog, ServiceEntry};
