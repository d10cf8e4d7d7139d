//! Error types for the simulation crate

use thiserror::Error;

pub use courier_core::FabricError;

/// Errors surfaced by the simulation harness
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Fabric error: {0}")]
    Fabric(#[from] FabricError),

    #[error("Trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary trace error: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported trace format version {found} (expected {expected})")]
    TraceVersion { found: u32, expected: u32 },

    #[error("Unknown {what}: {value}")]
    Unknown { what: &'static str, value: String },
}
