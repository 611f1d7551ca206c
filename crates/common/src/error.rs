use thiserror::Error;

/// Error types shared by the decoders and the engine.
///
/// A record that simply does not match a monitor's interface is not an error;
/// decoders return `Ok(None)` for that case.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    #[error("Decode error in {interface}: {reason}")]
    Decode { interface: String, reason: String },

    #[error("Unknown chain id {0}")]
    UnknownChain(u64),

    #[error("Network not initialized")]
    NotInitialized,

    #[error("External read failed: {0}")]
    ExternalRead(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    pub fn decode(interface: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        MonitorError::Decode {
            interface: interface.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
