use crate::app::config::ConfigError;
use crate::codec::CodecError;
use crate::transport::TransportError;
use thiserror::Error;

/// Top-level error type for the telemetry client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
