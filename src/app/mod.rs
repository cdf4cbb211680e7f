pub mod client;
pub mod config;
pub mod logging_system;

pub use client::{LogClient, LogClientBuilder};
pub use config::{ClientConfig, ConfigError, LogLevel};
pub use logging_system::{LogFormat, LoggingError, LoggingSystem, setup_logging_safe};
