#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_precision_loss,      // Acceptable for metrics rates and percentages
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. CodecError in codec module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

//! Telemetry-shipping client: keeps one connection to a log collector,
//! sends log records and host metrics samples over it and reconnects after
//! unexpected closes.

pub mod app;
pub mod codec;
pub mod domain;
pub mod sampler;
pub mod supervisor;
pub mod transport;

// Re-export main types for easy access
pub use app::{ClientConfig, LogClient, LogClientBuilder};
pub use codec::{Codec, Encoding, Frame};
pub use domain::{ClientError, ErrorDetails, LogData, LogRecord, MetricsSample, Severity};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use transport::{Connector, LoopbackConnector, Transport, TransportEvent, TransportOptions};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
