//! # openevt
//!
//! A Rust client and Prometheus exporter for Envertec EVT microinverters.
//!
//! The inverter speaks a fixed-width binary protocol over TCP. It reports its
//! status only after being polled, and keeps reporting only while each status
//! frame is acknowledged. The link is unreliable, so a long-running
//! [`Supervisor`] re-polls on silence and reconnects on failure.
//!
//! ## Quick Start
//!
//! ```no_run
//! use openevt::EvtClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), openevt::Error> {
//!     let mut client = EvtClient::tcp("192.0.2.1:14889", "31583078")?;
//!     client.connect().await?;
//!     client.poll().await?;
//!
//!     let status = client.read_frame().await?;
//!     println!("{status}");
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Command frame construction and status frame decoding
//! - [`types`] - Decoded telemetry
//! - [`transport`] - Stream transports (currently TCP)
//! - [`client`] - The [`EvtClient`] protocol client
//! - [`supervisor`] - The reconnect/poll/read loop
//! - [`exporter`] - Prometheus metrics and JSON snapshot over HTTP
//! - [`config`] - Command-line configuration of the `openevt` binary

pub mod client;
pub mod config;
pub mod error;
pub mod exporter;
pub mod protocol;
pub mod supervisor;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::EvtClient;
pub use config::{Args, Config};
pub use error::{Error, FrameError, Result};
pub use exporter::Exporter;
pub use protocol::{CommandFrame, MessageKind, decode_status_frame};
pub use supervisor::{Supervisor, TelemetrySink};
pub use transport::{TcpConfig, TcpTransport, Transport};
pub use types::{ModuleReading, TelemetryFrame};
