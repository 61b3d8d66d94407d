//! Data types for decoded inverter telemetry.

pub mod telemetry;

pub use telemetry::{ModuleReading, TelemetryFrame};
