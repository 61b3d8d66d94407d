//! Error types for the openevt library.

use thiserror::Error;

/// The main error type for openevt operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial number cannot be encoded into a command frame.
    #[error("invalid serial number {serial:?}: {reason}")]
    InvalidSerial { serial: String, reason: &'static str },

    /// Address resolution or dial failure.
    #[error("failed to connect to inverter at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// No data arrived before the read deadline.
    #[error("read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A received frame was not recognized and has been skipped.
    #[error("frame discarded: {0}")]
    FrameDiscarded(#[source] FrameError),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The operation was stopped by an explicit cancellation.
    #[error("cancelled")]
    Cancelled,

    /// The exporter could not listen on its address.
    #[error("failed to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Metrics registry error.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl Error {
    /// Returns true for conditions the session survives (deadline expiry and
    /// discarded frames).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::FrameDiscarded(_))
    }
}

/// Frame-specific errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame too short to hold the fixed layout.
    #[error("frame too short: need at least {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    /// Last byte of the frame is not the end marker.
    #[error("unexpected frame end token 0x{0:02x}")]
    BadTerminator(u8),
}

/// Result type alias for openevt operations.
pub type Result<T> = std::result::Result<T, Error>;
