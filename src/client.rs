//! Main [`EvtClient`] implementation.
//!
//! The client composes a [`Transport`] with the frame codec into the
//! inverter's half-duplex protocol: the inverter only transmits after being
//! polled, and keeps reporting only while each status frame is acknowledged.

use std::fmt;
use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::protocol::{CommandFrame, STATUS_FRAME_LEN, decode_status_frame};
use crate::transport::{TcpTransport, Transport};
use crate::types::TelemetryFrame;

/// Size of the buffer handed to each transport read.
pub const READ_BUFFER_SIZE: usize = 512;

/// Client for one Envertec EVT microinverter.
pub struct EvtClient<T> {
    transport: T,
    inverter_id: String,
    read_timeout: Duration,
    poll: CommandFrame,
    ack: CommandFrame,
    /// Bytes received but not yet consumed as a frame.
    pending: BytesMut,
}

impl EvtClient<TcpTransport> {
    /// Creates a new client for an inverter reachable over TCP.
    ///
    /// # Arguments
    ///
    /// * `address` - Inverter address (e.g., "192.0.2.1:14889")
    /// * `inverter_id` - 8-digit serial number printed on the inverter
    pub fn tcp(address: impl Into<String>, inverter_id: &str) -> Result<Self> {
        Self::new(TcpTransport::with_address(address), inverter_id)
    }
}

impl<T: Transport> EvtClient<T> {
    /// Creates a new client over the given transport.
    ///
    /// Fails with [`Error::InvalidSerial`] if `inverter_id` is not an 8-digit
    /// serial number.
    pub fn new(transport: T, inverter_id: &str) -> Result<Self> {
        Ok(Self {
            poll: CommandFrame::poll(inverter_id)?,
            ack: CommandFrame::acknowledge(inverter_id)?,
            inverter_id: inverter_id.to_owned(),
            read_timeout: Duration::ZERO,
            transport,
            pending: BytesMut::with_capacity(READ_BUFFER_SIZE),
        })
    }

    /// Sets the read deadline. Zero blocks indefinitely.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the inverter serial number.
    #[must_use]
    pub fn inverter_id(&self) -> &str {
        &self.inverter_id
    }

    /// Returns the inverter address.
    #[must_use]
    pub fn address(&self) -> &str {
        self.transport.address()
    }

    /// Returns true if connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Opens the connection. Does not retry.
    pub async fn connect(&mut self) -> Result<()> {
        self.pending.clear();
        self.transport.open().await
    }

    /// Asks the inverter to report its status.
    pub async fn poll(&mut self) -> Result<()> {
        tracing::trace!(frame = %self.poll, "sending poll");
        self.transport.write(self.poll.to_bytes()).await?;
        Ok(())
    }

    /// Confirms receipt of a status frame.
    pub async fn acknowledge(&mut self) -> Result<()> {
        tracing::trace!(frame = %self.ack, "sending ack");
        self.transport.write(self.ack.to_bytes()).await?;
        Ok(())
    }

    /// Reads and decodes the next status frame, then acknowledges it.
    ///
    /// A frame may arrive split over several reads; bytes are collected until
    /// a whole frame is buffered. Bytes beyond it are kept for the next call.
    ///
    /// Returns [`Error::Timeout`] if a read timeout is configured and the
    /// whole frame does not arrive within it, and [`Error::FrameDiscarded`]
    /// if the received bytes are not a valid status frame. Both leave the
    /// session usable and drop any buffered bytes. Discarded frames are never
    /// acknowledged; a failed acknowledgement is fatal.
    pub async fn read_frame(&mut self) -> Result<TelemetryFrame> {
        if let Err(e) = self.fill_frame().await {
            self.pending.clear();
            return Err(e);
        }
        let data = self.pending.split_to(STATUS_FRAME_LEN);

        tracing::trace!(frame = %hex::encode(&data), "received frame");

        let frame = match decode_status_frame(&data) {
            Ok(frame) => frame,
            Err(e) => {
                // Resynchronise on the next read boundary.
                self.pending.clear();
                return Err(Error::FrameDiscarded(e));
            }
        };

        self.acknowledge().await?;

        Ok(frame)
    }

    /// Reads until at least one status frame's worth of bytes is pending.
    async fn fill_frame(&mut self) -> Result<()> {
        let started = Instant::now();
        let mut chunk = [0u8; READ_BUFFER_SIZE];

        while self.pending.len() < STATUS_FRAME_LEN {
            let deadline = if self.read_timeout.is_zero() {
                None
            } else {
                let remaining = self.read_timeout.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(self.timeout_error());
                }
                Some(remaining)
            };

            let n = match self.transport.read(&mut chunk, deadline).await {
                Ok(n) => n,
                Err(Error::Timeout { .. }) => return Err(self.timeout_error()),
                Err(e) => return Err(e),
            };
            self.pending.extend_from_slice(&chunk[..n]);

            if self.pending.len() < STATUS_FRAME_LEN {
                tracing::trace!(
                    "partial frame, {} of {} bytes",
                    self.pending.len(),
                    STATUS_FRAME_LEN
                );
            }
        }

        Ok(())
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_ms: u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Closes the connection. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.transport.close().await
    }
}

impl<T: Transport> fmt::Display for EvtClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.transport.is_connected() {
            return f.write_str("DISCONNECTED");
        }
        match self.transport.endpoints() {
            Some((local, remote)) => write!(f, "CONNECTED [{local} <--> {remote}]"),
            None => write!(f, "CONNECTED [{}]", self.transport.address()),
        }
    }
}
