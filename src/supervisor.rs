//! Long-running session supervision.
//!
//! The [`Supervisor`] keeps one [`EvtClient`] connected for the lifetime of
//! the process:
//!
//! 1. connect, then poll
//! 2. read frames, publishing each to the [`TelemetrySink`]
//! 3. on a read timeout, poll again; on a discarded frame, keep reading
//! 4. on any other error, close, wait the reconnect interval and start over
//!
//! Only explicit cancellation ends the loop. Cancellation drops whatever I/O
//! is in flight and closes the connection, so no further frames are sent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::EvtClient;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::TelemetryFrame;

/// Default wait between connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(60);

/// Consumer of decoded telemetry and connection state.
pub trait TelemetrySink: Send + Sync {
    /// Called once per decoded frame, in arrival order.
    fn publish(&self, address: &str, frame: &TelemetryFrame);

    /// Called when a session is established (`true`) or ends (`false`).
    fn connection_status(&self, address: &str, inverter_id: &str, connected: bool);
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Arc<S> {
    fn publish(&self, address: &str, frame: &TelemetryFrame) {
        (**self).publish(address, frame);
    }

    fn connection_status(&self, address: &str, inverter_id: &str, connected: bool) {
        (**self).connection_status(address, inverter_id, connected);
    }
}

/// Drives one client through the reconnect/poll/read cycle.
pub struct Supervisor<T, S> {
    client: EvtClient<T>,
    sink: S,
    reconnect_interval: Duration,
}

impl<T: Transport, S: TelemetrySink> Supervisor<T, S> {
    /// Creates a supervisor with the default reconnect interval.
    #[must_use]
    pub const fn new(client: EvtClient<T>, sink: S) -> Self {
        Self {
            client,
            sink,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Sets the wait between connection attempts.
    #[must_use]
    pub const fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Returns the supervised client.
    #[must_use]
    pub const fn client(&self) -> &EvtClient<T> {
        &self.client
    }

    /// Runs until `cancel` fires, then returns [`Error::Cancelled`].
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            let err = self.session(cancel).await;

            if let Err(e) = self.client.close().await {
                tracing::debug!("close failed: {}", e);
            }

            // Errors raised while tearing down for cancellation are expected.
            if cancel.is_cancelled() {
                tracing::info!(inverter_id = %self.client.inverter_id(), "inverter session cancelled");
                return Err(Error::Cancelled);
            }

            tracing::warn!(
                inverter_id = %self.client.inverter_id(),
                address = %self.client.address(),
                error = %err,
                "connection lost to inverter; retrying in {:?}",
                self.reconnect_interval
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(self.reconnect_interval) => {}
            }
        }
    }

    /// Runs one connection until it fails; returns the cause.
    async fn session(&mut self, cancel: &CancellationToken) -> Error {
        tracing::info!(
            inverter_id = %self.client.inverter_id(),
            address = %self.client.address(),
            "opening connection to inverter"
        );

        if let Err(e) = until_cancelled(cancel, self.client.connect()).await {
            return e;
        }

        tracing::info!("connection established [{}]", self.client);

        let address = self.client.address().to_owned();
        let inverter_id = self.client.inverter_id().to_owned();

        self.sink.connection_status(&address, &inverter_id, true);
        let err = self.read_loop(cancel, &address).await;
        self.sink.connection_status(&address, &inverter_id, false);

        err
    }

    async fn read_loop(&mut self, cancel: &CancellationToken, address: &str) -> Error {
        if let Err(e) = until_cancelled(cancel, self.client.poll()).await {
            return e;
        }

        loop {
            match until_cancelled(cancel, self.client.read_frame()).await {
                Ok(frame) => {
                    tracing::debug!(
                        "inverter status received [{:.2}W {:.3}kWh]",
                        frame.total_power_ac(),
                        frame.total_energy()
                    );
                    self.sink.publish(address, &frame);
                }
                Err(Error::Timeout { timeout_ms }) => {
                    tracing::debug!("no frame within {}ms; polling", timeout_ms);
                    if let Err(e) = until_cancelled(cancel, self.client.poll()).await {
                        return e;
                    }
                }
                Err(Error::FrameDiscarded(reason)) => {
                    tracing::debug!("skipping unrecognized frame: {}", reason);
                }
                Err(e) => return e,
            }
        }
    }
}

/// Races `fut` against cancellation. Cancellation wins ties.
async fn until_cancelled<F, R>(cancel: &CancellationToken, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}
