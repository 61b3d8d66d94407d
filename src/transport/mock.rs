//! Scripted in-memory transport for client and supervisor tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;

use crate::error::Error;
use crate::transport::{Transport, TransportFuture};

/// Outcome of one scripted read.
#[derive(Debug, Clone)]
pub(crate) enum ReadStep {
    /// Deliver these bytes.
    Data(Vec<u8>),
    /// Report an expired deadline.
    Timeout,
    /// Fail with a fatal I/O error.
    Fail,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub script: VecDeque<ReadStep>,
    pub writes: Vec<Bytes>,
    pub opens: usize,
    pub closes: usize,
    pub fail_open: bool,
    pub fail_writes: bool,
    connected: bool,
}

/// Shared view of a [`MockTransport`]'s state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Probe(Arc<Mutex<MockState>>);

impl Probe {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Number of writes whose control byte matches `control`.
    pub fn writes_with_control(&self, control: u8) -> usize {
        self.state()
            .writes
            .iter()
            .filter(|w| w.get(5) == Some(&control))
            .count()
    }
}

/// Transport that replays a read script and records writes.
///
/// Once the script is exhausted, reads block until the future is dropped.
pub(crate) struct MockTransport {
    probe: Probe,
}

impl MockTransport {
    pub fn new(script: impl IntoIterator<Item = ReadStep>) -> (Self, Probe) {
        let probe = Probe::default();
        probe.state().script.extend(script);
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.probe.state();
            state.opens += 1;
            if state.fail_open {
                return Err(Error::Connect {
                    address: "mock".into(),
                    source: io::ErrorKind::ConnectionRefused.into(),
                });
            }
            state.connected = true;
            Ok(())
        })
    }

    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        deadline: Option<Duration>,
    ) -> TransportFuture<'a, usize> {
        Box::pin(async move {
            let step = {
                let mut state = self.probe.state();
                if !state.connected {
                    return Err(Error::NotConnected);
                }
                state.script.pop_front()
            };

            match step {
                Some(ReadStep::Data(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(ReadStep::Timeout) => Err(Error::Timeout {
                    timeout_ms: deadline.map_or(0, |d| d.as_millis() as u64),
                }),
                Some(ReadStep::Fail) => Err(Error::Io(io::ErrorKind::ConnectionReset.into())),
                None => std::future::pending().await,
            }
        })
    }

    fn write(&mut self, data: Bytes) -> TransportFuture<'_, usize> {
        Box::pin(async move {
            let mut state = self.probe.state();
            if !state.connected {
                return Err(Error::NotConnected);
            }
            if state.fail_writes {
                return Err(Error::Io(io::ErrorKind::BrokenPipe.into()));
            }
            let len = data.len();
            state.writes.push(data);
            Ok(len)
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.probe.state();
            if state.connected {
                state.connected = false;
                state.closes += 1;
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.probe.state().connected
    }

    fn address(&self) -> &str {
        "mock:14889"
    }
}
