//! Transport layer for inverter communication.
//!
//! A transport owns one point-to-point stream to the inverter. Currently only
//! TCP is implemented.

pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait for transport implementations.
pub trait Transport: Send {
    /// Opens the connection.
    fn open(&mut self) -> TransportFuture<'_, ()>;

    /// Reads whatever the peer sends next into `buf`.
    ///
    /// With a deadline, returns [`Error::Timeout`](crate::Error::Timeout) if
    /// no data arrives within it; without one, blocks until data or failure.
    fn read<'a>(&'a mut self, buf: &'a mut [u8], deadline: Option<Duration>)
    -> TransportFuture<'a, usize>;

    /// Writes all of `data`.
    fn write(&mut self, data: Bytes) -> TransportFuture<'_, usize>;

    /// Closes the connection. Closing a closed transport is a no-op.
    fn close(&mut self) -> TransportFuture<'_, ()>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;

    /// The configured peer address.
    fn address(&self) -> &str;

    /// Local and remote endpoints of the live connection.
    fn endpoints(&self) -> Option<(String, String)> {
        None
    }
}

pub use tcp::{TcpConfig, TcpTransport};
