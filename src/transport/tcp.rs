//! TCP transport implementation.
//!
//! The inverter's Wi-Fi bridge exposes the protocol on a plain TCP port.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream, lookup_host};

use crate::error::Error;
use crate::transport::{Transport, TransportFuture};

/// Configuration for TCP transport.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Inverter address (e.g., "192.0.2.1:14889").
    pub address: String,
    /// Enable TCP keep-alive probes on the socket.
    pub keepalive: bool,
}

impl TcpConfig {
    /// Creates a new TCP configuration with default settings.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            keepalive: true,
        }
    }

    /// Sets whether keep-alive probing is enabled.
    #[must_use]
    pub const fn keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }
}

/// TCP transport to a single inverter.
pub struct TcpTransport {
    config: TcpConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Creates a new TCP transport with the given configuration.
    #[must_use]
    pub const fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Creates a new TCP transport for the given address with default settings.
    #[must_use]
    pub fn with_address(address: impl Into<String>) -> Self {
        Self::new(TcpConfig::new(address))
    }

    async fn dial(&self) -> io::Result<TcpStream> {
        let mut last_err = None;

        for addr in lookup_host(&self.config.address).await? {
            match self.dial_addr(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to no hosts")
        }))
    }

    async fn dial_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if self.config.keepalive {
            socket.set_keepalive(true)?;
        }
        socket.connect(addr).await
    }
}

impl Transport for TcpTransport {
    fn open(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            if self.config.address.is_empty() {
                return Err(Error::Connect {
                    address: String::new(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "address is empty"),
                });
            }

            tracing::debug!("connecting to {}", self.config.address);

            let stream = self.dial().await.map_err(|source| Error::Connect {
                address: self.config.address.clone(),
                source,
            })?;

            self.stream = Some(stream);
            Ok(())
        })
    }

    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        deadline: Option<Duration>,
    ) -> TransportFuture<'a, usize> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            let result = match deadline {
                Some(limit) => tokio::time::timeout(limit, stream.read(buf))
                    .await
                    .map_err(|_| Error::Timeout {
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })?,
                None => stream.read(buf).await,
            };

            match result {
                Ok(0) => Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection closed by peer",
                ))),
                Ok(n) => {
                    tracing::trace!("received {} bytes", n);
                    Ok(n)
                }
                Err(e) => Err(Error::Io(e)),
            }
        })
    }

    fn write(&mut self, data: Bytes) -> TransportFuture<'_, usize> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            tracing::trace!("sending {} bytes", data.len());
            stream.write_all(&data).await?;
            stream.flush().await?;

            Ok(data.len())
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut stream) = self.stream.take() {
                tracing::debug!("closing connection to {}", self.config.address);
                // The peer may already be gone; the socket is released either way.
                if let Err(e) = stream.shutdown().await {
                    tracing::debug!("shutdown failed: {}", e);
                }
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn address(&self) -> &str {
        &self.config.address
    }

    fn endpoints(&self) -> Option<(String, String)> {
        let stream = self.stream.as_ref()?;
        let local = stream.local_addr().ok()?;
        let remote = stream.peer_addr().ok()?;
        Some((local.to_string(), remote.to_string()))
    }
}
