//! Byte-stream transports for the gateway's non-radio links.
//!
//! The [`Transport`] trait abstracts over the Local Terminal Stream (a
//! serial or Bluetooth SPP device speaking KISS) and the Relay Network
//! Connection (a TCP session to an APRS-IS server). The gateway and the
//! relay connection manager operate on `Box<dyn Transport>` so they can be
//! driven by mock transports from `loraprs-test-harness` in tests.
//!
//! [`Connector`] opens a fresh transport on demand; the relay connection
//! manager uses it to (re)establish sessions.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes.
    ///
    /// Implementations should return once all bytes have been handed to the
    /// underlying device or socket.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline. A short timeout turns this
    /// into a non-blocking poll.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Opens new [`Transport`] sessions to a fixed remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new connection.
    async fn connect(&self) -> Result<Box<dyn Transport>>;

    /// Human-readable description of the endpoint, for logging.
    fn endpoint(&self) -> String;
}
