//! Mock byte stream for the KISS terminal and relay sessions.
//!
//! [`MockTransport`] implements the [`Transport`] trait over a queue of
//! scripted inbound chunks and a log of everything sent. `receive()` never
//! waits: an empty queue is reported as [`Error::Timeout`] straight away,
//! which is exactly what a quiet terminal looks like to the gateway.
//!
//! # Example
//!
//! ```
//! use loraprs_test_harness::MockTransport;
//!
//! let terminal = MockTransport::new();
//! // A KISS data frame carrying "A" arrives from the terminal.
//! terminal.push_inbound(&[0xC0, 0x00, 0x41, 0xC0]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use loraprs_core::error::{Error, Result};
use loraprs_core::transport::Transport;

/// One scripted inbound event.
#[derive(Debug, Clone)]
enum Inbound {
    /// Bytes returned by the next `receive()` calls.
    Data(Vec<u8>),
    /// The peer hangs up at this point in the stream.
    Lost,
}

#[derive(Debug)]
struct State {
    inbound: VecDeque<Inbound>,
    connected: bool,
    fail_sends: bool,
    sent_log: Vec<Vec<u8>>,
    close_count: usize,
}

/// A mock [`Transport`] for testing without devices or sockets.
///
/// Cloning yields a handle onto the same stream.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(State {
                inbound: VecDeque::new(),
                connected: true,
                fail_sends: false,
                sent_log: Vec::new(),
                close_count: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread poisons the lock; the state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue bytes to be returned by subsequent `receive()` calls.
    ///
    /// Each chunk is delivered by one `receive()` unless the caller's buffer
    /// is smaller, in which case the rest is returned by the next call.
    pub fn push_inbound(&self, data: &[u8]) {
        self.lock().inbound.push_back(Inbound::Data(data.to_vec()));
    }

    /// Queue a hang-up: once the preceding chunks are read, `receive()`
    /// returns [`Error::ConnectionLost`] and the transport disconnects.
    pub fn push_connection_lost(&self) {
        self.lock().inbound.push_back(Inbound::Lost);
    }

    /// Everything sent through this transport, one element per `send()`.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent_log.clone()
    }

    /// Everything sent, concatenated and decoded as UTF-8 (lossy).
    pub fn sent_text(&self) -> String {
        let state = self.lock();
        let bytes: Vec<u8> = state.sent_log.iter().flatten().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of inbound chunks not yet consumed.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// How many times `close()` was called.
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// Set the connected state.
    ///
    /// When `false`, subsequent `send()` and `receive()` calls return
    /// [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Make every subsequent `send()` fail with [`Error::ConnectionLost`].
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_sends {
            return Err(Error::ConnectionLost);
        }
        state.sent_log.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut state = self.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        match state.inbound.pop_front() {
            Some(Inbound::Data(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    state.inbound.push_front(Inbound::Data(chunk[n..].to_vec()));
                }
                Ok(n)
            }
            Some(Inbound::Lost) => {
                state.connected = false;
                Err(Error::ConnectionLost)
            }
            None => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.connected = false;
        state.close_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
