//! Mock LoRa radio.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use loraprs_core::error::{Error, Result};
use loraprs_core::radio::RadioEndpoint;
use loraprs_core::types::RadioPacket;

#[derive(Debug)]
struct State {
    inbound: VecDeque<RadioPacket>,
    transmitted: Vec<Vec<u8>>,
    freq_hz: u64,
    retunes: Vec<u64>,
    fail_transmit: bool,
}

/// A mock [`RadioEndpoint`] with queued receptions.
///
/// Cloning yields a handle onto the same radio.
#[derive(Debug, Clone)]
pub struct MockRadio {
    state: Arc<Mutex<State>>,
}

impl MockRadio {
    /// Create a radio tuned to `freq_hz` with nothing queued.
    pub fn new(freq_hz: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                inbound: VecDeque::new(),
                transmitted: Vec::new(),
                freq_hz,
                retunes: Vec::new(),
                fail_transmit: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a packet for a later `poll_packet()`.
    pub fn push_packet(&self, packet: RadioPacket) {
        self.lock().inbound.push_back(packet);
    }

    /// Packets not yet received.
    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Every packet transmitted so far.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.lock().transmitted.clone()
    }

    /// Every frequency passed to `set_frequency()`, in order.
    pub fn retunes(&self) -> Vec<u64> {
        self.lock().retunes.clone()
    }

    /// Make `transmit()` fail with [`Error::Transport`].
    pub fn fail_transmit(&self, fail: bool) {
        self.lock().fail_transmit = fail;
    }
}

#[async_trait]
impl RadioEndpoint for MockRadio {
    async fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.fail_transmit {
            return Err(Error::Transport("mock radio transmit failure".into()));
        }
        state.transmitted.push(packet.to_vec());
        Ok(())
    }

    async fn poll_packet(&mut self) -> Result<Option<RadioPacket>> {
        Ok(self.lock().inbound.pop_front())
    }

    async fn set_frequency(&mut self, freq_hz: u64) -> Result<()> {
        let mut state = self.lock();
        state.freq_hz = freq_hz;
        state.retunes.push(freq_hz);
        Ok(())
    }

    fn frequency(&self) -> u64 {
        self.lock().freq_hz
    }
}
