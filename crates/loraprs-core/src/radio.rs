//! The `RadioEndpoint` trait -- the gateway's view of the LoRa transceiver.
//!
//! Modem bring-up and register configuration live behind this trait; the
//! gateway only sends and receives discrete packets, reads per-packet
//! metrics, and retunes the center frequency.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RadioPacket;

/// Packet-oriented interface to a LoRa radio.
#[async_trait]
pub trait RadioEndpoint: Send + Sync {
    /// Transmit one packet. The whole buffer goes out as a single radio frame.
    async fn transmit(&mut self, packet: &[u8]) -> Result<()>;

    /// Return the next received packet, if one is pending.
    ///
    /// Must not block waiting for traffic; `Ok(None)` means nothing arrived.
    async fn poll_packet(&mut self) -> Result<Option<RadioPacket>>;

    /// Retune the receiver/transmitter to `freq_hz`.
    async fn set_frequency(&mut self, freq_hz: u64) -> Result<()>;

    /// Current center frequency in hertz.
    fn frequency(&self) -> u64;
}
