//! Datagram format spoken with an external LoRa modem process.
//!
//! Every datagram starts with a one-byte kind. Multi-byte fields are
//! big-endian; `f32` values are IEEE 754.
//!
//! ```text
//! 0x01 RECEIVED   modem -> gateway | snr f32 | rssi f32 | freq_err i64 | packet... |
//! 0x02 TRANSMIT   gateway -> modem | packet... |
//! 0x03 CONFIGURE  gateway -> modem | freq u64 | bw u32 | sf u8 | cr u8 | power u8 | sync u8 |
//! ```
//!
//! `CONFIGURE` carries the full tuning set and is sent at bring-up and on
//! every retune. This module is a pure codec with no I/O.

use bytes::{Buf, BufMut, BytesMut};
use loraprs_core::error::{Error, Result};
use loraprs_core::types::{RadioConfig, RadioPacket, SignalMetrics};

/// Kind byte of a received-packet report.
pub const KIND_RECEIVED: u8 = 0x01;

/// Kind byte of a transmit request.
pub const KIND_TRANSMIT: u8 = 0x02;

/// Kind byte of a tuning update.
pub const KIND_CONFIGURE: u8 = 0x03;

/// Bytes before the packet in a `RECEIVED` datagram.
pub const RECEIVED_HEADER_LEN: usize = 1 + 4 + 4 + 8;

/// Exact length of a `CONFIGURE` datagram.
pub const CONFIGURE_LEN: usize = 1 + 8 + 4 + 4;

/// One datagram exchanged with the modem.
#[derive(Debug, Clone, PartialEq)]
pub enum ModemMessage {
    /// A packet heard on the air, with its reception metrics.
    Received(RadioPacket),
    /// A packet to put on the air.
    Transmit(Vec<u8>),
    /// New tuning parameters.
    Configure(RadioConfig),
}

impl ModemMessage {
    /// Serialize into one datagram.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ModemMessage::Received(packet) => {
                let mut buf = BytesMut::with_capacity(RECEIVED_HEADER_LEN + packet.data.len());
                buf.put_u8(KIND_RECEIVED);
                buf.put_f32(packet.metrics.snr_db);
                buf.put_f32(packet.metrics.rssi_dbm);
                buf.put_i64(packet.metrics.freq_error_hz);
                buf.put_slice(&packet.data);
                buf.to_vec()
            }
            ModemMessage::Transmit(data) => {
                let mut buf = BytesMut::with_capacity(1 + data.len());
                buf.put_u8(KIND_TRANSMIT);
                buf.put_slice(data);
                buf.to_vec()
            }
            ModemMessage::Configure(config) => {
                let mut buf = BytesMut::with_capacity(CONFIGURE_LEN);
                buf.put_u8(KIND_CONFIGURE);
                buf.put_u64(config.freq_hz);
                buf.put_u32(config.bandwidth_hz);
                buf.put_u8(config.spreading_factor);
                buf.put_u8(config.coding_rate);
                buf.put_u8(config.tx_power_dbm);
                buf.put_u8(config.sync_word);
                buf.to_vec()
            }
        }
    }

    /// Parse one datagram.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let Some((&kind, mut body)) = data.split_first() else {
            return Err(Error::Protocol("empty modem datagram".into()));
        };

        match kind {
            KIND_RECEIVED => {
                if data.len() < RECEIVED_HEADER_LEN {
                    return Err(Error::Protocol(format!(
                        "RECEIVED datagram too short: {} bytes, minimum is {RECEIVED_HEADER_LEN}",
                        data.len()
                    )));
                }
                let metrics = SignalMetrics {
                    snr_db: body.get_f32(),
                    rssi_dbm: body.get_f32(),
                    freq_error_hz: body.get_i64(),
                };
                Ok(ModemMessage::Received(RadioPacket::new(body, metrics)))
            }
            KIND_TRANSMIT => Ok(ModemMessage::Transmit(body.to_vec())),
            KIND_CONFIGURE => {
                if data.len() != CONFIGURE_LEN {
                    return Err(Error::Protocol(format!(
                        "CONFIGURE datagram is {} bytes, expected {CONFIGURE_LEN}",
                        data.len()
                    )));
                }
                Ok(ModemMessage::Configure(RadioConfig {
                    freq_hz: body.get_u64(),
                    bandwidth_hz: body.get_u32(),
                    spreading_factor: body.get_u8(),
                    coding_rate: body.get_u8(),
                    tx_power_dbm: body.get_u8(),
                    sync_word: body.get_u8(),
                }))
            }
            other => Err(Error::Protocol(format!(
                "unknown modem datagram kind {other:#04x}"
            ))),
        }
    }
}
