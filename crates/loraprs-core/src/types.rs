//! Core types shared by the gateway crates.

use std::fmt;
use std::str::FromStr;

/// Operating mode of the gateway node.
///
/// A client node serves a local KISS terminal and only forwards to the
/// relay network opportunistically; a fixed station is an always-online
/// gateway that must keep its uplink connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperatingMode {
    /// Portable node paired with a local terminal.
    #[default]
    Client,
    /// Fixed gateway / digipeater station.
    Fixed,
}

impl OperatingMode {
    /// Returns `true` for [`OperatingMode::Client`].
    pub fn is_client(&self) -> bool {
        matches!(self, OperatingMode::Client)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Client => write!(f, "client"),
            OperatingMode::Fixed => write!(f, "fixed"),
        }
    }
}

/// Error returned when parsing an [`OperatingMode`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operating mode: {}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for OperatingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(OperatingMode::Client),
            "fixed" | "server" | "digi" => Ok(OperatingMode::Fixed),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// LoRa modem tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    /// Center frequency in hertz.
    pub freq_hz: u64,
    /// Signal bandwidth in hertz (e.g. 125 000).
    pub bandwidth_hz: u32,
    /// Spreading factor (6..=12).
    pub spreading_factor: u8,
    /// Coding rate denominator, i.e. 4/`coding_rate` (5..=8).
    pub coding_rate: u8,
    /// Transmit power in dBm.
    pub tx_power_dbm: u8,
    /// Sync word distinguishing LoRa networks.
    pub sync_word: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            freq_hz: 433_775_000,
            bandwidth_hz: 125_000,
            spreading_factor: 12,
            coding_rate: 7,
            tx_power_dbm: 20,
            sync_word: 0x34,
        }
    }
}

/// Per-packet reception metrics reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalMetrics {
    /// Signal-to-noise ratio in dB.
    pub snr_db: f32,
    /// Received signal strength in dBm.
    pub rssi_dbm: f32,
    /// Measured center-frequency error in hertz.
    pub freq_error_hz: i64,
}

/// One packet received over the radio.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RadioPacket {
    /// The complete packet payload.
    pub data: Vec<u8>,
    /// Reception metrics for this packet.
    pub metrics: SignalMetrics,
}

impl RadioPacket {
    /// Create a packet with the given payload and metrics.
    pub fn new(data: impl Into<Vec<u8>>, metrics: SignalMetrics) -> Self {
        Self {
            data: data.into(),
            metrics,
        }
    }
}
