//! GatewayConfig -- the immutable startup configuration of a gateway.
//!
//! A [`GatewayConfig`] is produced once by [`GatewayConfigBuilder`] and then
//! only read. The relay login line is derived from it at build time into a
//! separate [`LoginLine`] value.
//!
//! # Example
//!
//! ```
//! use loraprs::config::GatewayConfig;
//! use loraprs_core::OperatingMode;
//!
//! # fn example() -> loraprs_core::Result<()> {
//! let config = GatewayConfig::builder()
//!     .mode(OperatingMode::Fixed)
//!     .callsign("N0CALL-10")
//!     .passcode("12345")
//!     .auto_freq_correction(true)
//!     .build()?;
//!
//! assert_eq!(
//!     config.login().line(),
//!     format!("user N0CALL-10 pass 12345 vers loraprs {}\n", env!("CARGO_PKG_VERSION"))
//! );
//! # Ok(())
//! # }
//! ```

use std::fmt;

use loraprs_core::error::{Error, Result};
use loraprs_core::types::{OperatingMode, RadioConfig};

/// Software name announced in the relay login.
pub const CLIENT_NAME: &str = "loraprs";

/// Default APRS-IS rotation address.
pub const DEFAULT_RELAY_HOST: &str = "rotate.aprs2.net";

/// Default APRS-IS user-defined filter port.
pub const DEFAULT_RELAY_PORT: u16 = 14580;

/// Receive-only passcode.
pub const DEFAULT_PASSCODE: &str = "-1";

/// APRS-IS server address and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Login callsign, with SSID if any.
    pub callsign: String,
    pub passcode: String,
}

/// Optional gateway behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Retune by each packet's measured frequency error.
    pub auto_freq_correction: bool,
    /// Append the signal report to forwarded lines.
    pub signal_report: bool,
    /// Keep the relay session open between sends.
    pub persistent_relay: bool,
    /// Forward relay traffic onto the radio. Accepted but not acted on.
    pub relay_to_radio: bool,
    /// Digipeat heard frames. Accepted but not acted on.
    pub digipeat: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            auto_freq_correction: false,
            signal_report: true,
            persistent_relay: false,
            relay_to_radio: false,
            digipeat: false,
        }
    }
}

/// The APRS-IS login line, built from configuration fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginLine {
    callsign: String,
    passcode: String,
    client: String,
    version: String,
}

impl LoginLine {
    /// Build a login for this software.
    pub fn new(callsign: &str, passcode: &str) -> Self {
        Self::with_client(callsign, passcode, CLIENT_NAME, env!("CARGO_PKG_VERSION"))
    }

    /// Build a login announcing another client name and version.
    pub fn with_client(callsign: &str, passcode: &str, client: &str, version: &str) -> Self {
        Self {
            callsign: callsign.to_string(),
            passcode: passcode.to_string(),
            client: client.to_string(),
            version: version.to_string(),
        }
    }

    /// The exact wire text, newline included.
    pub fn line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LoginLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user {} pass {} vers {} {}",
            self.callsign, self.passcode, self.client, self.version
        )
    }
}

/// Immutable gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    mode: OperatingMode,
    radio: RadioConfig,
    relay: RelayConfig,
    features: FeatureFlags,
    login: LoginLine,
}

impl GatewayConfig {
    /// Start building a configuration from defaults.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn radio(&self) -> &RadioConfig {
        &self.radio
    }

    pub fn relay(&self) -> &RelayConfig {
        &self.relay
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// The relay login derived from [`relay`](Self::relay).
    pub fn login(&self) -> &LoginLine {
        &self.login
    }
}

/// Fluent builder for [`GatewayConfig`].
///
/// Defaults: client mode, 433.775 MHz, 125 kHz, SF12, CR 4/7, 20 dBm,
/// sync word 0x34, relay `rotate.aprs2.net:14580` with passcode `-1`,
/// signal report on and every other feature off. The callsign has no
/// default and must be set.
#[derive(Debug, Clone)]
pub struct GatewayConfigBuilder {
    mode: OperatingMode,
    radio: RadioConfig,
    relay: RelayConfig,
    features: FeatureFlags,
}

impl GatewayConfigBuilder {
    pub fn new() -> Self {
        Self {
            mode: OperatingMode::default(),
            radio: RadioConfig::default(),
            relay: RelayConfig {
                host: DEFAULT_RELAY_HOST.to_string(),
                port: DEFAULT_RELAY_PORT,
                callsign: String::new(),
                passcode: DEFAULT_PASSCODE.to_string(),
            },
            features: FeatureFlags::default(),
        }
    }

    pub fn mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace all radio parameters at once.
    pub fn radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Center frequency in hertz.
    pub fn frequency(mut self, freq_hz: u64) -> Self {
        self.radio.freq_hz = freq_hz;
        self
    }

    /// Signal bandwidth in hertz.
    pub fn bandwidth(mut self, bandwidth_hz: u32) -> Self {
        self.radio.bandwidth_hz = bandwidth_hz;
        self
    }

    pub fn spreading_factor(mut self, sf: u8) -> Self {
        self.radio.spreading_factor = sf;
        self
    }

    /// Coding rate denominator (4/`cr`).
    pub fn coding_rate(mut self, cr: u8) -> Self {
        self.radio.coding_rate = cr;
        self
    }

    pub fn tx_power(mut self, dbm: u8) -> Self {
        self.radio.tx_power_dbm = dbm;
        self
    }

    pub fn sync_word(mut self, sync: u8) -> Self {
        self.radio.sync_word = sync;
        self
    }

    pub fn relay_host(mut self, host: &str) -> Self {
        self.relay.host = host.to_string();
        self
    }

    pub fn relay_port(mut self, port: u16) -> Self {
        self.relay.port = port;
        self
    }

    /// APRS-IS login callsign.
    pub fn callsign(mut self, callsign: &str) -> Self {
        self.relay.callsign = callsign.to_string();
        self
    }

    /// APRS-IS passcode (`-1` for receive-only).
    pub fn passcode(mut self, passcode: &str) -> Self {
        self.relay.passcode = passcode.to_string();
        self
    }

    pub fn auto_freq_correction(mut self, enabled: bool) -> Self {
        self.features.auto_freq_correction = enabled;
        self
    }

    pub fn signal_report(mut self, enabled: bool) -> Self {
        self.features.signal_report = enabled;
        self
    }

    pub fn persistent_relay(mut self, enabled: bool) -> Self {
        self.features.persistent_relay = enabled;
        self
    }

    pub fn relay_to_radio(mut self, enabled: bool) -> Self {
        self.features.relay_to_radio = enabled;
        self
    }

    pub fn digipeat(mut self, enabled: bool) -> Self {
        self.features.digipeat = enabled;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<GatewayConfig> {
        let radio = &self.radio;
        if !(6..=12).contains(&radio.spreading_factor) {
            return Err(Error::InvalidParameter(format!(
                "spreading factor must be 6..=12, got {}",
                radio.spreading_factor
            )));
        }
        if !(5..=8).contains(&radio.coding_rate) {
            return Err(Error::InvalidParameter(format!(
                "coding rate denominator must be 5..=8, got {}",
                radio.coding_rate
            )));
        }
        if radio.bandwidth_hz == 0 {
            return Err(Error::InvalidParameter("bandwidth must be non-zero".into()));
        }

        let relay = &self.relay;
        if relay.callsign.is_empty() {
            return Err(Error::InvalidParameter("relay callsign is required".into()));
        }
        if relay.callsign.chars().any(char::is_whitespace)
            || relay.passcode.chars().any(char::is_whitespace)
        {
            return Err(Error::InvalidParameter(
                "relay callsign and passcode must not contain whitespace".into(),
            ));
        }
        if relay.port == 0 {
            return Err(Error::InvalidParameter("relay port must be non-zero".into()));
        }

        let login = LoginLine::new(&relay.callsign, &relay.passcode);

        Ok(GatewayConfig {
            mode: self.mode,
            radio: self.radio,
            relay: self.relay,
            features: self.features,
            login,
        })
    }
}

impl Default for GatewayConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
