//! Gateway -- the polling loop tying radio, terminal and relay together.
//!
//! Each iteration:
//!
//! 1. A fixed station whose uplink is down reconnects it, blocking until the
//!    [`RetryPolicy`] succeeds. Client nodes skip this.
//! 2. The KISS terminal is drained; every completed data frame is
//!    transmitted over the radio as-is.
//! 3. A received radio packet is echoed to the terminal as a KISS frame,
//!    decoded as AX.25, cut at its first line break, annotated with a signal
//!    report and forwarded to the relay when the uplink is up. The frequency is then corrected if
//!    enabled.
//!
//! Terminal draining finishes before the radio is looked at, so a packet is
//! never handled in the middle of a partial KISS decode.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use loraprs_ax25::Ax25Frame;
use loraprs_core::error::{Error, Result};
use loraprs_core::format_freq_mhz;
use loraprs_core::radio::RadioEndpoint;
use loraprs_core::transport::{Connector, Transport};
use loraprs_core::types::RadioPacket;
use loraprs_core::uplink::Uplink;
use loraprs_kiss::{encode_frame, Command, KissDecoder};

use crate::config::GatewayConfig;
use crate::relay::{RelayManager, RelayState};
use crate::retry::RetryPolicy;
use crate::signal::{FrequencyCorrector, SignalReport};

/// Pause between loop iterations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read timeout used to poll the terminal without blocking.
pub const TERMINAL_POLL: Duration = Duration::from_millis(1);

const TERMINAL_BUF_LEN: usize = 256;

/// Running counters, mainly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Packets heard on the radio.
    pub packets_received: u64,
    /// Heard packets that were not decodable UI frames.
    pub frames_dropped: u64,
    /// Lines accepted by the relay.
    pub lines_forwarded: u64,
    /// Lines lost to relay connect or send failures.
    pub relay_failures: u64,
    /// KISS frames from the terminal put on the air.
    pub frames_transmitted: u64,
}

/// The LoRa APRS gateway.
pub struct Gateway {
    config: GatewayConfig,
    radio: Box<dyn RadioEndpoint>,
    terminal: Option<Box<dyn Transport>>,
    uplink: Box<dyn Uplink>,
    relay: RelayManager,
    kiss: KissDecoder,
    corrector: FrequencyCorrector,
    uplink_retry: RetryPolicy,
    poll_interval: Duration,
    stats: GatewayStats,
}

impl Gateway {
    /// Assemble a gateway from its collaborators.
    ///
    /// The relay session is opened lazily through `connector`.
    pub fn new(
        config: GatewayConfig,
        radio: Box<dyn RadioEndpoint>,
        uplink: Box<dyn Uplink>,
        connector: Box<dyn Connector>,
    ) -> Self {
        let relay = RelayManager::new(
            connector,
            config.login().clone(),
            config.features().persistent_relay,
        );
        Self {
            config,
            radio,
            terminal: None,
            uplink,
            relay,
            kiss: KissDecoder::new(),
            corrector: FrequencyCorrector::new(),
            uplink_retry: RetryPolicy::default(),
            poll_interval: POLL_INTERVAL,
            stats: GatewayStats::default(),
        }
    }

    /// Attach the local KISS terminal.
    pub fn with_terminal(mut self, terminal: Box<dyn Transport>) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Override the uplink reconnect policy (default: unbounded, 500 ms).
    pub fn with_uplink_retry(mut self, policy: RetryPolicy) -> Self {
        self.uplink_retry = policy;
        self
    }

    /// Override the pause between iterations.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay.state()
    }

    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Current radio center frequency.
    pub fn frequency(&self) -> u64 {
        self.radio.frequency()
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Run until `cancel` fires.
    ///
    /// Cancellation is checked between iterations; an iteration in progress
    /// (including a blocking uplink reconnect) is allowed to finish.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        self.log_startup();

        while !cancel.is_cancelled() {
            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "Gateway iteration failed");
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Run a single iteration without the trailing pause.
    pub async fn poll_once(&mut self) -> Result<()> {
        if !self.config.mode().is_client() && !self.uplink.is_up() {
            info!("Uplink down, reconnecting");
            self.uplink_retry
                .reconnect_uplink(self.uplink.as_mut())
                .await?;
        }

        self.drain_terminal().await;

        if let Some(packet) = self.radio.poll_packet().await? {
            self.handle_packet(packet).await;
        }

        Ok(())
    }

    /// Close the relay session and the terminal.
    pub async fn shutdown(&mut self) {
        self.relay.disconnect().await;
        if let Some(mut terminal) = self.terminal.take() {
            if let Err(e) = terminal.close().await {
                debug!(error = %e, "Error closing terminal (ignored)");
            }
        }
        info!(
            received = self.stats.packets_received,
            forwarded = self.stats.lines_forwarded,
            transmitted = self.stats.frames_transmitted,
            "Gateway stopped"
        );
    }

    fn log_startup(&self) {
        let radio = self.config.radio();
        info!(
            mode = %self.config.mode(),
            freq = %format_freq_mhz(radio.freq_hz),
            bw_hz = radio.bandwidth_hz,
            sf = radio.spreading_factor,
            cr = radio.coding_rate,
            terminal = self.terminal.is_some(),
            "Gateway started"
        );

        let features = self.config.features();
        if features.relay_to_radio {
            warn!("Relay-to-radio forwarding is not supported; flag ignored");
        }
        if features.digipeat {
            warn!("Digipeating is not supported; flag ignored");
        }
    }

    // -----------------------------------------------------------------------
    // Terminal -> radio
    // -----------------------------------------------------------------------

    async fn drain_terminal(&mut self) {
        let Some(terminal) = self.terminal.as_mut() else {
            return;
        };

        let mut buf = [0u8; TERMINAL_BUF_LEN];
        loop {
            let n = match terminal.receive(&mut buf, TERMINAL_POLL).await {
                Ok(0) | Err(Error::Timeout) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "Terminal link lost, detaching");
                    self.terminal = None;
                    self.kiss.reset();
                    break;
                }
            };

            for frame in self.kiss.decode(&buf[..n]) {
                if frame.command != Command::Data {
                    continue;
                }
                debug!(bytes = frame.payload.len(), "Transmitting frame from terminal");
                match self.radio.transmit(&frame.payload).await {
                    Ok(()) => self.stats.frames_transmitted += 1,
                    Err(e) => warn!(error = %e, "Radio transmit failed, frame dropped"),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Radio -> terminal, relay
    // -----------------------------------------------------------------------

    async fn handle_packet(&mut self, packet: RadioPacket) {
        self.stats.packets_received += 1;
        let metrics = packet.metrics;
        debug!(
            bytes = packet.data.len(),
            rssi = metrics.rssi_dbm,
            snr = metrics.snr_db,
            freq_error_hz = metrics.freq_error_hz,
            "Received radio packet"
        );

        self.echo_to_terminal(&packet.data).await;

        match Ax25Frame::decode(&packet.data) {
            Ok(mut frame) => {
                cut_at_line_break(&mut frame);
                let comment = if self.config.features().signal_report {
                    SignalReport::from_metrics(&metrics).to_string()
                } else {
                    String::new()
                };
                self.forward(&frame.to_text_bytes(&comment)).await;
            }
            Err(e) => {
                self.stats.frames_dropped += 1;
                debug!(error = %e, "Dropping undecodable frame");
            }
        }

        if self.config.features().auto_freq_correction {
            if let Err(e) = self.corrector.apply(self.radio.as_mut(), &metrics).await {
                warn!(error = %e, "Frequency correction failed");
            }
        }
    }

    async fn echo_to_terminal(&mut self, data: &[u8]) {
        let Some(terminal) = self.terminal.as_mut() else {
            return;
        };
        let sent = terminal.send(&encode_frame(Command::Data, data)).await;
        if let Err(e) = sent {
            warn!(error = %e, "Terminal link lost, detaching");
            self.terminal = None;
            self.kiss.reset();
        }
    }

    async fn forward(&mut self, text: &[u8]) {
        if !self.uplink.is_up() {
            debug!("Uplink down, not forwarding");
            return;
        }
        match self.relay.send(text).await {
            Ok(()) => self.stats.lines_forwarded += 1,
            Err(e) => {
                self.stats.relay_failures += 1;
                warn!(error = %e, "Line not forwarded");
            }
        }
    }
}

/// Truncate the information field at its first CR or LF.
///
/// APRS-IS is line oriented, so anything after a line break heard on the air
/// would reach the relay as a separate, unauthenticated line.
fn cut_at_line_break(frame: &mut Ax25Frame) {
    if let Some(end) = frame.info.iter().position(|&b| b == b'\r' || b == b'\n') {
        debug!(
            dropped = frame.info.len() - end,
            "Cutting information field at line break"
        );
        frame.info.truncate(end);
    }
}
