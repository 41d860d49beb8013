//! UDP radio bridge.
//!
//! [`UdpRadio`] implements [`RadioEndpoint`] for a LoRa modem that runs as a
//! separate process (an SDR flowgraph or a modem daemon on the same host).
//! Each radio packet travels in one UDP datagram framed as described in
//! [`crate::modem`]: heard packets arrive with their SNR, RSSI and frequency
//! error, and tuning changes are pushed to the modem as `CONFIGURE`
//! datagrams.
//!
//! # Example
//!
//! ```no_run
//! use loraprs_core::{RadioConfig, RadioEndpoint};
//! use loraprs_transport::UdpRadio;
//!
//! # async fn example() -> loraprs_core::Result<()> {
//! let peer = "127.0.0.1:7000".parse().unwrap();
//! let mut radio = UdpRadio::bind("127.0.0.1:7001", peer, RadioConfig::default()).await?;
//! if let Some(packet) = radio.poll_packet().await? {
//!     println!("heard {} bytes at {} dBm", packet.data.len(), packet.metrics.rssi_dbm);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use loraprs_core::error::{Error, Result};
use loraprs_core::radio::RadioEndpoint;
use loraprs_core::types::{RadioConfig, RadioPacket};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::modem::{ModemMessage, RECEIVED_HEADER_LEN};

/// Largest LoRa payload (explicit header mode).
pub const MAX_PACKET_LEN: usize = 255;

/// A LoRa radio reached over UDP datagrams.
#[derive(Debug)]
pub struct UdpRadio {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peer: SocketAddr,
    config: RadioConfig,
}

impl UdpRadio {
    /// Bind `local`, then push `config` to the modem at `peer`.
    pub async fn bind(local: &str, peer: SocketAddr, config: RadioConfig) -> Result<Self> {
        tracing::debug!(local = %local, peer = %peer, "Binding UDP radio bridge");

        let socket = UdpSocket::bind(local).await.map_err(|e| {
            tracing::error!(local = %local, error = %e, "Failed to bind UDP socket");
            Error::Io(e)
        })?;
        let local_addr = socket.local_addr().map_err(Error::Io)?;

        let mut radio = Self {
            socket,
            local_addr,
            peer,
            config: config.clone(),
        };
        radio.configure(config).await?;

        tracing::info!(local = %local_addr, peer = %peer, "UDP radio bridge ready");
        Ok(radio)
    }

    /// The local address the bridge is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The modem's address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The tuning last pushed to the modem.
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Push a full tuning set to the modem.
    ///
    /// The new settings are kept only once the datagram is sent.
    pub async fn configure(&mut self, config: RadioConfig) -> Result<()> {
        tracing::debug!(
            peer = %self.peer,
            freq_hz = config.freq_hz,
            bw_hz = config.bandwidth_hz,
            sf = config.spreading_factor,
            cr = config.coding_rate,
            power_dbm = config.tx_power_dbm,
            sync = config.sync_word,
            "Configuring modem"
        );
        self.send(&ModemMessage::Configure(config.clone())).await?;
        self.config = config;
        Ok(())
    }

    async fn send(&self, msg: &ModemMessage) -> Result<()> {
        self.socket
            .send_to(&msg.encode(), self.peer)
            .await
            .map_err(|e| {
                tracing::error!(peer = %self.peer, error = %e, "Failed to send datagram");
                Error::Io(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl RadioEndpoint for UdpRadio {
    async fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > MAX_PACKET_LEN {
            return Err(Error::InvalidParameter(format!(
                "packet of {} bytes exceeds LoRa maximum of {MAX_PACKET_LEN}",
                packet.len()
            )));
        }

        tracing::trace!(peer = %self.peer, bytes = packet.len(), "Transmitting packet");
        self.send(&ModemMessage::Transmit(packet.to_vec())).await
    }

    async fn poll_packet(&mut self) -> Result<Option<RadioPacket>> {
        let mut buf = [0u8; RECEIVED_HEADER_LEN + MAX_PACKET_LEN + 1];
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((n, src)) if src == self.peer => match ModemMessage::parse(&buf[..n]) {
                    Ok(ModemMessage::Received(packet)) if packet.data.len() <= MAX_PACKET_LEN => {
                        return Ok(Some(packet));
                    }
                    Ok(ModemMessage::Received(packet)) => {
                        tracing::debug!(bytes = packet.data.len(), "Dropping oversized packet");
                    }
                    Ok(other) => {
                        tracing::debug!(kind = ?other, "Ignoring unexpected modem datagram");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping malformed modem datagram");
                    }
                },
                Ok((_, src)) => {
                    tracing::debug!(src = %src, "Ignoring datagram from unknown sender");
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    async fn set_frequency(&mut self, freq_hz: u64) -> Result<()> {
        tracing::debug!(
            from = self.config.freq_hz,
            to = freq_hz,
            "Retuning modem"
        );
        let config = RadioConfig {
            freq_hz,
            ..self.config.clone()
        };
        self.configure(config).await
    }

    fn frequency(&self) -> u64 {
        self.config.freq_hz
    }
}
