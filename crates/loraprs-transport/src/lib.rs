//! Concrete links for the LoRa APRS gateway.
//!
//! This crate provides implementations of the traits from `loraprs-core`
//! for the physical connections a gateway uses:
//!
//! - [`SerialTransport`]: the local KISS terminal (Bluetooth SPP or USB serial)
//! - [`TcpTransport`] / [`TcpConnector`]: the APRS-IS relay session
//! - [`UdpRadio`]: a LoRa modem reached over UDP datagrams, framed by
//!   [`ModemMessage`]
//!
//! # Example
//!
//! ```no_run
//! use loraprs_transport::SerialTransport;
//! use loraprs_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> loraprs_core::Result<()> {
//! let mut terminal = SerialTransport::open("/dev/rfcomm0", 115_200).await?;
//!
//! let mut buf = [0u8; 256];
//! let n = terminal.receive(&mut buf, Duration::from_millis(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod modem;
pub mod serial;
pub mod tcp;
pub mod udp;

pub use modem::ModemMessage;
pub use serial::{FlowControl, SerialConfig, SerialTransport};
pub use tcp::{TcpConnector, TcpTransport, DEFAULT_CONNECT_TIMEOUT};
pub use udp::{UdpRadio, MAX_PACKET_LEN};
