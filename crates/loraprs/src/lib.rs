//! # loraprs -- LoRa APRS Gateway
//!
//! `loraprs` bridges APRS packet traffic between a LoRa radio, a local
//! packet-radio terminal speaking KISS, and the APRS-IS relay network.
//! Packets heard on the radio are echoed to the terminal, decoded from
//! AX.25 into TNC2 text, optionally annotated with a signal report and
//! forwarded to APRS-IS. KISS frames from the terminal are transmitted
//! over the radio unchanged.
//!
//! ## Quick Start
//!
//! ```no_run
//! use loraprs::{Gateway, GatewayConfig};
//! use loraprs_core::{OperatingMode, StaticUplink};
//! use loraprs_transport::{SerialTransport, TcpConnector, UdpRadio};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::builder()
//!         .mode(OperatingMode::Fixed)
//!         .callsign("N0CALL-10")
//!         .passcode("12345")
//!         .build()?;
//!
//!     let peer = "127.0.0.1:7000".parse()?;
//!     let radio = UdpRadio::bind("127.0.0.1:7001", peer, config.radio().clone()).await?;
//!     let connector = TcpConnector::new(&config.relay().host, config.relay().port);
//!     let terminal = SerialTransport::open("/dev/rfcomm0", 115_200).await?;
//!
//!     let mut gateway = Gateway::new(
//!         config,
//!         Box::new(radio),
//!         Box::new(StaticUplink::up()),
//!         Box::new(connector),
//!     )
//!     .with_terminal(Box::new(terminal));
//!
//!     gateway.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                             |
//! |------------------------|-----------------------------------------------------|
//! | `loraprs-core`         | Collaborator traits, shared types, errors           |
//! | `loraprs-ax25`         | Callsign and AX.25 UI frame codec, TNC2 text        |
//! | `loraprs-kiss`         | KISS decoder state machine and encoder              |
//! | `loraprs-transport`    | Serial terminal, TCP relay, UDP radio bridge        |
//! | `loraprs-test-harness` | Mocks for every collaborator                        |
//! | **`loraprs`**          | This crate -- configuration, relay manager, gateway |

pub mod config;
pub mod gateway;
pub mod relay;
pub mod retry;
pub mod signal;

pub use config::{
    FeatureFlags, GatewayConfig, GatewayConfigBuilder, LoginLine, RelayConfig, CLIENT_NAME,
};
pub use gateway::{Gateway, GatewayStats, POLL_INTERVAL};
pub use relay::{RelayManager, RelayState};
pub use retry::RetryPolicy;
pub use signal::{FrequencyCorrector, SignalReport};
