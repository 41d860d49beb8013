//! loraprs-core: Core traits, types, and error definitions for loraprs.
//!
//! This crate defines the collaborator abstractions the gateway is written
//! against. The codecs, transports, and the gateway orchestrator depend on
//! these types; none of them depend on each other's concrete types.
//!
//! # Key types
//!
//! - [`RadioEndpoint`] -- packet-oriented LoRa radio
//! - [`Transport`] -- byte-level stream (KISS terminal, APRS-IS session)
//! - [`Connector`] -- opens fresh transports on demand
//! - [`Uplink`] -- the IP uplink the relay network is reached through
//! - [`Error`] / [`FrameError`] / [`Result`] -- error handling

pub mod error;
pub mod helpers;
pub mod radio;
pub mod transport;
pub mod types;
pub mod uplink;

// Re-export key types at crate root for ergonomic `use loraprs_core::*`.
pub use error::{Error, FrameError, Result};
pub use helpers::{format_freq_mhz, format_hex, parse_hex};
pub use radio::RadioEndpoint;
pub use transport::{Connector, Transport};
pub use types::*;
pub use uplink::{StaticUplink, Uplink};
