//! loraprs-ax25: AX.25 UI frame codec for the LoRa APRS gateway.
//!
//! Two layers:
//!
//! - [`callsign`] -- the 7-byte shifted-ASCII address field
//! - [`frame`] -- whole unconnected-information frames and their APRS
//!   "TNC2 monitor" text rendering (`SRC>DST,PATH:INFO`)
//!
//! Only UI frames with the "no layer 3" protocol id are supported; anything
//! else is rejected with [`FrameError::UnsupportedFrameType`] so callers can
//! drop it.

pub mod callsign;
pub mod frame;

pub use callsign::Callsign;
pub use frame::{Ax25Frame, CONTROL_UI, MAX_REPEATERS, PID_NO_LAYER3, Repeater};
pub use loraprs_core::FrameError;
