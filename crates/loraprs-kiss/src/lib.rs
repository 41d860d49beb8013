//! loraprs-kiss: KISS TNC framing for the gateway's local terminal link.
//!
//! The terminal (an APRS client app over Bluetooth SPP or a serial cable)
//! sends `FEND`-delimited, escaped frames; [`KissDecoder`] extracts their
//! payloads byte by byte and [`encode_frame`] produces the mirror-image
//! stream for packets heard on the radio.

pub mod framer;

pub use framer::{
    Command, FEND, FESC, KissDecoder, KissFrame, KissState, MAX_FRAME_LEN, TFEND, TFESC,
    encode_frame,
};
