//! Callsign codec.
//!
//! An AX.25 address field is seven bytes:
//!
//! ```text
//! | c0<<1 | c1<<1 | c2<<1 | c3<<1 | c4<<1 | c5<<1 | H R R S S S S E |
//! ```
//!
//! - `c0..c5`: base callsign, ASCII shifted left one bit, space padded
//! - `H`: has-been-repeated (repeaters) / command-response bit
//! - `R R`: reserved, transmitted as `1 1`
//! - `S S S S`: SSID 0-15
//! - `E`: address-extension bit, set only on the final address of the block

use std::fmt;
use std::str::FromStr;

use loraprs_core::FrameError;

/// Maximum base callsign length.
pub const CALLSIGN_LEN: usize = 6;

/// Size of one encoded address field.
pub const ADDRESS_LEN: usize = 7;

/// Highest valid SSID.
pub const MAX_SSID: u8 = 15;

/// Address-extension bit: this is the last address in the header.
pub const FINAL_ADDRESS_BIT: u8 = 0x01;

/// Has-been-repeated bit on a digipeater address.
pub const REPEATED_BIT: u8 = 0x80;

/// Reserved bits, always transmitted set.
const RESERVED_BITS: u8 = 0x60;

/// An amateur-radio callsign with its station identifier (SSID).
///
/// The base call is stored upper-case without padding. An SSID of 0 is
/// omitted from the text form (`N0CALL` vs `N0CALL-7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Callsign {
    call: String,
    ssid: u8,
}

impl Callsign {
    /// Create a callsign, validating the base call and SSID.
    ///
    /// The base call must be 1-6 ASCII alphanumerics; it is normalized to
    /// upper case.
    pub fn new(call: &str, ssid: u8) -> Result<Self, FrameError> {
        if call.is_empty() || !call.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FrameError::InvalidAddressSyntax(call.to_string()));
        }
        if call.len() > CALLSIGN_LEN {
            return Err(FrameError::CallsignTooLong(call.to_string()));
        }
        if ssid > MAX_SSID {
            return Err(FrameError::InvalidAddressSyntax(format!("{call}-{ssid}")));
        }
        Ok(Self {
            call: call.to_ascii_uppercase(),
            ssid,
        })
    }

    /// The base callsign without SSID.
    pub fn call(&self) -> &str {
        &self.call
    }

    /// The station identifier (0-15).
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Decode a 7-byte address field.
    ///
    /// The base call must be alphanumeric, padded on the right with spaces.
    /// Flag bits in the last byte are ignored here; use [`is_final`] and
    /// [`is_repeated`] to read them.
    pub fn decode(field: &[u8; ADDRESS_LEN]) -> Result<Self, FrameError> {
        let mut call = String::with_capacity(CALLSIGN_LEN);
        for &b in &field[..CALLSIGN_LEN] {
            call.push(char::from(b >> 1));
        }

        let trimmed = call.trim_end_matches(' ');
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FrameError::MalformedCallsign);
        }

        Ok(Self {
            call: trimmed.to_string(),
            ssid: (field[6] >> 1) & 0x0f,
        })
    }

    /// Encode into a 7-byte address field.
    ///
    /// `is_last` sets the address-extension bit that terminates the header.
    pub fn encode(&self, is_last: bool) -> [u8; ADDRESS_LEN] {
        let mut field = [b' ' << 1; ADDRESS_LEN];
        for (slot, b) in field.iter_mut().zip(self.call.bytes()) {
            *slot = b << 1;
        }
        field[6] = RESERVED_BITS | ((self.ssid & 0x0f) << 1);
        if is_last {
            field[6] |= FINAL_ADDRESS_BIT;
        }
        field
    }
}

/// Whether an address field carries the address-extension (final) bit.
pub fn is_final(field: &[u8; ADDRESS_LEN]) -> bool {
    field[6] & FINAL_ADDRESS_BIT != 0
}

/// Whether an address field carries the has-been-repeated bit.
pub fn is_repeated(field: &[u8; ADDRESS_LEN]) -> bool {
    field[6] & REPEATED_BIT != 0
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call)
        } else {
            write!(f, "{}-{}", self.call, self.ssid)
        }
    }
}

impl FromStr for Callsign {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((call, ssid)) => {
                let ssid: u8 = ssid
                    .parse()
                    .map_err(|_| FrameError::InvalidAddressSyntax(s.to_string()))?;
                Callsign::new(call, ssid)
            }
            None => Callsign::new(s, 0),
        }
    }
}
