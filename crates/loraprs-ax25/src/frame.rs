//! AX.25 UI frame codec.
//!
//! Converts between the binary AX.25 unconnected-information frames carried
//! over LoRa and the APRS "TNC2 monitor" text form used on APRS-IS.
//!
//! # Frame format
//!
//! ```text
//! | DST (7) | SRC (7) | RPT (0-7 x 7) | CTRL 0x03 | PID 0xF0 | INFO (N) |
//! ```
//!
//! # Text format
//!
//! ```text
//! SRC>DST[,RPT1[*],RPT2[*]...]:INFO[ comment]
//! ```
//!
//! A trailing `*` marks a repeater whose has-been-repeated bit is set.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use loraprs_core::FrameError;

use crate::callsign::{self, ADDRESS_LEN, Callsign, REPEATED_BIT};

/// Control byte of an unconnected-information (UI) frame.
pub const CONTROL_UI: u8 = 0x03;

/// Protocol identifier for "no layer 3" (APRS).
pub const PID_NO_LAYER3: u8 = 0xf0;

/// Maximum digipeater path length.
pub const MAX_REPEATERS: usize = 7;

/// Smallest buffer that can start a frame: two addresses plus control.
pub const MIN_FRAME_LEN: usize = 2 * ADDRESS_LEN + 1;

/// One hop of the digipeater path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeater {
    /// The repeater's callsign (or alias such as `WIDE1-1`).
    pub callsign: Callsign,
    /// Whether this hop has already relayed the frame.
    pub repeated: bool,
}

impl Repeater {
    /// A repeater hop that has not yet relayed the frame.
    pub fn new(callsign: Callsign) -> Self {
        Self {
            callsign,
            repeated: false,
        }
    }
}

impl fmt::Display for Repeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.callsign)?;
        if self.repeated {
            write!(f, "*")?;
        }
        Ok(())
    }
}

impl FromStr for Repeater {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (text, repeated) = match s.strip_suffix('*') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        Ok(Self {
            callsign: text.parse()?,
            repeated,
        })
    }
}

/// A decoded AX.25 UI frame carrying APRS text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    /// Destination address (APRS uses it as a software/tocall identifier).
    pub destination: Callsign,
    /// Originating station.
    pub source: Callsign,
    /// Digipeater path, at most [`MAX_REPEATERS`] hops.
    pub path: Vec<Repeater>,
    /// Information field.
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Create a frame without a digipeater path.
    pub fn new(source: Callsign, destination: Callsign, info: impl Into<Vec<u8>>) -> Self {
        Self {
            destination,
            source,
            path: Vec::new(),
            info: info.into(),
        }
    }

    /// Decode a binary UI frame.
    ///
    /// # Example
    ///
    /// ```
    /// use loraprs_ax25::Ax25Frame;
    ///
    /// let mut raw = vec![0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60];
    /// raw.extend_from_slice(&[0x9C, 0x60, 0x86, 0x82, 0x98, 0x98, 0x61]);
    /// raw.extend_from_slice(&[0x03, 0xF0]);
    /// raw.extend_from_slice(b">hello");
    ///
    /// let frame = Ax25Frame::decode(&raw).unwrap();
    /// assert_eq!(frame.to_text(""), "N0CALL>APRS:>hello");
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < MIN_FRAME_LEN {
            return Err(FrameError::TruncatedFrame { len: buf.len() });
        }

        let destination = Callsign::decode(address_at(buf, 0)?)?;
        let source_field = address_at(buf, ADDRESS_LEN)?;
        let source = Callsign::decode(source_field)?;

        let mut pos = 2 * ADDRESS_LEN;
        let mut path = Vec::new();

        if !callsign::is_final(source_field) {
            let mut terminated = false;
            while path.len() < MAX_REPEATERS {
                let field = address_at(buf, pos)?;
                path.push(Repeater {
                    callsign: Callsign::decode(field)?,
                    repeated: callsign::is_repeated(field),
                });
                pos += ADDRESS_LEN;
                if callsign::is_final(field) {
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                return Err(FrameError::TooManyRepeaters);
            }
        }

        let control = *buf
            .get(pos)
            .ok_or(FrameError::TruncatedFrame { len: buf.len() })?;
        let pid = buf.get(pos + 1).copied().unwrap_or(0);
        if control != CONTROL_UI || pid != PID_NO_LAYER3 {
            return Err(FrameError::UnsupportedFrameType { control, pid });
        }

        Ok(Self {
            destination,
            source,
            path,
            info: buf[pos + 2..].to_vec(),
        })
    }

    /// Render as a TNC2 monitor line, appending `comment` after a space
    /// when it is non-empty.
    ///
    /// The information field is copied byte for byte; APRS-IS carries it
    /// as-is, whatever its encoding.
    pub fn to_text_bytes(&self, comment: &str) -> Vec<u8> {
        let mut line = format!("{}>{}", self.source, self.destination).into_bytes();
        for rpt in &self.path {
            line.push(b',');
            line.extend_from_slice(rpt.to_string().as_bytes());
        }
        line.push(b':');
        line.extend_from_slice(&self.info);
        if !comment.is_empty() {
            line.push(b' ');
            line.extend_from_slice(comment.as_bytes());
        }
        line
    }

    /// [`to_text_bytes`](Self::to_text_bytes) for display; information
    /// bytes that are not UTF-8 show as U+FFFD.
    pub fn to_text(&self, comment: &str) -> String {
        String::from_utf8_lossy(&self.to_text_bytes(comment)).into_owned()
    }

    /// Parse a TNC2 monitor line.
    ///
    /// A trailing line terminator on the information field is dropped.
    pub fn parse_text(text: &str) -> Result<Self, FrameError> {
        Self::parse_text_bytes(text.as_bytes())
    }

    /// Parse a TNC2 monitor line whose information field may hold any bytes.
    ///
    /// The address header must be ASCII. A trailing line terminator on the
    /// information field is dropped.
    pub fn parse_text_bytes(line: &[u8]) -> Result<Self, FrameError> {
        let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
            FrameError::InvalidAddressSyntax(String::from_utf8_lossy(line).into_owned())
        })?;
        let header = std::str::from_utf8(&line[..colon]).map_err(|_| {
            FrameError::InvalidAddressSyntax(String::from_utf8_lossy(&line[..colon]).into_owned())
        })?;
        let (source, rest) = header
            .split_once('>')
            .ok_or_else(|| FrameError::InvalidAddressSyntax(header.to_string()))?;

        let mut addrs = rest.split(',');
        let destination = match addrs.next() {
            Some(dst) if !dst.is_empty() => dst.parse::<Callsign>()?,
            _ => return Err(FrameError::InvalidAddressSyntax(header.to_string())),
        };
        let source = source.parse::<Callsign>()?;

        let path = addrs
            .map(str::parse::<Repeater>)
            .collect::<Result<Vec<_>, _>>()?;
        if path.len() > MAX_REPEATERS {
            return Err(FrameError::TooManyRepeaters);
        }

        let mut info = &line[colon + 1..];
        while let [rest @ .., b'\r' | b'\n'] = info {
            info = rest;
        }

        Ok(Self {
            destination,
            source,
            path,
            info: info.to_vec(),
        })
    }

    /// Number of bytes [`encode_into`](Self::encode_into) writes.
    pub fn encoded_len(&self) -> usize {
        (2 + self.path.len()) * ADDRESS_LEN + 2 + self.info.len()
    }

    /// Encode into a caller-supplied buffer, returning the bytes written.
    ///
    /// Either the whole frame is written or nothing is: an undersized
    /// buffer is rejected with [`FrameError::BufferTooSmall`] before any
    /// byte is touched.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        if self.path.len() > MAX_REPEATERS {
            return Err(FrameError::TooManyRepeaters);
        }
        let needed = self.encoded_len();
        if out.len() < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                available: out.len(),
            });
        }

        let mut cursor = &mut out[..needed];
        self.put_frame(&mut cursor);
        Ok(needed)
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        if self.path.len() > MAX_REPEATERS {
            return Err(FrameError::TooManyRepeaters);
        }
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.put_frame(&mut buf);
        Ok(buf.to_vec())
    }

    /// Write the frame; the final-address bit goes on the last address only.
    fn put_frame<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.destination.encode(false));
        buf.put_slice(&self.source.encode(self.path.is_empty()));
        let last = self.path.len().saturating_sub(1);
        for (i, rpt) in self.path.iter().enumerate() {
            let mut field = rpt.callsign.encode(i == last);
            if rpt.repeated {
                field[6] |= REPEATED_BIT;
            }
            buf.put_slice(&field);
        }
        buf.put_u8(CONTROL_UI);
        buf.put_u8(PID_NO_LAYER3);
        buf.put_slice(&self.info);
    }
}

/// Borrow the 7-byte address field starting at `pos`.
fn address_at(buf: &[u8], pos: usize) -> Result<&[u8; ADDRESS_LEN], FrameError> {
    buf.get(pos..pos + ADDRESS_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or(FrameError::TruncatedFrame { len: buf.len() })
}

impl fmt::Display for Ax25Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(""))
    }
}

impl FromStr for Ax25Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ax25Frame::parse_text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DST_APRS: [u8; 7] = [0x82, 0xA0, 0xA4, 0xA6, 0x40, 0x40, 0x60];
    const SRC_N0CALL_LAST: [u8; 7] = [0x9C, 0x60, 0x86, 0x82, 0x98, 0x98, 0x61];
    const SRC_N0CALL: [u8; 7] = [0x9C, 0x60, 0x86, 0x82, 0x98, 0x98, 0x60];

    fn raw_frame(addrs: &[[u8; 7]], info: &[u8]) -> Vec<u8> {
        let mut raw: Vec<u8> = addrs.iter().flatten().copied().collect();
        raw.extend_from_slice(&[CONTROL_UI, PID_NO_LAYER3]);
        raw.extend_from_slice(info);
        raw
    }

    fn wide(n: u8, last: bool) -> [u8; 7] {
        Callsign::new("WIDE1", n).unwrap().encode(last)
    }

    /// Indices of address fields whose final bit is set.
    fn final_bits(raw: &[u8], count: usize) -> Vec<usize> {
        (0..count)
            .filter(|i| raw[i * ADDRESS_LEN + 6] & 0x01 != 0)
            .collect()
    }

    #[test]
    fn decode_minimal_frame() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b"!4903.50N/07201.75W-");
        let frame = Ax25Frame::decode(&raw).unwrap();
        assert_eq!(frame.source.to_string(), "N0CALL");
        assert_eq!(frame.destination.to_string(), "APRS");
        assert!(frame.path.is_empty());
        assert_eq!(frame.to_text(""), "N0CALL>APRS:!4903.50N/07201.75W-");
    }

    #[test]
    fn decode_with_path() {
        let mut digi = Callsign::new("DIGI", 0).unwrap().encode(false);
        digi[6] |= REPEATED_BIT;
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL, digi, wide(1, true)], b">test");
        let frame = Ax25Frame::decode(&raw).unwrap();
        assert_eq!(frame.path.len(), 2);
        assert!(frame.path[0].repeated);
        assert!(!frame.path[1].repeated);
        assert_eq!(frame.to_text(""), "N0CALL>APRS,DIGI*,WIDE1-1:>test");
    }

    #[test]
    fn decode_appends_comment_after_space() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b">hi");
        let frame = Ax25Frame::decode(&raw).unwrap();
        assert_eq!(
            frame.to_text("rssi: -80.00dBm"),
            "N0CALL>APRS:>hi rssi: -80.00dBm"
        );
    }

    #[test]
    fn decode_empty_info() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b"");
        let frame = Ax25Frame::decode(&raw).unwrap();
        assert!(frame.info.is_empty());
        assert_eq!(frame.to_text(""), "N0CALL>APRS:");
    }

    #[test]
    fn decode_truncated() {
        assert_eq!(
            Ax25Frame::decode(&[0x82; 14]),
            Err(FrameError::TruncatedFrame { len: 14 })
        );
        assert_eq!(
            Ax25Frame::decode(&[]),
            Err(FrameError::TruncatedFrame { len: 0 })
        );
    }

    #[test]
    fn decode_truncated_inside_path() {
        let mut raw: Vec<u8> = [DST_APRS, SRC_N0CALL].iter().flatten().copied().collect();
        raw.extend_from_slice(&wide(1, true)[..3]);
        assert!(matches!(
            Ax25Frame::decode(&raw),
            Err(FrameError::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn decode_seven_repeaters_is_allowed() {
        let mut addrs = vec![DST_APRS, SRC_N0CALL];
        for i in 0..7 {
            addrs.push(wide(i as u8 + 1, i == 6));
        }
        let frame = Ax25Frame::decode(&raw_frame(&addrs, b"x")).unwrap();
        assert_eq!(frame.path.len(), 7);
    }

    #[test]
    fn decode_without_final_bit_within_seven_repeaters() {
        let mut addrs = vec![DST_APRS, SRC_N0CALL];
        for i in 0..8 {
            addrs.push(wide(i as u8 + 1, false));
        }
        assert_eq!(
            Ax25Frame::decode(&raw_frame(&addrs, b"x")),
            Err(FrameError::TooManyRepeaters)
        );
    }

    #[test]
    fn decode_rejects_non_ui_control() {
        let mut raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b"x");
        raw[14] = 0x3f;
        assert_eq!(
            Ax25Frame::decode(&raw),
            Err(FrameError::UnsupportedFrameType {
                control: 0x3f,
                pid: PID_NO_LAYER3
            })
        );
    }

    #[test]
    fn decode_rejects_other_pid() {
        let mut raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b"x");
        raw[15] = 0xcc;
        assert!(matches!(
            Ax25Frame::decode(&raw),
            Err(FrameError::UnsupportedFrameType { pid: 0xcc, .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_pid() {
        let raw: Vec<u8> = [DST_APRS, SRC_N0CALL_LAST]
            .iter()
            .flatten()
            .copied()
            .chain([CONTROL_UI])
            .collect();
        assert_eq!(
            Ax25Frame::decode(&raw),
            Err(FrameError::UnsupportedFrameType {
                control: CONTROL_UI,
                pid: 0
            })
        );
    }

    #[test]
    fn decode_info_may_contain_framing_bytes() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], &[b'>', 0xC0, 0xDB]);
        let frame = Ax25Frame::decode(&raw).unwrap();
        assert_eq!(frame.info, vec![b'>', 0xC0, 0xDB]);
    }

    #[test]
    fn parse_text_basic() {
        let frame: Ax25Frame = "N0CALL-7>APRS,WIDE1-1,WIDE2-1:>status: ok".parse().unwrap();
        assert_eq!(frame.source.to_string(), "N0CALL-7");
        assert_eq!(frame.destination.to_string(), "APRS");
        assert_eq!(frame.path.len(), 2);
        assert_eq!(frame.info, b">status: ok");
    }

    #[test]
    fn parse_text_strips_line_terminator() {
        let frame = Ax25Frame::parse_text("N0CALL>APRS:>hi\r\n").unwrap();
        assert_eq!(frame.info, b">hi");
    }

    #[test]
    fn parse_text_requires_two_addresses() {
        for bad in ["N0CALL:>hi", ">APRS:>hi", "N0CALL>:>hi", "N0CALL>APRS"] {
            assert!(
                matches!(
                    Ax25Frame::parse_text(bad),
                    Err(FrameError::InvalidAddressSyntax(_))
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parse_text_too_many_repeaters() {
        let text = "N0CALL>APRS,A1,A2,A3,A4,A5,A6,A7,A8:x";
        assert_eq!(
            Ax25Frame::parse_text(text),
            Err(FrameError::TooManyRepeaters)
        );
    }

    #[test]
    fn parse_text_callsign_too_long() {
        assert!(matches!(
            Ax25Frame::parse_text("N0CALLXY>APRS:x"),
            Err(FrameError::CallsignTooLong(_))
        ));
    }

    #[test]
    fn encode_known_bytes() {
        let frame = Ax25Frame::parse_text("N0CALL>APRS:>hello").unwrap();
        assert_eq!(
            frame.to_bytes().unwrap(),
            raw_frame(&[DST_APRS, SRC_N0CALL_LAST], b">hello")
        );
    }

    #[test]
    fn encode_marks_only_last_address_final() {
        for path in ["", ",WIDE1-1", ",WIDE1-1,WIDE2-2", ",A,B,C,D,E,F,G"] {
            let frame = Ax25Frame::parse_text(&format!("N0CALL>APRS{path}:x")).unwrap();
            let raw = frame.to_bytes().unwrap();
            let count = 2 + frame.path.len();
            assert_eq!(final_bits(&raw, count), vec![count - 1], "path {path:?}");
        }
    }

    #[test]
    fn encode_sets_repeated_bit() {
        let frame = Ax25Frame::parse_text("N0CALL>APRS,DIGI*,WIDE2-1:x").unwrap();
        let raw = frame.to_bytes().unwrap();
        assert_ne!(raw[2 * ADDRESS_LEN + 6] & REPEATED_BIT, 0);
        assert_eq!(raw[3 * ADDRESS_LEN + 6] & REPEATED_BIT, 0);
    }

    #[test]
    fn encode_into_exact_buffer() {
        let frame = Ax25Frame::parse_text("N0CALL>APRS:>hi").unwrap();
        let mut buf = [0u8; 19];
        assert_eq!(frame.encode_into(&mut buf), Ok(19));
        assert_eq!(buf.to_vec(), frame.to_bytes().unwrap());
    }

    #[test]
    fn encode_into_small_buffer_writes_nothing() {
        let frame = Ax25Frame::parse_text("N0CALL>APRS,WIDE1-1:>hello").unwrap();
        let mut buf = [0xAAu8; 20];
        assert_eq!(
            frame.encode_into(&mut buf),
            Err(FrameError::BufferTooSmall {
                needed: 29,
                available: 20
            })
        );
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn encode_rejects_oversized_path() {
        let mut frame = Ax25Frame::parse_text("N0CALL>APRS:x").unwrap();
        for i in 0..8 {
            frame
                .path
                .push(Repeater::new(Callsign::new("WIDE", i).unwrap()));
        }
        assert_eq!(frame.to_bytes(), Err(FrameError::TooManyRepeaters));
        let mut buf = [0u8; 256];
        assert_eq!(
            frame.encode_into(&mut buf),
            Err(FrameError::TooManyRepeaters)
        );
    }

    #[test]
    fn text_round_trip() {
        for text in [
            "N0CALL>APRS:>hello",
            "N0CALL-7>APLT00,WIDE1-1:!4903.50N/07201.75W-",
            "K9X-15>APRS,DIGI1*,DIGI2*,WIDE2-1:=test: with colon",
            "A>B,C1,C2,C3,C4,C5,C6,C7:",
        ] {
            let raw = Ax25Frame::parse_text(text).unwrap().to_bytes().unwrap();
            assert_eq!(Ax25Frame::decode(&raw).unwrap().to_text(""), text);
        }
    }

    #[test]
    fn non_utf8_info_survives_text_form() {
        // 0xB0 is the Latin-1 degree sign many trackers put in comments.
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], &[b'>', 0xB0, b'C']);
        let frame = Ax25Frame::decode(&raw).unwrap();

        let line = frame.to_text_bytes("");
        assert_eq!(line, b"N0CALL>APRS:>\xB0C".to_vec());

        let back = Ax25Frame::parse_text_bytes(&line).unwrap();
        assert_eq!(back.info, vec![b'>', 0xB0, b'C']);
        assert_eq!(back.to_bytes().unwrap(), raw);
    }

    #[test]
    fn to_text_bytes_appends_comment_after_raw_info() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL_LAST], &[0xFF, 0xFE]);
        let frame = Ax25Frame::decode(&raw).unwrap();
        let mut expected = b"N0CALL>APRS:".to_vec();
        expected.extend_from_slice(&[0xFF, 0xFE]);
        expected.extend_from_slice(b" rssi: -80.00dBm");
        assert_eq!(frame.to_text_bytes("rssi: -80.00dBm"), expected);
        assert_eq!(frame.to_text(""), "N0CALL>APRS:\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn parse_text_bytes_strips_line_terminator() {
        let frame = Ax25Frame::parse_text_bytes(b"N0CALL>APRS:>\xB0\r\n").unwrap();
        assert_eq!(frame.info, vec![b'>', 0xB0]);
    }

    #[test]
    fn parse_text_bytes_rejects_non_ascii_header() {
        assert!(matches!(
            Ax25Frame::parse_text_bytes(b"N0\xB0CALL>APRS:>x"),
            Err(FrameError::InvalidAddressSyntax(_))
        ));
        assert!(matches!(
            Ax25Frame::parse_text_bytes(b"N0CALL>APRS"),
            Err(FrameError::InvalidAddressSyntax(_))
        ));
    }

    #[test]
    fn binary_round_trip() {
        let raw = raw_frame(&[DST_APRS, SRC_N0CALL, wide(1, true)], b">x");
        let text = Ax25Frame::decode(&raw).unwrap().to_string();
        assert_eq!(Ax25Frame::parse_text(&text).unwrap().to_bytes().unwrap(), raw);
    }
}
