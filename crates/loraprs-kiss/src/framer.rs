//! KISS frame decoder and encoder.
//!
//! # Frame format
//!
//! ```text
//! FEND <cmd> <payload...> FEND
//! ```
//!
//! Inside the payload a literal `FEND` is sent as `FESC TFEND` and a literal
//! `FESC` as `FESC TFESC`. Every other byte passes through unchanged.
//!
//! The decoder is an explicit state object: whoever owns the terminal stream
//! owns one [`KissDecoder`] and feeds it bytes as they arrive. Completed and
//! aborted frames both leave it back in [`KissState::Idle`], so no state
//! leaks from one frame into the next.

use bytes::{BufMut, BytesMut};
use tracing::trace;

/// Frame delimiter.
pub const FEND: u8 = 0xc0;

/// Escape marker.
pub const FESC: u8 = 0xdb;

/// Transposed frame delimiter (follows `FESC`).
pub const TFEND: u8 = 0xdc;

/// Transposed escape (follows `FESC`).
pub const TFESC: u8 = 0xdd;

/// Default cap on a de-escaped payload. Anything longer is discarded as
/// line noise.
pub const MAX_FRAME_LEN: usize = 512;

/// KISS command codes this gateway recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Data frame for the radio (port 0).
    Data,
}

impl Command {
    /// The wire byte for this command.
    pub fn code(self) -> u8 {
        match self {
            Command::Data => 0x00,
        }
    }

    /// Look up a command by wire byte.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Command::Data),
            _ => None,
        }
    }
}

/// A complete KISS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissFrame {
    /// The frame's command.
    pub command: Command,
    /// De-escaped payload bytes.
    pub payload: Vec<u8>,
}

/// Decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KissState {
    /// Between frames, waiting for `FEND`.
    #[default]
    Idle,
    /// Saw `FEND`, waiting for the command byte.
    AwaitingCommand,
    /// Accumulating payload bytes.
    ReceivingData,
    /// Saw `FESC` inside the payload.
    Escaped,
}

/// Incremental KISS decoder.
#[derive(Debug)]
pub struct KissDecoder {
    state: KissState,
    command: Option<Command>,
    payload: BytesMut,
    max_len: usize,
}

impl Default for KissDecoder {
    fn default() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }
}

impl KissDecoder {
    /// Create a decoder in the [`KissState::Idle`] state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder that discards frames whose payload grows past
    /// `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            state: KissState::Idle,
            command: None,
            payload: BytesMut::new(),
            max_len,
        }
    }

    /// Longest payload this decoder accepts.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Current state.
    pub fn state(&self) -> KissState {
        self.state
    }

    /// Number of payload bytes accumulated for the in-progress frame.
    pub fn pending_len(&self) -> usize {
        self.payload.len()
    }

    /// Discard any partial frame and return to [`KissState::Idle`].
    pub fn reset(&mut self) {
        self.state = KissState::Idle;
        self.command = None;
        self.payload.clear();
    }

    /// Feed one byte; returns a frame when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<KissFrame> {
        match self.state {
            KissState::Idle => {
                if byte == FEND {
                    self.state = KissState::AwaitingCommand;
                }
            }
            KissState::AwaitingCommand => {
                if byte == FEND {
                    // Back-to-back delimiters are legal padding.
                } else if let Some(cmd) = Command::from_code(byte) {
                    self.command = Some(cmd);
                    self.state = KissState::ReceivingData;
                } else {
                    trace!(cmd = byte, "Dropping KISS frame with unrecognized command");
                    self.reset();
                }
            }
            KissState::ReceivingData => match byte {
                FESC => self.state = KissState::Escaped,
                FEND => return self.finish(),
                _ => self.append(byte),
            },
            KissState::Escaped => match byte {
                TFEND => {
                    self.state = KissState::ReceivingData;
                    self.append(FEND);
                }
                TFESC => {
                    self.state = KissState::ReceivingData;
                    self.append(FESC);
                }
                _ => {
                    trace!(
                        byte,
                        discarded = self.payload.len(),
                        "Invalid KISS escape sequence, discarding frame"
                    );
                    self.reset();
                }
            },
        }
        None
    }

    /// Feed a chunk of bytes, returning every frame it completes.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<KissFrame> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Add a payload byte, or drop the whole frame once it is over the cap.
    fn append(&mut self, byte: u8) {
        if self.payload.len() >= self.max_len {
            trace!(max = self.max_len, "KISS frame too long, discarding");
            self.reset();
        } else {
            self.payload.put_u8(byte);
        }
    }

    fn finish(&mut self) -> Option<KissFrame> {
        let command = self.command.take();
        let payload = self.payload.split().to_vec();
        self.reset();
        command.map(|command| KissFrame { command, payload })
    }
}

/// Encode `payload` as one complete KISS frame.
///
/// # Example
///
/// ```
/// use loraprs_kiss::{Command, encode_frame};
///
/// let wire = encode_frame(Command::Data, &[0x41, 0xC0, 0x42]);
/// assert_eq!(wire, vec![0xC0, 0x00, 0x41, 0xDB, 0xDC, 0x42, 0xC0]);
/// ```
pub fn encode_frame(command: Command, payload: &[u8]) -> Vec<u8> {
    let escapes = payload.iter().filter(|&&b| b == FEND || b == FESC).count();
    let mut buf = BytesMut::with_capacity(payload.len() + escapes + 3);
    buf.put_u8(FEND);
    buf.put_u8(command.code());
    for &b in payload {
        match b {
            FEND => buf.put_slice(&[FESC, TFEND]),
            FESC => buf.put_slice(&[FESC, TFESC]),
            _ => buf.put_u8(b),
        }
    }
    buf.put_u8(FEND);
    buf.to_vec()
}
