//! Error types for loraprs.
//!
//! All fallible gateway operations return [`Result<T>`], which uses [`Error`]
//! as the error type. Frame-level decode/encode failures have their own
//! [`FrameError`] so the codecs can be used without pulling in transport
//! concerns; they convert into [`Error::Frame`] where the two meet.

/// A malformed or oversized AX.25 frame, callsign, or TNC2 text line.
///
/// These are always recovered locally by dropping the offending frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A 7-byte address field did not decode to an alphanumeric callsign.
    #[error("malformed callsign in address field")]
    MalformedCallsign,

    /// A base callsign longer than six characters.
    #[error("callsign too long: {0}")]
    CallsignTooLong(String),

    /// Fewer bytes than the minimum frame (two addresses + control).
    #[error("truncated frame: {len} bytes")]
    TruncatedFrame {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// More than seven repeaters, or no final-address bit within seven.
    #[error("too many repeaters in digipeater path")]
    TooManyRepeaters,

    /// Anything other than a UI frame with the "no layer 3" protocol id.
    #[error("unsupported frame type: control {control:#04x}, pid {pid:#04x}")]
    UnsupportedFrameType {
        /// Control byte found after the address block.
        control: u8,
        /// Protocol identifier byte (0 when missing).
        pid: u8,
    },

    /// A TNC2 text line that does not follow `SRC>DST[,PATH]:INFO`.
    #[error("invalid address syntax: {0}")]
    InvalidAddressSyntax(String),

    /// The caller-supplied output buffer cannot hold the encoded frame.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes the full frame requires.
        needed: usize,
        /// Bytes the caller provided.
        available: usize,
    },
}

/// The error type for all loraprs operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, TCP socket, UDP radio bridge).
    #[error("transport error: {0}")]
    Transport(String),

    /// A collaborator sent bytes that break its wire format, such as a
    /// malformed modem datagram.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for data.
    ///
    /// On the non-blocking poll paths this simply means "nothing pending".
    #[error("timeout waiting for data")]
    Timeout,

    /// An invalid configuration value or argument.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An AX.25 frame could not be decoded or encoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The relay network connection could not be opened or logged in.
    #[error("relay connect failed: {0}")]
    RelayConnectFailed(String),

    /// The wireless uplink is down.
    #[error("uplink down")]
    UplinkDown,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
