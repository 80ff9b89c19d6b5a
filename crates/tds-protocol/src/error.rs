//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while parsing or validating TDS wire structures.
///
/// These errors describe malformed framing at the byte level, below the
/// level of any particular SQL dialect or token stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The type byte did not match any recognized TDS packet type.
    #[error("unrecognized packet type byte: 0x{0:02x}")]
    InvalidPacketType(u8),

    /// Fewer bytes were available than the header requires.
    #[error("incomplete packet header: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes required to decode the structure.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The declared packet length fell outside the permitted range.
    #[error("packet length {length} out of range (must be between {min} and {max})")]
    LengthOutOfRange {
        /// The length field read from the header.
        length: u16,
        /// Minimum permitted length (header size).
        min: u16,
        /// Maximum permitted length (negotiated packet size).
        max: usize,
    },
}

impl ProtocolError {
    /// Whether this error reflects framing corruption severe enough that
    /// the connection carrying it must be closed rather than retried.
    #[must_use]
    pub fn is_fatal_framing(&self) -> bool {
        matches!(self, Self::InvalidPacketType(_) | Self::LengthOutOfRange { .. })
    }
}
