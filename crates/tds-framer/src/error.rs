//! Framer error types.

use thiserror::Error;

/// Errors raised by [`crate::framer::StreamFramer`] and [`crate::packet::Packet`].
#[derive(Debug, Error)]
pub enum FramerError {
    /// The packet's type byte is not in the recognized set.
    ///
    /// This is fatal framing: the connection carrying it must be closed,
    /// since bytes no longer reliably align to packet boundaries once a
    /// header fails to validate.
    #[error("invalid framing: unrecognized packet type byte 0x{0:02x}")]
    UnknownType(u8),

    /// The packet's declared length is outside `8..=max_packet_size`.
    #[error("invalid framing: packet length {length} out of range (max {max})")]
    LengthOutOfRange {
        /// The length field read from the header.
        length: u16,
        /// The negotiated maximum packet size.
        max: usize,
    },

    /// The transport closed with a message accumulator still non-empty.
    #[error("connection closed with a truncated message still in progress")]
    TruncatedAtClose,

    /// An outbound payload could not fit into any single packet even
    /// before splitting — only returned by callers that bypass
    /// `encode_message`'s chunking, e.g. direct use of `Packet::from_message`.
    #[error("payload of {size} bytes exceeds the maximum of {max} bytes per packet")]
    PayloadTooLarge {
        /// The size of the payload that did not fit.
        size: usize,
        /// The maximum payload size per packet (`max_packet_size - 8`).
        max: usize,
    },

    /// The underlying transport returned an I/O error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramerError {
    /// Whether this error reflects framing corruption requiring the
    /// connection to be closed, as opposed to a recoverable caller error
    /// (e.g. [`FramerError::PayloadTooLarge`]).
    #[must_use]
    pub fn is_fatal_framing(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_) | Self::LengthOutOfRange { .. } | Self::TruncatedAtClose
        )
    }
}
