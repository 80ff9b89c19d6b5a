//! TDS message reassembly.
//!
//! A logical TDS message is the concatenation of the payloads of an ordered
//! run of packets sharing a type and ending with a packet whose EOM bit is
//! set. [`MessageAssembler`] accumulates packets and releases a [`Message`]
//! when that run completes.

use bytes::{Bytes, BytesMut};
use tds_protocol::PacketType;

use crate::packet::Packet;

/// A complete TDS message reassembled from one or more packets.
#[derive(Debug, Clone)]
pub struct Message {
    /// The packet type shared by every packet in this message.
    pub message_type: PacketType,
    /// The concatenated payload of every packet, in arrival order.
    pub payload: Bytes,
}

impl Message {
    /// Message payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the message payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Reassembles a run of packets sharing a type into complete messages.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    buffer: BytesMut,
    current_type: Option<PacketType>,
}

impl MessageAssembler {
    /// Create a new, empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a message is partway through accumulating.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.current_type.is_some()
    }

    /// Push one packet into the assembler.
    ///
    /// Returns `(flushed, completed)`:
    /// - `flushed` is `Some` only when this packet's type differs from the
    ///   type of the message already accumulating; the prior accumulator is
    ///   emitted as-is (without having seen its own EOM) as a defensive
    ///   safety net against a server that interleaves message types on one
    ///   connection, which strict TDS never does between EOM boundaries.
    /// - `completed` is `Some` when `packet`'s EOM bit closes out the
    ///   (possibly just-started) message.
    pub fn push(&mut self, packet: Packet) -> (Option<Message>, Option<Message>) {
        let flushed = match self.current_type {
            Some(current) if current != packet.header.packet_type => self.flush(),
            _ => None,
        };

        if self.current_type.is_none() {
            self.current_type = Some(packet.header.packet_type);
        }

        self.buffer.extend_from_slice(&packet.payload);

        let completed = if packet.is_end_of_message() {
            self.flush()
        } else {
            None
        };

        (flushed, completed)
    }

    /// Flush and return any partial accumulator, e.g. when the transport
    /// closes mid-message. The upper layer should treat a non-`None` result
    /// here as a truncated message, not a clean one.
    pub fn take_partial(&mut self) -> Option<Message> {
        self.flush()
    }

    fn flush(&mut self) -> Option<Message> {
        let message_type = self.current_type.take()?;
        Some(Message {
            message_type,
            payload: self.buffer.split().freeze(),
        })
    }
}
