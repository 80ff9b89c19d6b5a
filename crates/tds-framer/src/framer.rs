//! The stateful packet-to-message decoder and message-to-packet encoder.
//!
//! [`StreamFramer`] is fully synchronous: `feed` is a pure buffer append and
//! `drain` never suspends. All awaiting on bytes belongs to the transport
//! layer above (see [`crate::io`]), which keeps this type testable without
//! any async runtime.

use bytes::{Bytes, BytesMut};
use tds_protocol::{DEFAULT_PACKET_SIZE, PacketType};

use crate::error::FramerError;
use crate::message::{Message, MessageAssembler};
use crate::packet::Packet;

/// Decodes an inbound byte stream into messages and encodes outbound
/// messages into packets, honoring one negotiated maximum packet size.
#[derive(Debug)]
pub struct StreamFramer {
    read_buf: BytesMut,
    assembler: MessageAssembler,
    max_packet_size: usize,
    next_packet_id: u8,
}

impl StreamFramer {
    /// Create a framer using the default negotiated packet size (4096).
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_packet_size(DEFAULT_PACKET_SIZE)
    }

    /// Create a framer using a packet size negotiated during login.
    #[must_use]
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self {
            read_buf: BytesMut::new(),
            assembler: MessageAssembler::new(),
            max_packet_size,
            next_packet_id: 1,
        }
    }

    /// The negotiated maximum packet size this framer enforces.
    #[must_use]
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Update the negotiated maximum packet size, e.g. after a login
    /// exchange renegotiates it. Takes effect for both parsing and
    /// outbound splitting from this point on.
    pub fn set_max_packet_size(&mut self, max_packet_size: usize) {
        self.max_packet_size = max_packet_size;
    }

    /// Append inbound bytes to the internal buffer. Never suspends, never
    /// parses; call [`StreamFramer::drain`] to extract messages.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.read_buf.extend_from_slice(bytes);
    }

    /// Extract as many complete messages as the current buffer permits.
    ///
    /// Stops and returns what it has so far the moment `Packet::try_parse`
    /// reports "not yet" (insufficient bytes for the next packet). A fatal
    /// framing error aborts the whole call; any messages already extracted
    /// earlier in this call are still returned in `Err`'s partner `Ok` path
    /// is not applicable here — per the framer's close-on-reject contract,
    /// the caller must treat an `Err` as terminal for the connection
    /// regardless of what was drained before it.
    pub fn drain(&mut self) -> Result<Vec<Message>, FramerError> {
        let mut messages = Vec::new();

        loop {
            match Packet::try_parse(&mut self.read_buf, self.max_packet_size) {
                Ok(None) => break,
                Ok(Some(packet)) => {
                    tracing::trace!(
                        packet_type = ?packet.header.packet_type,
                        packet_id = packet.header.packet_id,
                        is_eom = packet.is_end_of_message(),
                        "decoded TDS packet"
                    );
                    let (flushed, completed) = self.assembler.push(packet);
                    messages.extend(flushed);
                    messages.extend(completed);
                }
                Err(e) => {
                    tracing::error!(error = %e, "rejecting invalid TDS framing");
                    return Err(e);
                }
            }
        }

        Ok(messages)
    }

    /// Called when the transport reports end-of-stream. Returns any
    /// partial message still accumulating, which the caller should surface
    /// as a truncated-connection error rather than silently dropping.
    pub fn close(&mut self) -> Option<Message> {
        self.assembler.take_partial()
    }

    /// Whether bytes remain buffered that do not yet form a complete
    /// message: either raw bytes short of a full packet, or a full packet
    /// accumulated without its closing EOM. A transport that hits
    /// end-of-stream while this is true has truncated the connection.
    #[must_use]
    pub fn has_buffered_data(&self) -> bool {
        !self.read_buf.is_empty() || self.assembler.has_partial()
    }

    /// Split `payload` into packets of at most `max_packet_size - 8` bytes,
    /// with sequential `packet_id`s starting at 1 (wrapping modulo 256,
    /// skipping 0) and EOM set only on the last packet.
    pub fn encode_message(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<Vec<Packet>, FramerError> {
        let max_payload = self.max_packet_size - tds_protocol::PACKET_HEADER_SIZE;
        let chunks: Vec<&[u8]> = if payload.is_empty() {
            vec![&[]]
        } else {
            payload.chunks(max_payload).collect()
        };
        let total = chunks.len();

        let mut packets = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let is_last = i == total - 1;
            let packet_id = self.next_packet_id();
            let packet = Packet::from_message(
                Bytes::copy_from_slice(chunk),
                packet_type,
                is_last,
                packet_id,
                self.max_packet_size,
            )?;
            packets.push(packet);
        }

        Ok(packets)
    }

    fn next_packet_id(&mut self) -> u8 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        if self.next_packet_id == 0 {
            self.next_packet_id = 1;
        }
        id
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}
