//! Async transport adapter over [`StreamFramer`].
//!
//! [`FramedTransport`] is the only async-aware type in this crate. It owns
//! the synchronous [`StreamFramer`] and drives it from an
//! [`AsyncRead`]/[`AsyncWrite`] transport, so the framing logic itself stays
//! testable without a runtime.

use std::collections::VecDeque;

use bytes::Bytes;
use tds_protocol::{DEFAULT_PACKET_SIZE, PacketType};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FramerError;
use crate::framer::StreamFramer;
use crate::message::Message;

const READ_CHUNK: usize = 8192;

/// Drives a [`StreamFramer`] over a bidirectional byte transport.
///
/// This type has no notion of cancellation or out-of-band signaling; per
/// the core's concurrency model, cancelling an in-flight operation is the
/// caller's responsibility and is satisfied by dropping the transport.
pub struct FramedTransport<T> {
    transport: T,
    framer: StreamFramer,
    pending: VecDeque<Message>,
    read_buf: Box<[u8; READ_CHUNK]>,
}

impl<T> FramedTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `transport`, framing with the default negotiated packet size.
    pub fn new(transport: T) -> Self {
        Self::with_max_packet_size(transport, DEFAULT_PACKET_SIZE)
    }

    /// Wrap `transport`, framing with a packet size negotiated at login.
    pub fn with_max_packet_size(transport: T, max_packet_size: usize) -> Self {
        Self {
            transport,
            framer: StreamFramer::with_max_packet_size(max_packet_size),
            pending: VecDeque::new(),
            read_buf: Box::new([0u8; READ_CHUNK]),
        }
    }

    /// Update the negotiated maximum packet size.
    pub fn set_max_packet_size(&mut self, max_packet_size: usize) {
        self.framer.set_max_packet_size(max_packet_size);
    }

    /// Read the next complete message, performing multi-packet reassembly
    /// transparently.
    ///
    /// Returns `Ok(None)` on a clean close (no message in progress).
    /// Returns `Err(FramerError::TruncatedAtClose)` if the transport closed
    /// mid-message — the caller should surface this as a connection-lost
    /// error rather than treating it as end-of-stream.
    pub async fn read_message(&mut self) -> Result<Option<Message>, FramerError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }

        loop {
            let n = self.transport.read(&mut self.read_buf[..]).await?;
            if n == 0 {
                return if self.framer.has_buffered_data() {
                    Err(FramerError::TruncatedAtClose)
                } else {
                    Ok(None)
                };
            }

            self.framer.feed(&self.read_buf[..n]);
            let mut messages = self.framer.drain()?;
            if messages.is_empty() {
                continue;
            }
            let first = messages.remove(0);
            self.pending.extend(messages);
            return Ok(Some(first));
        }
    }

    /// Send a complete message, splitting it into packets per the
    /// negotiated maximum packet size and writing them in `packet_id` order.
    pub async fn send_message(&mut self, packet_type: PacketType, payload: Bytes) -> Result<(), FramerError> {
        let packets = self.framer.encode_message(packet_type, &payload)?;
        tracing::trace!(packet_type = ?packet_type, packet_count = packets.len(), "sending TDS message");
        for packet in &packets {
            self.transport.write_all(&packet.encode_to_bytes()).await?;
        }
        Ok(())
    }

    /// Flush any buffered writes to the transport.
    pub async fn flush(&mut self) -> Result<(), FramerError> {
        self.transport.flush().await.map_err(FramerError::from)
    }

    /// Consume this wrapper, returning the underlying transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T> std::fmt::Debug for FramedTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedTransport")
            .field("max_packet_size", &self.framer.max_packet_size())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
