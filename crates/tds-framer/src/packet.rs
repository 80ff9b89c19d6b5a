//! A single framed TDS unit.
//!
//! Unlike [`tds_protocol::PacketHeader`], which is a pure value type, [`Packet`]
//! owns a buffer and knows how to pull itself out of an arbitrary byte stream
//! or build itself from an outbound message fragment.

use bytes::{Buf, Bytes, BytesMut};
use tds_protocol::{PACKET_HEADER_SIZE, PacketHeader, PacketStatus, PacketType};

use crate::error::FramerError;

/// A fully framed TDS packet: header plus the payload bytes it carries.
///
/// `buffer.len() == header.length` always holds for a `Packet` returned by
/// [`Packet::try_parse`] or [`Packet::from_message`].
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Packet payload (excludes the header).
    pub payload: Bytes,
}

impl Packet {
    /// Wrap an already-decoded header and payload.
    #[must_use]
    pub fn new(header: PacketHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Total wire size of this packet, header included.
    #[must_use]
    pub fn total_size(&self) -> usize {
        PACKET_HEADER_SIZE + self.payload.len()
    }

    /// Whether this packet carries the EOM status bit.
    #[must_use]
    pub fn is_end_of_message(&self) -> bool {
        self.header.is_end_of_message()
    }

    /// Attempt to consume one complete packet from the front of `src`.
    ///
    /// Returns `Ok(None)` ("not yet") when fewer than [`PACKET_HEADER_SIZE`]
    /// bytes are buffered, or the header parses but fewer than `header.length`
    /// bytes are available. In both cases `src` is left untouched so the
    /// caller can retry once more bytes arrive — this call must be
    /// restartable on the same prefix.
    ///
    /// Returns `Err` ("reject") on invalid framing: an unrecognized type byte
    /// or an out-of-range length. Per the framing contract this spec follows,
    /// invalid framing is never treated as "not yet"; once the header fails
    /// to validate, resynchronizing locally is unsound and the caller must
    /// close the connection.
    pub fn try_parse(src: &mut BytesMut, max_packet_size: usize) -> Result<Option<Self>, FramerError> {
        if src.len() < PACKET_HEADER_SIZE {
            return Ok(None);
        }

        let length = u16::from_be_bytes([src[2], src[3]]) as usize;

        if length < PACKET_HEADER_SIZE || length > max_packet_size {
            return Err(FramerError::LengthOutOfRange {
                length: length as u16,
                max: max_packet_size,
            });
        }

        if src.len() < length {
            return Ok(None);
        }

        let mut packet_bytes = src.split_to(length);
        let header = {
            let mut cursor = packet_bytes.as_ref();
            PacketHeader::decode_with_max(&mut cursor, max_packet_size).map_err(|e| match e {
                tds_protocol::ProtocolError::InvalidPacketType(b) => FramerError::UnknownType(b),
                tds_protocol::ProtocolError::LengthOutOfRange { length, .. } => {
                    FramerError::LengthOutOfRange { length, max: max_packet_size }
                }
                // `length` bytes are already confirmed present above, so the
                // header's own short-buffer check can never trigger here.
                tds_protocol::ProtocolError::IncompletePacket { .. } => {
                    unreachable!("packet_bytes already holds `length` bytes")
                }
            })?
        };
        packet_bytes.advance(PACKET_HEADER_SIZE);
        let payload = packet_bytes.freeze();

        Ok(Some(Self { header, payload }))
    }

    /// Build a packet wrapping `payload`, writing a header with the given
    /// `packet_type`, EOM set iff `is_last`, and `packet_id`.
    ///
    /// Fails with [`FramerError::PayloadTooLarge`] if the payload cannot fit
    /// under `max_packet_size` once the header is accounted for.
    pub fn from_message(
        payload: Bytes,
        packet_type: PacketType,
        is_last: bool,
        packet_id: u8,
        max_packet_size: usize,
    ) -> Result<Self, FramerError> {
        let max_payload = max_packet_size - PACKET_HEADER_SIZE;
        if payload.len() > max_payload {
            return Err(FramerError::PayloadTooLarge {
                size: payload.len(),
                max: max_payload,
            });
        }

        let status = if is_last {
            PacketStatus::END_OF_MESSAGE
        } else {
            PacketStatus::NORMAL
        };

        let header = PacketHeader {
            packet_type,
            status,
            length: (PACKET_HEADER_SIZE + payload.len()) as u16,
            spid: 0,
            packet_id,
            window: 0,
        };

        Ok(Self { header, payload })
    }

    /// Serialize this packet (header followed by payload) to a fresh buffer.
    #[must_use]
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.total_size());
        self.header.encode(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tds_protocol::DEFAULT_PACKET_SIZE;

    #[test]
    fn test_try_parse_not_yet_on_short_header() {
        let mut buf = BytesMut::from(&[0x01, 0x01, 0x00][..]);
        let result = Packet::try_parse(&mut buf, DEFAULT_PACKET_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3, "cursor must not advance on a short read");
    }

    #[test]
    fn test_try_parse_not_yet_on_partial_payload() {
        let mut buf = BytesMut::from(&[0x01, 0x01, 0x00, 0x09, 0x00, 0x00, 0x01, 0x00][..]);
        let result = Packet::try_parse(&mut buf, DEFAULT_PACKET_SIZE).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 8, "cursor must not advance while payload is incomplete");
    }

    #[test]
    fn test_try_parse_scenario_1() {
        let mut buf = BytesMut::from(
            &[0x01, 0x01, 0x00, 0x09, 0x00, 0x00, 0x01, 0x00, 0x5A][..],
        );
        let packet = Packet::try_parse(&mut buf, DEFAULT_PACKET_SIZE).unwrap().unwrap();
        assert_eq!(packet.header.packet_type, PacketType::SqlBatch);
        assert!(packet.is_end_of_message());
        assert_eq!(&packet.payload[..], &[0x5A]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_try_parse_rejects_unknown_type() {
        let mut buf = BytesMut::from(
            &[0x99, 0x01, 0x00, 0x09, 0x00, 0x00, 0x01, 0x00, 0x5A][..],
        );
        let err = Packet::try_parse(&mut buf, DEFAULT_PACKET_SIZE).unwrap_err();
        assert!(matches!(err, FramerError::UnknownType(0x99)));
    }

    #[test]
    fn test_try_parse_rejects_short_length() {
        let mut buf = BytesMut::from(&[0x01, 0x01, 0x00, 0x05, 0x00, 0x00, 0x01, 0x00][..]);
        let err = Packet::try_parse(&mut buf, DEFAULT_PACKET_SIZE).unwrap_err();
        assert!(matches!(err, FramerError::LengthOutOfRange { length: 5, .. }));
    }

    #[test]
    fn test_from_message_and_roundtrip() {
        let payload = Bytes::from_static(b"hello");
        let packet = Packet::from_message(payload.clone(), PacketType::SqlBatch, true, 1, DEFAULT_PACKET_SIZE).unwrap();

        let mut wire = BytesMut::from(&packet.encode_to_bytes()[..]);
        let parsed = Packet::try_parse(&mut wire, DEFAULT_PACKET_SIZE).unwrap().unwrap();

        assert_eq!(parsed.header.packet_type, packet.header.packet_type);
        assert_eq!(parsed.header.packet_id, packet.header.packet_id);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn test_from_message_too_large() {
        let payload = Bytes::from(vec![0u8; 5000]);
        let err = Packet::from_message(payload, PacketType::SqlBatch, true, 1, DEFAULT_PACKET_SIZE).unwrap_err();
        assert!(matches!(err, FramerError::PayloadTooLarge { .. }));
    }
}
