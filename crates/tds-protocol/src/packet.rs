//! TDS packet header definitions.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// TDS packet header size in bytes.
pub const PACKET_HEADER_SIZE: usize = 8;

/// Maximum TDS packet size (64KB - 1).
pub const MAX_PACKET_SIZE: usize = 65535;

/// Default TDS packet size, used until the login exchange negotiates a
/// different value.
pub const DEFAULT_PACKET_SIZE: usize = 4096;

/// TDS packet type, carried in the first byte of every packet header.
///
/// Values are the wire-level byte assignments; they are not negotiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// SQL batch request.
    SqlBatch = 0x01,
    /// Pre-TDS7 login packet.
    PreTds7Login = 0x02,
    /// Remote procedure call.
    Rpc = 0x03,
    /// Tabular response.
    TabularResult = 0x04,
    /// Attention signal.
    Attention = 0x06,
    /// Bulk load data.
    BulkLoad = 0x07,
    /// Federated authentication token.
    FedAuthToken = 0x08,
    /// Pre-login packet.
    PreLogin = 0x12,
    /// TDS7+ login packet.
    Tds7Login = 0x13,
    /// SSPI authentication.
    Sspi = 0x14,
    /// Transaction manager request.
    TransactionManager = 0x15,
    /// TLS/SSL handshake data.
    Tls = 0x16,
}

impl PacketType {
    /// Create a packet type from a raw byte value.
    ///
    /// Any value outside the recognized set is `InvalidPacketType`; this
    /// layer never guesses at forward-compatible behavior for unknown types.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x01 => Ok(Self::SqlBatch),
            0x02 => Ok(Self::PreTds7Login),
            0x03 => Ok(Self::Rpc),
            0x04 => Ok(Self::TabularResult),
            0x06 => Ok(Self::Attention),
            0x07 => Ok(Self::BulkLoad),
            0x08 => Ok(Self::FedAuthToken),
            0x12 => Ok(Self::PreLogin),
            0x13 => Ok(Self::Tds7Login),
            0x14 => Ok(Self::Sspi),
            0x15 => Ok(Self::TransactionManager),
            0x16 => Ok(Self::Tls),
            _ => Err(ProtocolError::InvalidPacketType(value)),
        }
    }
}

bitflags! {
    /// TDS packet status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PacketStatus: u8 {
        /// Normal packet, more packets to follow.
        const NORMAL = 0x00;
        /// End of message (last packet).
        const END_OF_MESSAGE = 0x01;
        /// Ignore this event (used for attention acknowledgment).
        const IGNORE_EVENT = 0x02;
        /// Reset connection (SQL Server 2000+).
        const RESET_CONNECTION = 0x08;
        /// Reset connection but keep transaction state.
        const RESET_CONNECTION_KEEP_TRANSACTION = 0x10;
    }
}

/// TDS packet header.
///
/// Every TDS packet begins with an 8-byte header laid out as
/// `[type:1][status:1][length:2 BE][spid:2 BE][packet_id:1][window:1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Type of packet.
    pub packet_type: PacketType,
    /// Status flags.
    pub status: PacketStatus,
    /// Total packet length including header.
    pub length: u16,
    /// Server process ID (SPID).
    pub spid: u16,
    /// Packet sequence number (wraps at 256, starting over at 1).
    pub packet_id: u8,
    /// Window (unused, written as 0, preserved on read).
    pub window: u8,
}

impl PacketHeader {
    /// Create a new packet header with `spid`, `packet_id`, and `window`
    /// left at their defaults.
    #[must_use]
    pub const fn new(packet_type: PacketType, status: PacketStatus, length: u16) -> Self {
        Self {
            packet_type,
            status,
            length,
            spid: 0,
            packet_id: 0,
            window: 0,
        }
    }

    /// Parse a packet header out of a buffer.
    ///
    /// Requires at least [`PACKET_HEADER_SIZE`] readable bytes and a
    /// `length` field within `8..=max_packet_size`. Callers validating a
    /// stream position rather than an in-memory slice should use
    /// `decode_with_max` so the negotiated maximum is enforced here rather
    /// than left to the caller.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        Self::decode_with_max(src, MAX_PACKET_SIZE)
    }

    /// Parse a packet header, validating `length` against `max_packet_size`.
    pub fn decode_with_max(src: &mut impl Buf, max_packet_size: usize) -> Result<Self, ProtocolError> {
        if src.remaining() < PACKET_HEADER_SIZE {
            return Err(ProtocolError::IncompletePacket {
                expected: PACKET_HEADER_SIZE,
                actual: src.remaining(),
            });
        }

        let packet_type = PacketType::from_u8(src.get_u8())?;
        let status_byte = src.get_u8();
        // Only EOM is interpreted; any other bits are preserved verbatim
        // rather than rejected, so this can never fail.
        let status = PacketStatus::from_bits_retain(status_byte);
        let length = src.get_u16();
        let spid = src.get_u16();
        let packet_id = src.get_u8();
        let window = src.get_u8();

        if (length as usize) < PACKET_HEADER_SIZE || length as usize > max_packet_size {
            return Err(ProtocolError::LengthOutOfRange {
                length,
                min: PACKET_HEADER_SIZE as u16,
                max: max_packet_size,
            });
        }

        Ok(Self {
            packet_type,
            status,
            length,
            spid,
            packet_id,
            window,
        })
    }

    /// Encode the packet header to bytes.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.packet_type as u8);
        dst.put_u8(self.status.bits());
        dst.put_u16(self.length);
        dst.put_u16(self.spid);
        dst.put_u8(self.packet_id);
        dst.put_u8(self.window);
    }

    /// Encode the packet header to a new `Bytes` buffer.
    #[must_use]
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_HEADER_SIZE);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Get the payload length (total length minus header).
    #[must_use]
    pub const fn payload_length(&self) -> usize {
        self.length.saturating_sub(PACKET_HEADER_SIZE as u16) as usize
    }

    /// Check if this is the last packet in a message.
    #[must_use]
    pub const fn is_end_of_message(&self) -> bool {
        self.status.contains(PacketStatus::END_OF_MESSAGE)
    }

    /// Set the packet ID (sequence number).
    #[must_use]
    pub const fn with_packet_id(mut self, id: u8) -> Self {
        self.packet_id = id;
        self
    }

    /// Set the SPID.
    #[must_use]
    pub const fn with_spid(mut self, spid: u16) -> Self {
        self.spid = spid;
        self
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self {
            packet_type: PacketType::SqlBatch,
            status: PacketStatus::END_OF_MESSAGE,
            length: PACKET_HEADER_SIZE as u16,
            spid: 0,
            packet_id: 1,
            window: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = PacketHeader {
            packet_type: PacketType::SqlBatch,
            status: PacketStatus::END_OF_MESSAGE,
            length: 100,
            spid: 54,
            packet_id: 1,
            window: 0,
        };

        let bytes = header.encode_to_bytes();
        assert_eq!(bytes.len(), PACKET_HEADER_SIZE);

        let mut cursor = bytes.as_ref();
        let decoded = PacketHeader::decode(&mut cursor).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn test_payload_length() {
        let header = PacketHeader::new(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 100);
        assert_eq!(header.payload_length(), 92);
    }

    #[test]
    fn test_packet_type_from_u8() {
        assert_eq!(PacketType::from_u8(0x01).unwrap(), PacketType::SqlBatch);
        assert_eq!(PacketType::from_u8(0x12).unwrap(), PacketType::PreLogin);
        assert_eq!(PacketType::from_u8(0x13).unwrap(), PacketType::Tds7Login);
        assert_eq!(PacketType::from_u8(0x15).unwrap(), PacketType::TransactionManager);
        assert!(PacketType::from_u8(0x99).is_err());
    }

    #[test]
    fn test_length_out_of_range() {
        let mut data = [0x01u8, 0x01, 0x00, 0x05, 0x00, 0x00, 0x01, 0x00];
        let err = PacketHeader::decode(&mut data.as_ref()).unwrap_err();
        assert!(matches!(err, ProtocolError::LengthOutOfRange { length: 5, .. }));
    }

    #[test]
    fn test_unknown_type_byte() {
        let mut data = [0x99u8, 0x01, 0x00, 0x09, 0x00, 0x00, 0x01, 0x00];
        let err = PacketHeader::decode(&mut data.as_ref()).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPacketType(0x99)));
    }

    #[test]
    fn test_unrecognized_status_bits_round_trip_verbatim() {
        // 0x04 carries no named flag; it must decode successfully and be
        // preserved, not rejected as invalid.
        let mut data = [0x01u8, 0x04, 0x00, 0x09, 0x00, 0x00, 0x01, 0x00];
        let header = PacketHeader::decode(&mut data.as_ref()).unwrap();
        assert_eq!(header.status.bits(), 0x04);
        assert_eq!(header.encode_to_bytes()[1], 0x04);
    }
}
