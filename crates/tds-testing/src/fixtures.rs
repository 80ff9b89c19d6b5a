//! Byte-level packet fixtures and SQL scaffolding shared across crate tests.

use bytes::{BufMut, Bytes, BytesMut};
use tds_protocol::{PACKET_HEADER_SIZE, PacketHeader, PacketStatus, PacketType};

/// Encode a single well-formed packet: header followed by `payload`.
///
/// `status` controls whether this is the final packet of a message; callers
/// building a multi-packet message fixture should set [`PacketStatus::NORMAL`]
/// on every packet but the last.
#[must_use]
pub fn packet_bytes(packet_type: PacketType, status: PacketStatus, payload: &[u8]) -> Bytes {
    let length = (PACKET_HEADER_SIZE + payload.len()) as u16;
    let header = PacketHeader::new(packet_type, status, length).with_packet_id(1);
    let mut buf = BytesMut::with_capacity(length as usize);
    header.encode(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

/// Split `payload` across `chunk_size`-byte packets, end-of-message set only
/// on the last one. Useful for exercising [`tds_framer::StreamFramer`]'s
/// reassembly of a message spanning several packets.
#[must_use]
pub fn fragmented_packet_bytes(packet_type: PacketType, payload: &[u8], chunk_size: usize) -> Vec<Bytes> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    let chunks: Vec<&[u8]> = payload.chunks(chunk_size).collect();
    let last = chunks.len().saturating_sub(1);
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let status = if i == last { PacketStatus::END_OF_MESSAGE } else { PacketStatus::NORMAL };
            packet_bytes(packet_type, status, chunk)
        })
        .collect()
}

/// A single packet's raw header bytes truncated to `len`, for exercising
/// `IncompletePacket` / partial-feed decoder paths.
#[must_use]
pub fn truncated_header_bytes(len: usize) -> Bytes {
    let header = PacketHeader::new(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 100);
    let full = header.encode_to_bytes();
    full.slice(0..len.min(full.len()))
}

/// Test database fixture for building setup/teardown SQL in integration tests.
pub struct TestFixture {
    /// Database name.
    pub database: String,
    /// Tables created by this fixture.
    pub tables: Vec<String>,
}

impl TestFixture {
    /// Create a new test fixture.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table to the fixture.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.tables.push(table.into());
        self
    }

    /// Generate SQL to create the test database.
    #[must_use]
    pub fn create_database_sql(&self) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.databases WHERE name = '{db}')
             CREATE DATABASE [{db}]",
            db = self.database
        )
    }

    /// Generate SQL to drop the test database.
    #[must_use]
    pub fn drop_database_sql(&self) -> String {
        format!(
            "IF EXISTS (SELECT * FROM sys.databases WHERE name = '{db}')
             DROP DATABASE [{db}]",
            db = self.database
        )
    }
}
