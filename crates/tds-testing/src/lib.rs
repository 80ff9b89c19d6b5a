//! # tds-testing
//!
//! Shared test fixtures for the workspace: byte-level TDS packet builders
//! for exercising [`tds_framer::StreamFramer`], and SQL scaffolding for
//! tests that stand up and tear down a scratch database.
//!
//! ```rust
//! use tds_testing::fixtures::packet_bytes;
//! use tds_protocol::{PacketStatus, PacketType};
//!
//! let bytes = packet_bytes(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, b"SELECT 1");
//! assert_eq!(bytes.len(), 8 + 8);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;

pub use fixtures::{TestFixture, fragmented_packet_bytes, packet_bytes, truncated_header_bytes};
