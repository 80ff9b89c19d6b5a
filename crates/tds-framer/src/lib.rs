//! # tds-framer
//!
//! The packet framing and message reassembly layer for TDS connections.
//!
//! This crate transforms raw byte streams into complete TDS messages,
//! handling packet reassembly across TCP segment boundaries and
//! multi-packet messages.
//!
//! ## Architecture
//!
//! ```text
//! TCP stream → StreamFramer (packet parsing + message reassembly) → Message
//! ```
//!
//! The decoder half of [`StreamFramer`] is fully synchronous: `feed` is a
//! buffer append and `drain` never suspends. [`io::FramedTransport`] is the
//! only async-aware type in the crate, driving the framer from an
//! [`tokio::io::AsyncRead`]/[`tokio::io::AsyncWrite`] transport.
//!
//! ```rust
//! use tds_framer::StreamFramer;
//! use tds_protocol::PacketType;
//!
//! let mut framer = StreamFramer::new();
//! let packets = framer.encode_message(PacketType::SqlBatch, b"SELECT 1").unwrap();
//!
//! let mut decoder = StreamFramer::new();
//! for packet in &packets {
//!     decoder.feed(&packet.encode_to_bytes());
//! }
//! let messages = decoder.drain().unwrap();
//! assert_eq!(messages.len(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod framer;
pub mod io;
pub mod message;
pub mod packet;

pub use error::FramerError;
pub use framer::StreamFramer;
pub use io::FramedTransport;
pub use message::{Message, MessageAssembler};
pub use packet::Packet;
