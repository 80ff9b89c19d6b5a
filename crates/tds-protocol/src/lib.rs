//! # tds-protocol
//!
//! Pure value types for the MS-TDS (Tabular Data Stream) packet header —
//! the wire-level framing that every higher TDS token stream rides on.
//!
//! This crate is intentionally IO-agnostic and token-agnostic. It contains
//! no networking logic, no token parsing, and makes no assumptions about
//! the async runtime. Higher-level crates (`tds-framer`, `tds-bulk`) build
//! upon this foundation.
//!
//! ## Features
//!
//! - `std` (default): enable standard library support.
//! - `alloc`: enable allocation without full std (requires the `alloc` crate).
//!
//! ## Example
//!
//! ```rust
//! use tds_protocol::{PacketHeader, PacketType, PacketStatus};
//!
//! let header = PacketHeader::new(PacketType::SqlBatch, PacketStatus::END_OF_MESSAGE, 100);
//! assert!(header.is_end_of_message());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod error;
pub mod packet;

pub use error::ProtocolError;
pub use packet::{
    DEFAULT_PACKET_SIZE, MAX_PACKET_SIZE, PACKET_HEADER_SIZE, PacketHeader, PacketStatus, PacketType,
};
