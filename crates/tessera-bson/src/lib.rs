//! BSON-subset wire codec for the Tessera device SDK.
//!
//! Every data payload on the wire is a single document: a little-endian u32
//! size prefix, a flat list of tagged elements, and a terminator byte. This
//! crate provides the two halves of that format:
//!
//! - [`BsonSerializer`]: append-only document builder producing [`bytes::Bytes`]
//! - [`Document`]: zero-copy validated view for parsing inbound payloads
//!
//! # Supported Types
//!
//! Doubles, 32/64-bit integers, booleans, UTC datetimes (millisecond
//! precision), UTF-8 strings, binary blobs, embedded documents, and arrays of
//! each scalar type. Arrays are encoded as nested documents with decimal
//! string keys.
//!
//! # Robustness
//!
//! Parsing is total: any byte sequence either yields a validated [`Document`]
//! or a structured [`BsonError`]. No input panics the parser.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod document;
mod errors;
mod serializer;
mod types;

pub use document::{Document, Element, Elements};
pub use errors::{BsonError, Result};
pub use serializer::BsonSerializer;
pub use types::BsonType;
