//! # hpack-codec
//!
//! HPACK header compression for HTTP/2 (RFC 7541).
//!
//! An [`Encoder`] and a [`Decoder`] each own a dynamic table. The two tables
//! are never shared: they stay identical because the decoder replays exactly
//! the insertions and size updates the encoder put on the wire. Every encode
//! and decode call must therefore be applied in wire order, one at a time,
//! for the lifetime of the connection.
//!
//! ## Usage
//!
//! ```
//! use bytes::BytesMut;
//! use hpack_codec::{Decoder, Encoder, Headers, NeverSensitive};
//!
//! let mut encoder = Encoder::new();
//! let mut decoder = Decoder::default();
//!
//! let mut request = Headers::new();
//! request.add(":method", "GET");
//! request.add(":path", "/index.html");
//! request.add("user-agent", "hpack-codec");
//!
//! let mut block = BytesMut::new();
//! encoder.encode_headers(1, &mut block, &request, &NeverSensitive)?;
//!
//! let mut decoded = Headers::new();
//! decoder.decode(1, &block, &mut decoded, true)?;
//! assert_eq!(decoded, request);
//! # Ok::<(), hpack_codec::HpackError>(())
//! ```

pub mod decoder;
pub mod dynamic_table;
pub mod encoder;
pub mod error;
pub mod header;
pub mod huffman;
pub mod integer;
pub mod representation;
pub mod settings;
pub mod static_table;

// Re-exports
pub use decoder::{Decoder, DEFAULT_HEADER_LIST_SIZE};
pub use dynamic_table::{DynamicTable, DEFAULT_HEADER_TABLE_SIZE, MAX_HEADER_TABLE_SIZE};
pub use encoder::{Encoder, MAX_HEADER_LIST_SIZE};
pub use error::{HpackError, Result};
pub use header::{
    AlwaysSensitive, HeaderField, Headers, NeverSensitive, SensitivityDetector,
    HEADER_ENTRY_OVERHEAD,
};
pub use representation::{NameRef, Representation};
pub use settings::HpackSettings;
