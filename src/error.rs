//! Error types for the HPACK codec.

use thiserror::Error;

/// Result type alias using [`HpackError`].
pub type Result<T> = std::result::Result<T, HpackError>;

/// HPACK encoding/decoding errors.
///
/// Everything except [`HpackError::HeaderListTooLarge`] leaves the two ends of
/// the connection with tables that can no longer be trusted to agree, so the
/// owning connection has to be torn down. See [`HpackError::is_connection_error`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HpackError {
    /// Dynamic table size outside `[0, MAX_HEADER_TABLE_SIZE]` or above the
    /// ceiling negotiated for this connection.
    #[error("Invalid header table size: {0}")]
    InvalidTableSize(u64),

    /// Header list size limit outside `[0, MAX_HEADER_LIST_SIZE]`.
    #[error("Invalid header list size: {0}")]
    InvalidHeaderListSize(u64),

    /// Uncompressed header list exceeds the configured limit.
    #[error("Header list on stream {stream_id} too large: {size} > {limit}")]
    HeaderListTooLarge {
        stream_id: u32,
        size: u64,
        limit: u64,
    },

    /// Reference to a table slot that does not exist.
    #[error("Invalid index: {0}")]
    InvalidIndex(usize),

    /// Prefix integer longer than the decoder accepts.
    #[error("Malformed integer")]
    MalformedInteger,

    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// Huffman padding longer than 7 bits or not a prefix of EOS.
    #[error("Invalid Huffman padding")]
    HuffmanPadding,

    /// EOS symbol decoded inside a Huffman string.
    #[error("Invalid Huffman code")]
    InvalidHuffmanCode,

    /// Dynamic table size update after the first header field of a block.
    #[error("Dynamic table size update must precede header fields")]
    IllegalSizeUpdate,

    /// Header block did not start with the size update owed after a
    /// SETTINGS change.
    #[error("Dynamic table size update required")]
    SizeUpdateRequired,
}

impl HpackError {
    /// Whether the error means table synchronization with the peer is lost.
    pub fn is_connection_error(&self) -> bool {
        !matches!(self, Self::HeaderListTooLarge { .. })
    }

    /// Stream the error is attributed to, if any.
    pub fn stream_id(&self) -> Option<u32> {
        match self {
            Self::HeaderListTooLarge { stream_id, .. } => Some(*stream_id),
            _ => None,
        }
    }
}
