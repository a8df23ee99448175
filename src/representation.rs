//! Header field representations (RFC 7541 Section 6) and string literals
//! (Section 5.2).
//!
//! Every representation is identified by the high bits of its first octet:
//!
//! | Pattern    | Representation                         | Prefix |
//! |------------|----------------------------------------|--------|
//! | `1xxxxxxx` | Indexed header field                   | 7      |
//! | `01xxxxxx` | Literal with incremental indexing      | 6      |
//! | `001xxxxx` | Dynamic table size update              | 5      |
//! | `0001xxxx` | Literal never indexed                  | 4      |
//! | `0000xxxx` | Literal without indexing               | 4      |

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::HpackError;
use crate::huffman::{huffman_decode, huffman_encode, huffman_encoded_len};
use crate::integer::{decode_integer, encode_integer};

/// Name of a literal representation: a table index or the name itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRef {
    Indexed(usize),
    Literal(Bytes),
}

/// One self-contained unit of an HPACK header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    /// Reference to a full (name, value) entry in the combined index space.
    Indexed(usize),
    /// Literal that both ends append to their dynamic table.
    LiteralWithIndexing { name: NameRef, value: Bytes },
    /// Literal that is not added to the table this hop.
    LiteralWithoutIndexing { name: NameRef, value: Bytes },
    /// Literal that no hop may ever add to a table.
    LiteralNeverIndexed { name: NameRef, value: Bytes },
    /// New dynamic table capacity.
    SizeUpdate(u64),
}

impl Representation {
    /// Serialize this representation.
    ///
    /// String literals are Huffman coded when `use_huffman` is set and the
    /// Huffman form is strictly shorter.
    pub fn encode(&self, dst: &mut BytesMut, use_huffman: bool) {
        match self {
            Self::Indexed(index) => encode_integer(dst, 0x80, 7, *index),
            Self::LiteralWithIndexing { name, value } => {
                encode_literal(dst, 0x40, 6, name, value, use_huffman)
            }
            Self::LiteralWithoutIndexing { name, value } => {
                encode_literal(dst, 0x00, 4, name, value, use_huffman)
            }
            Self::LiteralNeverIndexed { name, value } => {
                encode_literal(dst, 0x10, 4, name, value, use_huffman)
            }
            Self::SizeUpdate(size) => encode_integer(dst, 0x20, 5, *size as usize),
        }
    }

    /// Parse one representation from the start of `data`.
    ///
    /// Returns the representation and the number of bytes consumed. Indices
    /// are not resolved here.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), HpackError> {
        let first = *data.first().ok_or(HpackError::UnexpectedEof)?;

        if first & 0x80 == 0x80 {
            let (index, consumed) = decode_integer(data, 7)?;
            return Ok((Self::Indexed(index), consumed));
        }

        if first & 0xC0 == 0x40 {
            let (name, value, consumed) = decode_literal(data, 6)?;
            return Ok((Self::LiteralWithIndexing { name, value }, consumed));
        }

        if first & 0xE0 == 0x20 {
            let (size, consumed) = decode_integer(data, 5)?;
            return Ok((Self::SizeUpdate(size as u64), consumed));
        }

        let (name, value, consumed) = decode_literal(data, 4)?;
        if first & 0xF0 == 0x10 {
            Ok((Self::LiteralNeverIndexed { name, value }, consumed))
        } else {
            Ok((Self::LiteralWithoutIndexing { name, value }, consumed))
        }
    }
}

fn encode_literal(
    dst: &mut BytesMut,
    flags: u8,
    prefix_bits: u8,
    name: &NameRef,
    value: &[u8],
    use_huffman: bool,
) {
    match name {
        NameRef::Indexed(index) => encode_integer(dst, flags, prefix_bits, *index),
        NameRef::Literal(name) => {
            dst.put_u8(flags);
            encode_string(dst, name, use_huffman);
        }
    }
    encode_string(dst, value, use_huffman);
}

fn decode_literal(data: &[u8], prefix_bits: u8) -> Result<(NameRef, Bytes, usize), HpackError> {
    let (index, mut pos) = decode_integer(data, prefix_bits)?;

    let name = if index == 0 {
        let (name, consumed) = decode_string(&data[pos..])?;
        pos += consumed;
        NameRef::Literal(name)
    } else {
        NameRef::Indexed(index)
    };

    let (value, consumed) = decode_string(&data[pos..])?;
    Ok((name, value, pos + consumed))
}

/// Encode a string literal: H flag, 7-bit-prefix length, payload.
pub fn encode_string(dst: &mut BytesMut, input: &[u8], use_huffman: bool) {
    if use_huffman {
        let encoded_len = huffman_encoded_len(input);
        if encoded_len < input.len() {
            encode_integer(dst, 0x80, 7, encoded_len);
            huffman_encode(input, dst);
            return;
        }
    }

    encode_integer(dst, 0x00, 7, input.len());
    dst.extend_from_slice(input);
}

/// Decode a string literal. Returns the octets and the bytes consumed.
pub fn decode_string(data: &[u8]) -> Result<(Bytes, usize), HpackError> {
    let first = *data.first().ok_or(HpackError::UnexpectedEof)?;
    let (length, header_len) = decode_integer(data, 7)?;

    let end = header_len
        .checked_add(length)
        .ok_or(HpackError::UnexpectedEof)?;
    let payload = data.get(header_len..end).ok_or(HpackError::UnexpectedEof)?;

    let decoded = if first & 0x80 == 0x80 {
        Bytes::from(huffman_decode(payload)?)
    } else {
        Bytes::copy_from_slice(payload)
    };

    Ok((decoded, end))
}
