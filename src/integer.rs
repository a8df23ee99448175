//! HPACK integer encoding (RFC 7541 Section 5.1).
//!
//! Integers are encoded with a variable-length prefix that can start
//! anywhere within an octet and always finishes at the end of an octet.

use bytes::{BufMut, BytesMut};

use crate::error::HpackError;

/// Continuation octets beyond this shift cannot carry a value that fits in 32 bits.
const MAX_SHIFT: u32 = 28;

/// Encode an integer with an N-bit prefix.
///
/// `flags` carries the representation bits above the prefix; the prefix bits
/// of `flags` must be zero.
pub fn encode_integer(dst: &mut BytesMut, flags: u8, prefix_bits: u8, value: usize) {
    debug_assert!((1..=8).contains(&prefix_bits));
    let max_prefix_value = (1usize << prefix_bits) - 1;

    if value < max_prefix_value {
        dst.put_u8(flags | value as u8);
        return;
    }

    dst.put_u8(flags | max_prefix_value as u8);
    let mut remaining = value - max_prefix_value;
    while remaining >= 128 {
        dst.put_u8((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }
    dst.put_u8(remaining as u8);
}

/// Decode an integer with an N-bit prefix.
///
/// `data[0]` is the octet holding the prefix. Returns `(value, bytes_consumed)`,
/// where the count includes the prefix octet.
pub fn decode_integer(data: &[u8], prefix_bits: u8) -> Result<(usize, usize), HpackError> {
    debug_assert!((1..=8).contains(&prefix_bits));
    let first = *data.first().ok_or(HpackError::UnexpectedEof)?;

    let max_prefix_value = (1u64 << prefix_bits) - 1;
    let prefix_value = u64::from(first) & max_prefix_value;
    if prefix_value < max_prefix_value {
        return Ok((prefix_value as usize, 1));
    }

    let mut value = max_prefix_value;
    let mut shift = 0u32;
    let mut pos = 1;

    loop {
        let byte = *data.get(pos).ok_or(HpackError::UnexpectedEof)?;
        pos += 1;

        if shift > MAX_SHIFT {
            return Err(HpackError::MalformedInteger);
        }
        value += u64::from(byte & 0x7F) << shift;
        if value > u64::from(u32::MAX) {
            return Err(HpackError::MalformedInteger);
        }

        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    Ok((value as usize, pos))
}
