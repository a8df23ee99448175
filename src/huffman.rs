//! HPACK Huffman encoding/decoding (RFC 7541 Appendix B).
//!
//! The code table and the decode trie built from it are process-wide,
//! immutable, and shared by every encoder and decoder.

use std::sync::OnceLock;

use bytes::{BufMut, BytesMut};

use crate::error::HpackError;

/// EOS symbol index in [`HUFFMAN_TABLE`].
const EOS: usize = 256;

/// `(code, bit_length)` for symbols 0x00-0xFF followed by EOS.
///
/// Codes are stored right-aligned as printed in the RFC.
static HUFFMAN_TABLE: [(u32, u8); 257] = [
    (0x1ff8, 13), (0x7fffd8, 23), (0xfffffe2, 28), (0xfffffe3, 28), // 0x00
    (0xfffffe4, 28), (0xfffffe5, 28), (0xfffffe6, 28), (0xfffffe7, 28),
    (0xfffffe8, 28), (0xffffea, 24), (0x3ffffffc, 30), (0xfffffe9, 28),
    (0xfffffea, 28), (0x3ffffffd, 30), (0xfffffeb, 28), (0xfffffec, 28),
    (0xfffffed, 28), (0xfffffee, 28), (0xfffffef, 28), (0xffffff0, 28), // 0x10
    (0xffffff1, 28), (0xffffff2, 28), (0x3ffffffe, 30), (0xffffff3, 28),
    (0xffffff4, 28), (0xffffff5, 28), (0xffffff6, 28), (0xffffff7, 28),
    (0xffffff8, 28), (0xffffff9, 28), (0xffffffa, 28), (0xffffffb, 28),
    (0x14, 6), (0x3f8, 10), (0x3f9, 10), (0xffa, 12), // 0x20
    (0x1ff9, 13), (0x15, 6), (0xf8, 8), (0x7fa, 11),
    (0x3fa, 10), (0x3fb, 10), (0xf9, 8), (0x7fb, 11),
    (0xfa, 8), (0x16, 6), (0x17, 6), (0x18, 6),
    (0x0, 5), (0x1, 5), (0x2, 5), (0x19, 6), // 0x30
    (0x1a, 6), (0x1b, 6), (0x1c, 6), (0x1d, 6),
    (0x1e, 6), (0x1f, 6), (0x5c, 7), (0xfb, 8),
    (0x7ffc, 15), (0x20, 6), (0xffb, 12), (0x3fc, 10),
    (0x1ffa, 13), (0x21, 6), (0x5d, 7), (0x5e, 7), // 0x40
    (0x5f, 7), (0x60, 7), (0x61, 7), (0x62, 7),
    (0x63, 7), (0x64, 7), (0x65, 7), (0x66, 7),
    (0x67, 7), (0x68, 7), (0x69, 7), (0x6a, 7),
    (0x6b, 7), (0x6c, 7), (0x6d, 7), (0x6e, 7), // 0x50
    (0x6f, 7), (0x70, 7), (0x71, 7), (0x72, 7),
    (0xfc, 8), (0x73, 7), (0xfd, 8), (0x1ffb, 13),
    (0x7fff0, 19), (0x1ffc, 13), (0x3ffc, 14), (0x22, 6),
    (0x7ffd, 15), (0x3, 5), (0x23, 6), (0x4, 5), // 0x60
    (0x24, 6), (0x5, 5), (0x25, 6), (0x26, 6),
    (0x27, 6), (0x6, 5), (0x74, 7), (0x75, 7),
    (0x28, 6), (0x29, 6), (0x2a, 6), (0x7, 5),
    (0x2b, 6), (0x76, 7), (0x2c, 6), (0x8, 5), // 0x70
    (0x9, 5), (0x2d, 6), (0x77, 7), (0x78, 7),
    (0x79, 7), (0x7a, 7), (0x7b, 7), (0x7ffe, 15),
    (0x7fc, 11), (0x3ffd, 14), (0x1ffd, 13), (0xffffffc, 28),
    (0xfffe6, 20), (0x3fffd2, 22), (0xfffe7, 20), (0xfffe8, 20), // 0x80
    (0x3fffd3, 22), (0x3fffd4, 22), (0x3fffd5, 22), (0x7fffd9, 23),
    (0x3fffd6, 22), (0x7fffda, 23), (0x7fffdb, 23), (0x7fffdc, 23),
    (0x7fffdd, 23), (0x7fffde, 23), (0xffffeb, 24), (0x7fffdf, 23),
    (0xffffec, 24), (0xffffed, 24), (0x3fffd7, 22), (0x7fffe0, 23), // 0x90
    (0xffffee, 24), (0x7fffe1, 23), (0x7fffe2, 23), (0x7fffe3, 23),
    (0x7fffe4, 23), (0x1fffdc, 21), (0x3fffd8, 22), (0x7fffe5, 23),
    (0x3fffd9, 22), (0x7fffe6, 23), (0x7fffe7, 23), (0xffffef, 24),
    (0x3fffda, 22), (0x1fffdd, 21), (0xfffe9, 20), (0x3fffdb, 22), // 0xa0
    (0x3fffdc, 22), (0x7fffe8, 23), (0x7fffe9, 23), (0x1fffde, 21),
    (0x7fffea, 23), (0x3fffdd, 22), (0x3fffde, 22), (0xfffff0, 24),
    (0x1fffdf, 21), (0x3fffdf, 22), (0x7fffeb, 23), (0x7fffec, 23),
    (0x1fffe0, 21), (0x1fffe1, 21), (0x3fffe0, 22), (0x1fffe2, 21), // 0xb0
    (0x7fffed, 23), (0x3fffe1, 22), (0x7fffee, 23), (0x7fffef, 23),
    (0xfffea, 20), (0x3fffe2, 22), (0x3fffe3, 22), (0x3fffe4, 22),
    (0x7ffff0, 23), (0x3fffe5, 22), (0x3fffe6, 22), (0x7ffff1, 23),
    (0x3ffffe0, 26), (0x3ffffe1, 26), (0xfffeb, 20), (0x7fff1, 19), // 0xc0
    (0x3fffe7, 22), (0x7ffff2, 23), (0x3fffe8, 22), (0x1ffffec, 25),
    (0x3ffffe2, 26), (0x3ffffe3, 26), (0x3ffffe4, 26), (0x7ffffde, 27),
    (0x7ffffdf, 27), (0x3ffffe5, 26), (0xfffff1, 24), (0x1ffffed, 25),
    (0x7fff2, 19), (0x1fffe3, 21), (0x3ffffe6, 26), (0x7ffffe0, 27), // 0xd0
    (0x7ffffe1, 27), (0x3ffffe7, 26), (0x7ffffe2, 27), (0xfffff2, 24),
    (0x1fffe4, 21), (0x1fffe5, 21), (0x3ffffe8, 26), (0x3ffffe9, 26),
    (0xffffffd, 28), (0x7ffffe3, 27), (0x7ffffe4, 27), (0x7ffffe5, 27),
    (0xfffec, 20), (0xfffff3, 24), (0xfffed, 20), (0x1fffe6, 21), // 0xe0
    (0x3fffe9, 22), (0x1fffe7, 21), (0x1fffe8, 21), (0x7ffff3, 23),
    (0x3fffea, 22), (0x3fffeb, 22), (0x1ffffee, 25), (0x1ffffef, 25),
    (0xfffff4, 24), (0xfffff5, 24), (0x3ffffea, 26), (0x7ffff4, 23),
    (0x3ffffeb, 26), (0x7ffffe6, 27), (0x3ffffec, 26), (0x3ffffed, 26), // 0xf0
    (0x7ffffe7, 27), (0x7ffffe8, 27), (0x7ffffe9, 27), (0x7ffffea, 27),
    (0x7ffffeb, 27), (0xffffffe, 28), (0x7ffffec, 27), (0x7ffffed, 27),
    (0x7ffffee, 27), (0x7ffffef, 27), (0x7fffff0, 27), (0x3ffffee, 26),
    (0x3fffffff, 30), // EOS
];

/// Calculate the encoded length of a string if Huffman encoded.
pub fn huffman_encoded_len(input: &[u8]) -> usize {
    let total_bits: usize = input
        .iter()
        .map(|&b| HUFFMAN_TABLE[b as usize].1 as usize)
        .sum();
    total_bits.div_ceil(8)
}

/// Huffman-encode `input` into `dst` (MSB-first), padding the last octet with
/// the most significant bits of EOS.
pub fn huffman_encode(input: &[u8], dst: &mut BytesMut) {
    let mut accumulator: u64 = 0;
    let mut bit_count: u32 = 0;

    for &byte in input {
        let (code, len) = HUFFMAN_TABLE[byte as usize];
        accumulator = (accumulator << len) | u64::from(code);
        bit_count += u32::from(len);

        while bit_count >= 8 {
            bit_count -= 8;
            dst.put_u8((accumulator >> bit_count) as u8);
        }
        accumulator &= (1u64 << bit_count) - 1;
    }

    if bit_count > 0 {
        let padding = 8 - bit_count;
        accumulator = (accumulator << padding) | ((1u64 << padding) - 1);
        dst.put_u8(accumulator as u8);
    }
}

/// Binary decode trie. Each node holds its two children; a child with
/// [`LEAF`] set is a symbol, otherwise it is the index of the next node.
struct DecodeTrie {
    nodes: Vec<[u16; 2]>,
}

const LEAF: u16 = 0x8000;
const UNSET: u16 = u16::MAX;

impl DecodeTrie {
    fn new() -> Self {
        let mut nodes = vec![[UNSET; 2]];

        for (symbol, &(code, len)) in HUFFMAN_TABLE.iter().enumerate() {
            let mut node = 0usize;
            for i in (0..len).rev() {
                let bit = ((code >> i) & 1) as usize;
                if i == 0 {
                    nodes[node][bit] = LEAF | symbol as u16;
                } else {
                    if nodes[node][bit] == UNSET {
                        nodes.push([UNSET; 2]);
                        nodes[node][bit] = (nodes.len() - 1) as u16;
                    }
                    node = nodes[node][bit] as usize;
                }
            }
        }

        Self { nodes }
    }
}

static DECODE_TRIE: OnceLock<DecodeTrie> = OnceLock::new();

fn decode_trie() -> &'static DecodeTrie {
    DECODE_TRIE.get_or_init(DecodeTrie::new)
}

/// Decode Huffman-encoded bytes.
///
/// Trailing bits after the last symbol must be fewer than 8 and all ones.
pub fn huffman_decode(input: &[u8]) -> Result<Vec<u8>, HpackError> {
    let trie = decode_trie();
    let mut output = Vec::with_capacity(input.len() + input.len() / 2);

    let mut node = 0usize;
    // Bits read since the last complete symbol, and whether they were all ones.
    let mut pending_bits = 0u32;
    let mut pending_ones = true;

    for &byte in input {
        for shift in (0..8).rev() {
            let bit = ((byte >> shift) & 1) as usize;
            pending_bits += 1;
            pending_ones &= bit == 1;

            let next = trie.nodes[node][bit];
            if next & LEAF != 0 {
                let symbol = (next & !LEAF) as usize;
                if symbol == EOS {
                    return Err(HpackError::InvalidHuffmanCode);
                }
                output.push(symbol as u8);
                node = 0;
                pending_bits = 0;
                pending_ones = true;
            } else {
                node = next as usize;
            }
        }
    }

    if pending_bits > 7 || !pending_ones {
        return Err(HpackError::HuffmanPadding);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(input: &[u8]) -> Vec<u8> {
        let mut dst = BytesMut::new();
        huffman_encode(input, &mut dst);
        dst.to_vec()
    }

    #[test]
    fn test_huffman_encode_rfc_c4() {
        // RFC 7541 C.4.1
        assert_eq!(
            encode(b"www.example.com"),
            [0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4, 0xff]
        );
        // RFC 7541 C.4.2
        assert_eq!(encode(b"no-cache"), [0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf]);
    }

    #[test]
    fn test_huffman_decode_rfc_c4() {
        let data = [0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f];
        assert_eq!(huffman_decode(&data).unwrap(), b"custom-key");
        let data = [0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf];
        assert_eq!(huffman_decode(&data).unwrap(), b"custom-value");
    }

    #[test]
    fn test_huffman_round_trip_all_octets() {
        let input: Vec<u8> = (0..=255u8).collect();
        let encoded = encode(&input);
        assert_eq!(encoded.len(), huffman_encoded_len(&input));
        assert_eq!(huffman_decode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_huffman_empty() {
        assert!(encode(b"").is_empty());
        assert_eq!(huffman_encoded_len(b""), 0);
        assert!(huffman_decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_huffman_padding_too_long() {
        assert_eq!(huffman_decode(&[0xff]), Err(HpackError::HuffmanPadding));
    }

    #[test]
    fn test_huffman_padding_not_eos_prefix() {
        // 'a' (00011) followed by zero padding
        assert_eq!(huffman_decode(&[0x18]), Err(HpackError::HuffmanPadding));
        // Same symbol with correct padding
        assert_eq!(huffman_decode(&[0x1f]).unwrap(), b"a");
    }

    #[test]
    fn test_huffman_rejects_eos_symbol() {
        assert_eq!(
            huffman_decode(&[0xff, 0xff, 0xff, 0xff]),
            Err(HpackError::InvalidHuffmanCode)
        );
    }

    #[test]
    fn test_huffman_encoded_len_is_smaller_for_text() {
        assert!(huffman_encoded_len(b"www.example.com") < b"www.example.com".len());
        // 'X' has an 8-bit code: no savings
        assert_eq!(huffman_encoded_len(b"XXXX"), 4);
    }
}
