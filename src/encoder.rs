//! HPACK encoder (RFC 7541).

use bytes::BytesMut;

use crate::dynamic_table::{DynamicTable, DEFAULT_HEADER_TABLE_SIZE, MAX_HEADER_TABLE_SIZE};
use crate::error::{HpackError, Result};
use crate::header::{HeaderField, Headers, SensitivityDetector};
use crate::representation::{NameRef, Representation};
use crate::settings::HpackSettings;
use crate::static_table::{find_static_entry, find_static_entry_by_name, STATIC_TABLE_LEN};

/// Largest SETTINGS_MAX_HEADER_LIST_SIZE a peer may announce.
pub const MAX_HEADER_LIST_SIZE: u64 = 0xFFFF_FFFF;

/// HPACK encoder. One per connection direction; calls must follow wire order.
#[derive(Debug)]
pub struct Encoder {
    dynamic_table: DynamicTable,
    /// `None` until the peer announces SETTINGS_MAX_HEADER_LIST_SIZE.
    max_header_list_size: Option<u64>,
    use_huffman: bool,
    /// Capacity chosen at construction that the peer has not been told yet.
    pending_size_update: Option<u64>,
}

impl Encoder {
    /// Create a new encoder with the protocol defaults.
    pub fn new() -> Self {
        Self::with_settings(&HpackSettings::default())
    }

    /// Create an encoder from settings.
    ///
    /// A table size other than the protocol default is announced to the peer
    /// at the start of the first header block.
    pub fn with_settings(settings: &HpackSettings) -> Self {
        let capacity = u64::from(settings.header_table_size);
        Self {
            dynamic_table: DynamicTable::new(capacity),
            max_header_list_size: settings.max_header_list_size.map(u64::from),
            use_huffman: settings.use_huffman,
            pending_size_update: (capacity != DEFAULT_HEADER_TABLE_SIZE).then_some(capacity),
        }
    }

    /// Encode a header list, in order, into `dst`.
    ///
    /// Fails with [`HpackError::HeaderListTooLarge`] before writing anything
    /// if a header list size limit is set and the list exceeds it.
    pub fn encode_headers<S>(
        &mut self,
        stream_id: u32,
        dst: &mut BytesMut,
        headers: &Headers,
        sensitivity: &S,
    ) -> Result<()>
    where
        S: SensitivityDetector + ?Sized,
    {
        if let Some(limit) = self.max_header_list_size {
            let size = headers.list_size();
            if size > limit {
                tracing::warn!(stream_id, size, limit, "refusing to encode oversized header list");
                return Err(HpackError::HeaderListTooLarge {
                    stream_id,
                    size,
                    limit,
                });
            }
        }

        let start = dst.len();

        if let Some(size) = self.pending_size_update.take() {
            tracing::debug!(stream_id, size, "announcing dynamic table size");
            Representation::SizeUpdate(size).encode(dst, self.use_huffman);
        }

        for field in headers {
            let repr = self.representation_for(field, sensitivity);
            repr.encode(dst, self.use_huffman);
        }

        tracing::trace!(
            stream_id,
            fields = headers.len(),
            bytes = dst.len() - start,
            table_size = self.dynamic_table.size(),
            "encoded header block"
        );
        Ok(())
    }

    /// Pick the representation for one field, updating the dynamic table
    /// when the field is indexed.
    fn representation_for<S>(&mut self, field: &HeaderField, sensitivity: &S) -> Representation
    where
        S: SensitivityDetector + ?Sized,
    {
        let (name, value) = (field.name(), field.value());

        if sensitivity.is_sensitive(name, value) {
            return Representation::LiteralNeverIndexed {
                name: self.name_ref(field),
                value: field.value_bytes().clone(),
            };
        }

        if let Some(index) = self.find_field(name, value) {
            return Representation::Indexed(index);
        }

        // Resolve the name before inserting shifts the dynamic indices.
        let name = self.name_ref(field);
        self.dynamic_table.add(field.clone());
        Representation::LiteralWithIndexing {
            name,
            value: field.value_bytes().clone(),
        }
    }

    /// Combined index of an exact (name, value) match, static table first.
    fn find_field(&self, name: &[u8], value: &[u8]) -> Option<usize> {
        find_static_entry(name, value).or_else(|| {
            self.dynamic_table
                .find(name, value)
                .map(|idx| STATIC_TABLE_LEN + idx)
        })
    }

    fn name_ref(&self, field: &HeaderField) -> NameRef {
        let name = field.name();
        find_static_entry_by_name(name)
            .or_else(|| {
                self.dynamic_table
                    .find_by_name(name)
                    .map(|idx| STATIC_TABLE_LEN + idx)
            })
            .map(NameRef::Indexed)
            .unwrap_or_else(|| NameRef::Literal(field.name_bytes().clone()))
    }

    /// Change the dynamic table capacity and write the size update that
    /// tells the peer's decoder about it.
    ///
    /// Nothing is written when the size is out of range or unchanged.
    pub fn set_max_header_table_size(&mut self, dst: &mut BytesMut, size: u64) -> Result<()> {
        if size > MAX_HEADER_TABLE_SIZE {
            return Err(HpackError::InvalidTableSize(size));
        }
        if size == self.dynamic_table.capacity() && self.pending_size_update.is_none() {
            return Ok(());
        }

        self.dynamic_table.set_capacity(size)?;
        self.pending_size_update = None;
        Representation::SizeUpdate(size).encode(dst, self.use_huffman);
        tracing::debug!(
            size,
            entries = self.dynamic_table.len(),
            "encoder dynamic table size updated"
        );
        Ok(())
    }

    /// Current dynamic table capacity.
    pub fn max_header_table_size(&self) -> u64 {
        self.dynamic_table.capacity()
    }

    /// Apply the peer's SETTINGS_MAX_HEADER_LIST_SIZE.
    pub fn set_max_header_list_size(&mut self, size: u64) -> Result<()> {
        if size > MAX_HEADER_LIST_SIZE {
            return Err(HpackError::InvalidHeaderListSize(size));
        }
        self.max_header_list_size = Some(size);
        tracing::debug!(size, "encoder header list size limit set");
        Ok(())
    }

    /// Header list size limit, `None` when unlimited.
    pub fn max_header_list_size(&self) -> Option<u64> {
        self.max_header_list_size
    }

    pub fn set_use_huffman(&mut self, use_huffman: bool) {
        self.use_huffman = use_huffman;
    }

    pub fn dynamic_table(&self) -> &DynamicTable {
        &self.dynamic_table
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{AlwaysSensitive, NeverSensitive};

    fn encode(encoder: &mut Encoder, headers: &Headers) -> Vec<u8> {
        let mut dst = BytesMut::new();
        encoder
            .encode_headers(1, &mut dst, headers, &NeverSensitive)
            .unwrap();
        dst.to_vec()
    }

    #[test]
    fn test_encode_static_entry() {
        let mut encoder = Encoder::new();
        let headers: Headers = [(":method", "GET"), (":path", "/")].into_iter().collect();
        assert_eq!(encode(&mut encoder, &headers), [0x82, 0x84]);
        assert!(encoder.dynamic_table().is_empty());
    }

    #[test]
    fn test_encode_static_name_with_indexing() {
        let mut encoder = Encoder::new();
        encoder.set_use_huffman(false);
        let headers: Headers = [(":authority", "www.example.com")].into_iter().collect();
        let encoded = encode(&mut encoder, &headers);

        // RFC 7541 C.3.1: 41 0f www.example.com
        assert_eq!(&encoded[..2], &[0x41, 0x0f]);
        assert_eq!(&encoded[2..], b"www.example.com");
        assert_eq!(encoder.dynamic_table().len(), 1);

        // Second time it is a dynamic table hit at index 62
        assert_eq!(encode(&mut encoder, &headers), [0xbe]);
    }

    #[test]
    fn test_encode_literal_name() {
        let mut encoder = Encoder::new();
        let headers: Headers = [("custom-key", "custom-value")].into_iter().collect();
        let encoded = encode(&mut encoder, &headers);
        assert_eq!(encoded[0], 0x40);
        assert_eq!(encoder.dynamic_table().size(), 32 + 10 + 12);
    }

    #[test]
    fn test_encode_dynamic_name_reference() {
        let mut encoder = Encoder::new();
        encoder.set_use_huffman(false);
        encode(&mut encoder, &[("x-trace", "1")].into_iter().collect());
        let encoded = encode(&mut encoder, &[("x-trace", "2")].into_iter().collect());

        // Name index 62 still fits the 6-bit prefix
        assert_eq!(encoded, [0x40 | 62, 0x01, b'2']);
        assert_eq!(encoder.dynamic_table().len(), 2);
    }

    #[test]
    fn test_sensitive_fields_never_indexed() {
        let mut encoder = Encoder::new();
        encoder.set_use_huffman(false);
        let headers: Headers = [("authorization", "secret")].into_iter().collect();

        for _ in 0..2 {
            let mut dst = BytesMut::new();
            encoder
                .encode_headers(1, &mut dst, &headers, &AlwaysSensitive)
                .unwrap();
            // 0001xxxx with static name index 23 (> 15, so prefix continues)
            assert_eq!(&dst[..3], &[0x1f, 0x08, 0x06]);
            assert_eq!(&dst[3..], b"secret");
        }
        assert!(encoder.dynamic_table().is_empty());
    }

    #[test]
    fn test_list_size_limit_writes_nothing() {
        let mut encoder = Encoder::new();
        encoder.set_max_header_list_size(10).unwrap();

        let mut dst = BytesMut::from(&b"prefix"[..]);
        let headers: Headers = [("custom-key", "custom-value")].into_iter().collect();
        let err = encoder
            .encode_headers(5, &mut dst, &headers, &NeverSensitive)
            .unwrap_err();

        assert_eq!(
            err,
            HpackError::HeaderListTooLarge {
                stream_id: 5,
                size: 22,
                limit: 10
            }
        );
        assert_eq!(&dst[..], b"prefix");
        assert!(encoder.dynamic_table().is_empty());
    }

    #[test]
    fn test_set_max_header_table_size() {
        let mut encoder = Encoder::new();
        let mut dst = BytesMut::new();

        // Unchanged: nothing written
        encoder.set_max_header_table_size(&mut dst, 4096).unwrap();
        assert!(dst.is_empty());

        encoder.set_max_header_table_size(&mut dst, 0).unwrap();
        assert_eq!(&dst[..], &[0x20]);
        assert_eq!(encoder.max_header_table_size(), 0);

        let mut dst = BytesMut::new();
        assert_eq!(
            encoder.set_max_header_table_size(&mut dst, MAX_HEADER_TABLE_SIZE + 1),
            Err(HpackError::InvalidTableSize(MAX_HEADER_TABLE_SIZE + 1))
        );
        assert!(dst.is_empty());
        assert_eq!(encoder.max_header_table_size(), 0);
    }

    #[test]
    fn test_settings_table_size_announced_once() {
        let mut encoder = Encoder::with_settings(&HpackSettings::default().header_table_size(256));
        let headers: Headers = [(":method", "GET")].into_iter().collect();

        // 256 - 31 = 225 continues as 0xe1 0x01
        assert_eq!(encode(&mut encoder, &headers), [0x3f, 0xe1, 0x01, 0x82]);
        assert_eq!(encode(&mut encoder, &headers), [0x82]);
    }

    #[test]
    fn test_set_max_header_list_size_bounds() {
        let mut encoder = Encoder::new();
        assert_eq!(encoder.max_header_list_size(), None);
        encoder.set_max_header_list_size(MAX_HEADER_LIST_SIZE).unwrap();
        assert_eq!(encoder.max_header_list_size(), Some(MAX_HEADER_LIST_SIZE));
        assert_eq!(
            encoder.set_max_header_list_size(MAX_HEADER_LIST_SIZE + 1),
            Err(HpackError::InvalidHeaderListSize(MAX_HEADER_LIST_SIZE + 1))
        );
    }
}
