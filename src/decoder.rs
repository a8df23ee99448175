//! HPACK decoder (RFC 7541).

use bytes::Bytes;

use crate::dynamic_table::{DynamicTable, DEFAULT_HEADER_TABLE_SIZE, MAX_HEADER_TABLE_SIZE};
use crate::encoder::MAX_HEADER_LIST_SIZE;
use crate::error::{HpackError, Result};
use crate::header::{HeaderField, Headers};
use crate::representation::{NameRef, Representation};
use crate::settings::HpackSettings;
use crate::static_table::{get_static_entry, STATIC_TABLE_LEN};

/// SETTINGS_MAX_HEADER_LIST_SIZE the decoder enforces unless told otherwise.
pub const DEFAULT_HEADER_LIST_SIZE: u64 = 8192;

/// State of the header block currently being decoded. A block may span
/// several `decode` calls and ends with the call that has `end_of_headers`.
#[derive(Debug, Default)]
struct BlockState {
    list_size: u64,
    fields_seen: bool,
}

/// HPACK decoder. One per connection direction; calls must follow wire order.
#[derive(Debug)]
pub struct Decoder {
    dynamic_table: DynamicTable,
    /// Our SETTINGS_HEADER_TABLE_SIZE: the most the peer may ask for.
    max_dynamic_table_size: u64,
    /// Capacity the peer's encoder last announced.
    encoder_max_dynamic_table_size: u64,
    /// Set when our limit dropped below what the peer's encoder uses; the
    /// next block has to open with a size update.
    size_update_required: bool,
    max_header_list_size: u64,
    block: BlockState,
}

impl Decoder {
    /// Create a decoder enforcing `max_header_list_size`, clamped to
    /// [`MAX_HEADER_LIST_SIZE`].
    pub fn new(max_header_list_size: u64) -> Self {
        Self {
            dynamic_table: DynamicTable::new(DEFAULT_HEADER_TABLE_SIZE),
            max_dynamic_table_size: DEFAULT_HEADER_TABLE_SIZE,
            encoder_max_dynamic_table_size: DEFAULT_HEADER_TABLE_SIZE,
            size_update_required: false,
            max_header_list_size: max_header_list_size.min(MAX_HEADER_LIST_SIZE),
            block: BlockState::default(),
        }
    }

    /// Create a decoder from the settings this endpoint advertises.
    pub fn with_settings(settings: &HpackSettings) -> Self {
        let mut decoder = Self::new(
            settings
                .max_header_list_size
                .map_or(DEFAULT_HEADER_LIST_SIZE, u64::from),
        );
        decoder.apply_max_header_table_size(u64::from(settings.header_table_size));
        decoder
    }

    /// Decode a header block fragment, appending fields to `out`.
    pub fn decode(
        &mut self,
        stream_id: u32,
        src: &[u8],
        out: &mut Headers,
        end_of_headers: bool,
    ) -> Result<()> {
        self.decode_with_cb(stream_id, src, end_of_headers, |field| out.push(field))
    }

    /// Decode a header block fragment using a callback.
    ///
    /// The callback is invoked for each decoded header field, in order. Once
    /// the block exceeds the header list size limit no more fields are
    /// emitted, but the rest of the input is still decoded so the dynamic
    /// table stays in sync; the error is returned by the call that ends the
    /// block.
    pub fn decode_with_cb<F>(
        &mut self,
        stream_id: u32,
        src: &[u8],
        end_of_headers: bool,
        mut cb: F,
    ) -> Result<()>
    where
        F: FnMut(HeaderField),
    {
        let result = self.decode_fragment(src, &mut cb);
        tracing::trace!(
            stream_id,
            bytes = src.len(),
            list_size = self.block.list_size,
            table_size = self.dynamic_table.size(),
            "decoded header block fragment"
        );

        if result.is_ok() && !end_of_headers {
            return Ok(());
        }

        let block = std::mem::take(&mut self.block);
        result?;

        if block.list_size > self.max_header_list_size {
            tracing::warn!(
                stream_id,
                size = block.list_size,
                limit = self.max_header_list_size,
                "header list exceeds limit"
            );
            return Err(HpackError::HeaderListTooLarge {
                stream_id,
                size: block.list_size,
                limit: self.max_header_list_size,
            });
        }
        Ok(())
    }

    fn decode_fragment<F>(&mut self, src: &[u8], cb: &mut F) -> Result<()>
    where
        F: FnMut(HeaderField),
    {
        let mut pos = 0;

        while pos < src.len() {
            let (repr, consumed) = Representation::decode(&src[pos..])?;
            pos += consumed;

            if self.size_update_required && !matches!(repr, Representation::SizeUpdate(_)) {
                return Err(HpackError::SizeUpdateRequired);
            }

            match repr {
                Representation::SizeUpdate(size) => {
                    if self.block.fields_seen {
                        return Err(HpackError::IllegalSizeUpdate);
                    }
                    self.apply_size_update(size)?;
                }
                Representation::Indexed(index) => {
                    let field = self.get_entry(index)?;
                    self.emit(field, cb);
                }
                Representation::LiteralWithIndexing { name, value } => {
                    let field = HeaderField::new(self.resolve_name(name)?, value);
                    self.dynamic_table.add(field.clone());
                    self.emit(field, cb);
                }
                Representation::LiteralWithoutIndexing { name, value }
                | Representation::LiteralNeverIndexed { name, value } => {
                    let field = HeaderField::new(self.resolve_name(name)?, value);
                    self.emit(field, cb);
                }
            }
        }

        Ok(())
    }

    fn emit<F>(&mut self, field: HeaderField, cb: &mut F)
    where
        F: FnMut(HeaderField),
    {
        self.block.fields_seen = true;
        self.block.list_size = self.block.list_size.saturating_add(field.list_size());
        if self.block.list_size <= self.max_header_list_size {
            cb(field);
        }
    }

    fn apply_size_update(&mut self, size: u64) -> Result<()> {
        if size > self.max_dynamic_table_size {
            return Err(HpackError::InvalidTableSize(size));
        }
        self.encoder_max_dynamic_table_size = size;
        self.size_update_required = false;
        self.dynamic_table.set_capacity(size)?;
        tracing::debug!(size, "peer updated dynamic table size");
        Ok(())
    }

    /// Get an entry from either static or dynamic table by combined index.
    fn get_entry(&self, index: usize) -> Result<HeaderField> {
        if index == 0 {
            return Err(HpackError::InvalidIndex(0));
        }

        if index <= STATIC_TABLE_LEN {
            let (name, value) = get_static_entry(index).ok_or(HpackError::InvalidIndex(index))?;
            Ok(HeaderField::new(
                Bytes::from_static(name),
                Bytes::from_static(value),
            ))
        } else {
            self.dynamic_table
                .get(index - STATIC_TABLE_LEN)
                .cloned()
                .ok_or(HpackError::InvalidIndex(index))
        }
    }

    fn resolve_name(&self, name: NameRef) -> Result<Bytes> {
        match name {
            NameRef::Indexed(index) => Ok(self.get_entry(index)?.name_bytes().clone()),
            NameRef::Literal(name) => Ok(name),
        }
    }

    /// Apply our SETTINGS_HEADER_TABLE_SIZE.
    ///
    /// Lowering it below the capacity the peer's encoder uses shrinks the
    /// table right away and obliges the peer to open its next header block
    /// with a matching size update.
    pub fn set_max_header_table_size(&mut self, size: u64) -> Result<()> {
        if size > MAX_HEADER_TABLE_SIZE {
            return Err(HpackError::InvalidTableSize(size));
        }
        self.apply_max_header_table_size(size);
        Ok(())
    }

    fn apply_max_header_table_size(&mut self, size: u64) {
        self.max_dynamic_table_size = size;
        if size < self.encoder_max_dynamic_table_size {
            self.size_update_required = true;
            self.dynamic_table.resize(size);
        }
        tracing::debug!(
            size,
            size_update_required = self.size_update_required,
            "decoder header table size limit set"
        );
    }

    /// Current dynamic table capacity.
    pub fn max_header_table_size(&self) -> u64 {
        self.dynamic_table.capacity()
    }

    pub fn set_max_header_list_size(&mut self, size: u64) -> Result<()> {
        if size > MAX_HEADER_LIST_SIZE {
            return Err(HpackError::InvalidHeaderListSize(size));
        }
        self.max_header_list_size = size;
        tracing::debug!(size, "decoder header list size limit set");
        Ok(())
    }

    pub fn max_header_list_size(&self) -> u64 {
        self.max_header_list_size
    }

    pub fn dynamic_table(&self) -> &DynamicTable {
        &self.dynamic_table
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_LIST_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(decoder: &mut Decoder, data: &[u8]) -> Result<Headers> {
        let mut headers = Headers::new();
        decoder.decode(1, data, &mut headers, true)?;
        Ok(headers)
    }

    fn literal_with_indexing(name: &[u8], value: &[u8]) -> Vec<u8> {
        let mut data = vec![0x40, name.len() as u8];
        data.extend_from_slice(name);
        data.push(value.len() as u8);
        data.extend_from_slice(value);
        data
    }

    #[test]
    fn test_decode_indexed_header() {
        let mut decoder = Decoder::default();
        let headers = decode(&mut decoder, &[0x82]).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(b":method"), Some(b"GET".as_slice()));
    }

    #[test]
    fn test_decode_literal_inserts_into_table() {
        let mut decoder = Decoder::default();
        let data = literal_with_indexing(b"custom-key", b"custom-header");
        let headers = decode(&mut decoder, &data).unwrap();
        assert_eq!(headers.get(b"custom-key"), Some(b"custom-header".as_slice()));
        assert_eq!(decoder.dynamic_table().size(), 55);

        let headers = decode(&mut decoder, &[0xbe]).unwrap();
        assert_eq!(headers.get(b"custom-key"), Some(b"custom-header".as_slice()));
    }

    #[test]
    fn test_decode_without_indexing_leaves_table() {
        let mut decoder = Decoder::default();
        let mut data = vec![0x04, 0x0c];
        data.extend_from_slice(b"/sample/path");
        let headers = decode(&mut decoder, &data).unwrap();
        assert_eq!(headers.get(b":path"), Some(b"/sample/path".as_slice()));
        assert!(decoder.dynamic_table().is_empty());
    }

    #[test]
    fn test_decode_invalid_index() {
        let mut decoder = Decoder::default();
        assert_eq!(decode(&mut decoder, &[0x80]), Err(HpackError::InvalidIndex(0)));
        assert_eq!(decode(&mut decoder, &[0xbe]), Err(HpackError::InvalidIndex(62)));
        // Literal with a name index past the table
        assert_eq!(
            decode(&mut decoder, &[0x7e, 0x01, b'x']),
            Err(HpackError::InvalidIndex(62))
        );
    }

    #[test]
    fn test_size_update_above_limit() {
        let mut decoder = Decoder::default();
        // 4097 = 31 + 4066 -> 0x3f 0xe2 0x1f
        assert_eq!(
            decode(&mut decoder, &[0x3f, 0xe2, 0x1f]),
            Err(HpackError::InvalidTableSize(4097))
        );
        assert_eq!(decoder.max_header_table_size(), 4096);
    }

    #[test]
    fn test_size_update_after_field_rejected() {
        let mut decoder = Decoder::default();
        assert_eq!(
            decode(&mut decoder, &[0x82, 0x20]),
            Err(HpackError::IllegalSizeUpdate)
        );
        // A fresh block may start with one
        decode(&mut decoder, &[0x20, 0x82]).unwrap();
        assert_eq!(decoder.max_header_table_size(), 0);
    }

    #[test]
    fn test_lowered_limit_requires_size_update() {
        let mut decoder = Decoder::default();
        decode(&mut decoder, &literal_with_indexing(b"a", b"b")).unwrap();

        decoder.set_max_header_table_size(0).unwrap();
        assert_eq!(decoder.max_header_table_size(), 0);
        assert!(decoder.dynamic_table().is_empty());

        assert_eq!(decode(&mut decoder, &[0x82]), Err(HpackError::SizeUpdateRequired));
        let headers = decode(&mut decoder, &[0x20, 0x82]).unwrap();
        assert_eq!(headers.len(), 1);
        decode(&mut decoder, &[0x82]).unwrap();
    }

    #[test]
    fn test_list_size_exceeded_keeps_table_in_sync() {
        let mut decoder = Decoder::new(10);
        let mut data = literal_with_indexing(b"custom-key", b"custom-header");
        data.push(0x82);

        let mut headers = Headers::new();
        let err = decoder.decode(7, &data, &mut headers, true).unwrap_err();
        assert_eq!(
            err,
            HpackError::HeaderListTooLarge {
                stream_id: 7,
                size: 23 + 10,
                limit: 10
            }
        );
        assert!(!err.is_connection_error());
        assert!(headers.is_empty());
        assert_eq!(decoder.dynamic_table().len(), 1);

        // Next block starts fresh and can reference the inserted entry
        decoder.set_max_header_list_size(100).unwrap();
        let headers = decode(&mut decoder, &[0xbe]).unwrap();
        assert_eq!(headers.get(b"custom-key"), Some(b"custom-header".as_slice()));
    }

    #[test]
    fn test_list_size_accumulates_across_fragments() {
        let mut decoder = Decoder::new(12);
        let mut headers = Headers::new();

        // ":method: GET" counts 10
        decoder.decode(3, &[0x82], &mut headers, false).unwrap();
        let err = decoder.decode(3, &[0x82], &mut headers, true).unwrap_err();
        assert_eq!(
            err,
            HpackError::HeaderListTooLarge {
                stream_id: 3,
                size: 20,
                limit: 12
            }
        );
        assert_eq!(headers.len(), 1);

        headers.clear();
        decoder.decode(5, &[0x82], &mut headers, true).unwrap();
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_settings_constructor() {
        let decoder = Decoder::with_settings(&HpackSettings::default());
        assert_eq!(decoder.max_header_list_size(), DEFAULT_HEADER_LIST_SIZE);
        assert_eq!(decoder.max_header_table_size(), 4096);

        let mut decoder = Decoder::with_settings(&HpackSettings::constrained());
        assert_eq!(decoder.max_header_list_size(), 8192);
        assert_eq!(decoder.max_header_table_size(), 0);
        assert_eq!(decode(&mut decoder, &[0x82]), Err(HpackError::SizeUpdateRequired));
    }

    #[test]
    fn test_set_limits_out_of_range() {
        let mut decoder = Decoder::default();
        assert_eq!(
            decoder.set_max_header_table_size(MAX_HEADER_TABLE_SIZE + 1),
            Err(HpackError::InvalidTableSize(MAX_HEADER_TABLE_SIZE + 1))
        );
        assert_eq!(
            decoder.set_max_header_list_size(MAX_HEADER_LIST_SIZE + 1),
            Err(HpackError::InvalidHeaderListSize(MAX_HEADER_LIST_SIZE + 1))
        );
    }
}
