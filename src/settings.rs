//! Codec configuration mirroring the HPACK-related HTTP/2 SETTINGS.

/// HPACK settings for one side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpackSettings {
    /// SETTINGS_HEADER_TABLE_SIZE: dynamic table capacity in bytes.
    pub header_table_size: u32,
    /// SETTINGS_MAX_HEADER_LIST_SIZE. `None` means unlimited on the encoder
    /// and [`crate::DEFAULT_HEADER_LIST_SIZE`] on the decoder.
    pub max_header_list_size: Option<u32>,
    /// Huffman-code string literals when it makes them shorter.
    pub use_huffman: bool,
}

impl HpackSettings {
    /// Settings for peers that cannot spare memory for a dynamic table.
    pub fn constrained() -> Self {
        Self {
            header_table_size: 0,
            max_header_list_size: Some(8192),
            use_huffman: true,
        }
    }

    pub fn header_table_size(mut self, size: u32) -> Self {
        self.header_table_size = size;
        self
    }

    pub fn max_header_list_size(mut self, size: u32) -> Self {
        self.max_header_list_size = Some(size);
        self
    }

    pub fn use_huffman(mut self, enabled: bool) -> Self {
        self.use_huffman = enabled;
        self
    }
}

impl Default for HpackSettings {
    fn default() -> Self {
        // RFC 9113 initial values
        Self {
            header_table_size: 4096,
            max_header_list_size: None,
            use_huffman: true,
        }
    }
}
