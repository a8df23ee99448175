//! Header fields and the ordered header list the codec reads and fills.

use std::fmt;

use bytes::Bytes;

/// Per-entry overhead added to `len(name) + len(value)` (RFC 7541 Section 4.1).
pub const HEADER_ENTRY_OVERHEAD: usize = 32;

/// A single header field. Names are compared byte-for-byte, case-sensitively.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HeaderField {
    name: Bytes,
    value: Bytes,
}

impl HeaderField {
    /// Create a new header field.
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Get the name.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Get the value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Size of this field as a dynamic table entry.
    ///
    /// Size = 32 + len(name) + len(value)
    pub fn size(&self) -> usize {
        HEADER_ENTRY_OVERHEAD + self.name.len() + self.value.len()
    }

    /// Uncompressed size counted against SETTINGS_MAX_HEADER_LIST_SIZE.
    ///
    /// No per-field overhead is included.
    pub fn list_size(&self) -> u64 {
        (self.name.len() + self.value.len()) as u64
    }

    pub(crate) fn name_bytes(&self) -> &Bytes {
        &self.name
    }

    pub(crate) fn value_bytes(&self) -> &Bytes {
        &self.value
    }
}

impl fmt::Debug for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// Ordered header list. Duplicate names are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header field.
    pub fn add(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.fields.push(HeaderField::new(name, value));
    }

    pub fn push(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Value of the first field with this name.
    pub fn get(&self, name: &[u8]) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .map(HeaderField::value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Sum of `len(name) + len(value)` over all fields.
    pub fn list_size(&self) -> u64 {
        self.fields.iter().map(HeaderField::list_size).sum()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<Bytes>,
    V: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| HeaderField::new(name, value))
                .collect(),
        }
    }
}

/// Decides which header fields must never enter a compression context.
///
/// Sensitive fields are sent as "literal never indexed" so neither this
/// encoder nor any intermediary re-encoding them will put them in a table.
pub trait SensitivityDetector {
    fn is_sensitive(&self, name: &[u8], value: &[u8]) -> bool;
}

/// Treats every field as safe to index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSensitive;

impl SensitivityDetector for NeverSensitive {
    fn is_sensitive(&self, _name: &[u8], _value: &[u8]) -> bool {
        false
    }
}

/// Treats every field as sensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSensitive;

impl SensitivityDetector for AlwaysSensitive {
    fn is_sensitive(&self, _name: &[u8], _value: &[u8]) -> bool {
        true
    }
}

impl<F> SensitivityDetector for F
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    fn is_sensitive(&self, name: &[u8], value: &[u8]) -> bool {
        self(name, value)
    }
}
