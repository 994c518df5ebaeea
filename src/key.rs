//! Segment keys: the (marker, optional identifier) pair that namespaces
//! markers such as APP0/APP1 that carry more than one conventional use.

use std::fmt;

/// Identifies a segment's marker and, where relevant, the ASCII
/// identifier string carried at the start of its body (e.g. `"JFIF"`,
/// `"Exif"`, `"http://ns.adobe.com/xap/1.0/"`, NUL-terminated on the
/// wire but stored here without the terminator).
///
/// Two keys are equal iff both fields are equal. A key with no
/// identifier matches only segments that likewise carry no identifier
/// — it is never treated as a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub marker: u8,
    pub identifier: Option<String>,
}

impl SegmentKey {
    pub fn new(marker: u8, identifier: Option<impl Into<String>>) -> Self {
        Self {
            marker,
            identifier: identifier.map(Into::into),
        }
    }

    pub fn no_identifier(marker: u8) -> Self {
        Self {
            marker,
            identifier: None,
        }
    }

    pub fn with_identifier(marker: u8, identifier: impl Into<String>) -> Self {
        Self {
            marker,
            identifier: Some(identifier.into()),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "0x{:02x}:{}", self.marker, id),
            None => write!(f, "0x{:02x}", self.marker),
        }
    }
}

/// Compile-time descriptor a concrete segment type associates itself
/// with, declaring both its key and whether it carries a length field
/// on the wire. SOI/EOI have `has_length = false`; everything else in
/// this crate has `has_length = true`.
#[derive(Debug, Clone, Copy)]
pub struct SegmentKeyTemplate {
    pub marker: u8,
    pub identifier: Option<&'static str>,
    pub has_length: bool,
}

impl SegmentKeyTemplate {
    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            marker: self.marker,
            identifier: self.identifier.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_with_different_identifiers_are_distinct() {
        let a = SegmentKey::with_identifier(0xE1, "Exif");
        let b = SegmentKey::with_identifier(0xE1, "http://ns.adobe.com/xap/1.0/");
        assert_ne!(a, b);
    }

    #[test]
    fn no_identifier_key_does_not_match_identifier_key() {
        let a = SegmentKey::no_identifier(0xE0);
        let b = SegmentKey::with_identifier(0xE0, "JFIF");
        assert_ne!(a, b);
    }
}
