//! Error types for the JFIF segment engine.

use std::io;

/// Result type for JFIF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, validating, or writing JFIF
/// marker-segment streams, or while splitting/joining EXIF and XMP
/// payloads across segments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying byte stream failure. Distinct from every other
    /// variant: an `Io` error is a transport failure, not a malformed
    /// segment.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A byte expected to be the `0xFF` marker indicator was something
    /// else.
    #[error("expected marker indicator 0xFF at offset {offset}, found {found:#04x}")]
    ExpectedMarkerIndicator { offset: u64, found: u8 },

    /// A body reader tried to consume more bytes than the segment's
    /// declared length allowed.
    #[error("segment 0x{marker:02x} requested {requested} bytes but only {remaining} remained")]
    LengthUnderrun {
        marker: u8,
        requested: usize,
        remaining: usize,
    },

    /// Serializing a segment would produce an on-wire length exceeding
    /// `u16::MAX`.
    #[error("segment body of {total} bytes exceeds the 65535-byte length field")]
    OversizedSegment { total: usize },

    /// An enumerated on-wire value fell outside its known set.
    #[error("unrecognized {context}: {value:#04x}")]
    UnrecognizedVariant { context: String, value: u8 },

    /// A segment's internal fields are mutually inconsistent and
    /// cannot be serialized.
    #[error("segment shape mismatch: {reason}")]
    ShapeMismatch { reason: String },

    /// Extended-XMP portions failed to reassemble: non-contiguous
    /// offsets, a length that didn't sum to `full_length`, or an MD5
    /// mismatch against the announced fingerprint.
    #[error("invalid Extended-XMP portions: {reason}")]
    BadExtendedXmp { reason: String },

    /// The XMP document's root element was not a single `x:xmpmeta`
    /// wrapping exactly one `rdf:RDF`.
    #[error("invalid XMP root: {reason}")]
    BadXmpRoot { reason: String },

    /// A segment was looked up by a key whose registered Rust type does
    /// not match the segment actually stored at that position.
    #[error("segment at key {key} does not have the expected concrete type")]
    TypeMismatch { key: String },

    /// XML parsing error surfaced directly from `quick-xml`.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element or attribute name in an XMP document was not valid
    /// UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
