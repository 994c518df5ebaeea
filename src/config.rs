//! Configuration surface for the EXIF and XMP codecs, in the builder-
//! struct idiom the teacher uses for its own `Updates`/processing
//! options types.

/// The on-wire maximum an `APP1 "Exif"` segment's length field allows:
/// `0xFFFF` total, minus the 2 length bytes, minus the 6-byte `"Exif\0"`
/// identifier-plus-NUL-plus-pad-byte overhead.
pub const MAX_EXIF_BYTES_PER_SEGMENT: usize = 0xFFFF - 2 - 6;

/// `0xFFFF` total, minus the 2 length bytes, minus the
/// `"http://ns.adobe.com/xap/1.0/"` identifier (28 bytes) plus its NUL,
/// minus a 2-byte conservative alignment pad — 65502 bytes, matching
/// the Adobe XMP specification's stated maximum base-packet size.
pub const MAX_BASE_XMP_UTF8_BYTES: usize = 0xFFFF - 2 - (28 + 1) - 2;

/// `0xFFFF` total, minus the 2 length bytes, minus the
/// `"http://ns.adobe.com/xmp/extension/"` identifier (35 bytes) plus its
/// NUL, minus the 32-byte hex fingerprint, minus the 8 bytes of
/// `full_length`/`starting_offset`, minus a 2-byte alignment pad.
pub const MAX_EXTENDED_XMP_PORTION_UTF8_BYTES: usize = 0xFFFF - 2 - (35 + 1) - 32 - 8 - 2;

/// Upper bound on a reassembled Extended-XMP document's declared
/// `full_length`, checked before allocating the reassembly buffer. A
/// segment's own on-wire length is capped at 65535 bytes, but
/// `full_length` is a logical total across many portions and isn't
/// bounded by that — an attacker can claim a multi-gigabyte total in a
/// single portion's header. 100 MB comfortably covers any real XMP
/// document while refusing to allocate on an implausible claim.
pub const MAX_EXTENDED_XMP_FULL_LENGTH: u32 = 100 * 1024 * 1024;

/// Options controlling EXIF serialization.
#[derive(Debug, Clone, Copy)]
pub struct ExifCodecOptions {
    pub max_bytes_per_segment: u16,
}

impl Default for ExifCodecOptions {
    fn default() -> Self {
        Self {
            max_bytes_per_segment: MAX_EXIF_BYTES_PER_SEGMENT as u16,
        }
    }
}

impl ExifCodecOptions {
    pub fn with_max_bytes_per_segment(mut self, max: u16) -> Self {
        self.max_bytes_per_segment = max;
        self
    }
}

/// Options controlling XMP / Extended-XMP serialization and
/// deserialization.
#[derive(Debug, Clone, Copy)]
pub struct XmpCodecOptions {
    pub max_base_utf8_bytes: u16,
    pub max_portion_utf8_bytes: u16,
    pub throw_on_invalid_samples: bool,
}

impl Default for XmpCodecOptions {
    fn default() -> Self {
        Self {
            max_base_utf8_bytes: MAX_BASE_XMP_UTF8_BYTES as u16,
            max_portion_utf8_bytes: MAX_EXTENDED_XMP_PORTION_UTF8_BYTES as u16,
            throw_on_invalid_samples: true,
        }
    }
}

impl XmpCodecOptions {
    pub fn with_max_base_utf8_bytes(mut self, max: u16) -> Self {
        self.max_base_utf8_bytes = max;
        self
    }

    pub fn with_max_portion_utf8_bytes(mut self, max: u16) -> Self {
        self.max_portion_utf8_bytes = max;
        self
    }

    pub fn with_throw_on_invalid_samples(mut self, throw: bool) -> Self {
        self.throw_on_invalid_samples = throw;
        self
    }
}
