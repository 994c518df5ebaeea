use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

use super::identifiers;

const FINGERPRINT_HEX_LEN: usize = 32;

/// `APP1 "http://ns.adobe.com/xmp/extension/"`: one offset-addressed
/// portion of an oversize XMP document, per the Adobe Extended-XMP
/// protocol. `full_md5_fingerprint` is the 32-hex uppercase-ASCII MD5
/// digest shared by every portion of the same extended document.
#[derive(Debug, Clone, Default)]
pub struct ExtendedXmpApp1 {
    pub full_md5_fingerprint: String,
    pub full_length: u32,
    pub starting_offset: u32,
    pub portion: Vec<u8>,
}

impl ExtendedXmpApp1 {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::APP1,
        identifier: Some(identifiers::EXTENDED_XMP),
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        mut length: SegmentLength,
    ) -> Result<()> {
        let hex_bytes = reader.read_exact(FINGERPRINT_HEX_LEN)?;
        length = length.sub(FINGERPRINT_HEX_LEN as u16)?;
        let hex = String::from_utf8(hex_bytes).map_err(|e| Error::ShapeMismatch {
            reason: format!("Extended-XMP fingerprint is not ASCII: {e}"),
        })?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || hex.len() != FINGERPRINT_HEX_LEN {
            return Err(Error::ShapeMismatch {
                reason: format!("Extended-XMP fingerprint {hex:?} is not 32 hex digits"),
            });
        }
        self.full_md5_fingerprint = hex.to_ascii_uppercase();

        self.full_length = reader.read_u32_be()?;
        length = length.sub(4)?;
        self.starting_offset = reader.read_u32_be()?;
        length = length.sub(4)?;
        self.portion = reader.read_exact(length.remaining() as usize)?;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        if self.full_md5_fingerprint.len() != FINGERPRINT_HEX_LEN
            || !self
                .full_md5_fingerprint
                .chars()
                .all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "Extended-XMP fingerprint {:?} is not 32 hex digits",
                    self.full_md5_fingerprint
                ),
            });
        }
        let total = FINGERPRINT_HEX_LEN + 4 + 4 + self.portion.len();
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        writer.write_bytes(self.full_md5_fingerprint.as_bytes())?;
        writer.write_u32_be(self.full_length)?;
        writer.write_u32_be(self.starting_offset)?;
        writer.write_bytes(&self.portion)?;
        Ok(())
    }
}
