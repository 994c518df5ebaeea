use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

use super::identifiers;

/// `APP1 "http://ns.adobe.com/xap/1.0/"`: the base XMP packet, stored
/// as the raw UTF-8 XMP packet string (xpacket wrapper included, as it
/// appears on the wire).
#[derive(Debug, Clone, Default)]
pub struct XmpApp1 {
    pub packet: String,
}

impl XmpApp1 {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::APP1,
        identifier: Some(identifiers::XMP),
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        length: SegmentLength,
    ) -> Result<()> {
        let bytes = reader.read_exact(length.remaining() as usize)?;
        self.packet = String::from_utf8(bytes).map_err(|e| Error::ShapeMismatch {
            reason: format!("XMP packet is not valid UTF-8: {e}"),
        })?;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let total = self.packet.len();
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        writer.write_bytes(self.packet.as_bytes())?;
        Ok(())
    }
}
