use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

use super::identifiers;

/// `APP1 "Exif"`: one chunk of an EXIF TIFF buffer. The full buffer may
/// be split across several of these segments; see [`crate::exif_codec`].
#[derive(Debug, Clone, Default)]
pub struct ExifApp1 {
    pub payload: Vec<u8>,
}

impl ExifApp1 {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::APP1,
        identifier: Some(identifiers::EXIF),
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        mut length: SegmentLength,
    ) -> Result<()> {
        let pad = reader.read_u8()?;
        length = length.sub1()?;
        if pad != 0 {
            return Err(Error::ShapeMismatch {
                reason: format!("APP1 Exif pad byte must be 0x00, found {pad:#04x}"),
            });
        }
        self.payload = reader.read_exact(length.remaining() as usize)?;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let total = 1 + self.payload.len();
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        writer.write_u8(0)?;
        writer.write_bytes(&self.payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_payload() {
        let seg = ExifApp1 {
            payload: vec![1, 2, 3, 4],
        };
        let body_len = seg.validate_and_compute_body_length().unwrap();
        let mut buf = Vec::new();
        {
            let mut w = JfifWriter::new(&mut buf);
            seg.write_body(&mut w).unwrap();
        }
        let mut parsed = ExifApp1::default();
        let mut r = JfifReader::new(Cursor::new(buf));
        let length = SegmentLength::from_total(markers::APP1, body_len + 2).unwrap();
        parsed.read_body(&mut r, length).unwrap();
        assert_eq!(parsed.payload, seg.payload);
    }

    #[test]
    fn non_zero_pad_byte_fails() {
        let mut seg = ExifApp1::default();
        let mut r = JfifReader::new(Cursor::new(vec![0x01, 0x02]));
        let length = SegmentLength::from_total(markers::APP1, 4).unwrap();
        assert!(seg.read_body(&mut r, length).is_err());
    }
}
