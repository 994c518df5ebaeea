use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

use super::identifiers;

const FORMAT_JPEG: u8 = 0x10;
const FORMAT_PALETTIZED: u8 = 0x11;
const FORMAT_RGB: u8 = 0x13;

/// The three mutually-exclusive thumbnail encodings a JFXX segment can
/// carry, modeled as a tagged enum so an invalid combination (e.g. a
/// palette with no indices, or two payloads set at once) is
/// unrepresentable.
#[derive(Debug, Clone)]
pub enum JfxxThumbnail {
    /// A complete nested baseline JPEG stream (SOI..EOI included).
    Jpeg(Vec<u8>),
    Palettized {
        width: u8,
        height: u8,
        palette: Box<[u8; 768]>,
        indices: Vec<u8>,
    },
    Rgb {
        width: u8,
        height: u8,
        data: Vec<u8>,
    },
}

/// The `APP0 "JFXX"` segment: an alternate-format thumbnail.
#[derive(Debug, Clone)]
pub struct JfxxApp0 {
    pub thumbnail: JfxxThumbnail,
}

impl JfxxApp0 {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::APP0,
        identifier: Some(identifiers::JFXX),
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        mut length: SegmentLength,
    ) -> Result<()> {
        let format = reader.read_u8()?;
        length = length.sub1()?;

        self.thumbnail = match format {
            FORMAT_JPEG => {
                let mut bytes = Vec::new();
                let lead = reader.read_exact(2)?;
                length = length.sub(2)?;
                bytes.extend_from_slice(&lead);
                let result = reader.scan(&mut bytes, |p, c| p == 0xFF && c == markers::EOI)?;
                bytes.extend_from_slice(&[0xFF, markers::EOI]);
                length = length.sub(result.bytes_read as u16)?;
                if result.is_positive_match {
                    length = length.sub(2)?; // the 0xFF EOI itself
                }
                // Any remaining declared bytes are trailing padding.
                reader.skip(length.remaining() as usize)?;
                JfxxThumbnail::Jpeg(bytes)
            }
            FORMAT_PALETTIZED => {
                let width = reader.read_u8()?;
                length = length.sub1()?;
                let height = reader.read_u8()?;
                length = length.sub1()?;
                let palette_bytes = reader.read_exact(768)?;
                length = length.sub(768)?;
                let mut palette = Box::new([0u8; 768]);
                palette.copy_from_slice(&palette_bytes);
                let count = width as usize * height as usize;
                let indices = reader.read_exact(count)?;
                length.sub(count as u16)?;
                JfxxThumbnail::Palettized {
                    width,
                    height,
                    palette,
                    indices,
                }
            }
            FORMAT_RGB => {
                let width = reader.read_u8()?;
                length = length.sub1()?;
                let height = reader.read_u8()?;
                length = length.sub1()?;
                let count = 3 * width as usize * height as usize;
                let data = reader.read_exact(count)?;
                length.sub(count as u16)?;
                JfxxThumbnail::Rgb {
                    width,
                    height,
                    data,
                }
            }
            other => {
                return Err(Error::UnrecognizedVariant {
                    context: "JFXX thumbnail format".to_string(),
                    value: other,
                })
            }
        };
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let total = match &self.thumbnail {
            JfxxThumbnail::Jpeg(bytes) => 1 + bytes.len(),
            JfxxThumbnail::Palettized { indices, width, height, .. } => {
                let expected = *width as usize * *height as usize;
                if indices.len() != expected {
                    return Err(Error::ShapeMismatch {
                        reason: format!(
                            "JFXX palettized thumbnail is {width}x{height} but carries {} index bytes",
                            indices.len()
                        ),
                    });
                }
                1 + 2 + 768 + indices.len()
            }
            JfxxThumbnail::Rgb { data, width, height } => {
                let expected = 3 * *width as usize * *height as usize;
                if data.len() != expected {
                    return Err(Error::ShapeMismatch {
                        reason: format!(
                            "JFXX RGB thumbnail is {width}x{height} but carries {} bytes",
                            data.len()
                        ),
                    });
                }
                1 + 2 + data.len()
            }
        };
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        match &self.thumbnail {
            JfxxThumbnail::Jpeg(bytes) => {
                writer.write_u8(FORMAT_JPEG)?;
                writer.write_bytes(bytes)?;
            }
            JfxxThumbnail::Palettized {
                width,
                height,
                palette,
                indices,
            } => {
                writer.write_u8(FORMAT_PALETTIZED)?;
                writer.write_u8(*width)?;
                writer.write_u8(*height)?;
                writer.write_bytes(palette.as_ref())?;
                writer.write_bytes(indices)?;
            }
            JfxxThumbnail::Rgb { width, height, data } => {
                writer.write_u8(FORMAT_RGB)?;
                writer.write_u8(*width)?;
                writer.write_u8(*height)?;
                writer.write_bytes(data)?;
            }
        }
        Ok(())
    }
}
