use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

use super::identifiers;

/// Pixel density unit for the JFIF APP0 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnits {
    Unspecified,
    PixelsPerInch,
    PixelsPerCm,
}

impl DensityUnits {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::PixelsPerInch),
            2 => Ok(Self::PixelsPerCm),
            other => Err(Error::UnrecognizedVariant {
                context: "JFIF density unit".to_string(),
                value: other,
            }),
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::PixelsPerInch => 1,
            Self::PixelsPerCm => 2,
        }
    }
}

/// The primary `APP0 "JFIF"` segment: version, pixel density, and an
/// optional uncompressed RGB thumbnail.
#[derive(Debug, Clone)]
pub struct JfifApp0 {
    pub version_major: u8,
    pub version_minor: u8,
    pub density_units: DensityUnits,
    pub density_x: u16,
    pub density_y: u16,
    pub thumbnail_width: u8,
    pub thumbnail_height: u8,
    pub thumbnail_rgb: Vec<u8>,
}

impl Default for JfifApp0 {
    fn default() -> Self {
        Self {
            version_major: 1,
            version_minor: 2,
            density_units: DensityUnits::Unspecified,
            density_x: 1,
            density_y: 1,
            thumbnail_width: 0,
            thumbnail_height: 0,
            thumbnail_rgb: Vec::new(),
        }
    }
}

impl JfifApp0 {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::APP0,
        identifier: Some(identifiers::JFIF),
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        mut length: SegmentLength,
    ) -> Result<()> {
        self.version_major = reader.read_u8()?;
        length = length.sub1()?;
        self.version_minor = reader.read_u8()?;
        length = length.sub1()?;
        self.density_units = DensityUnits::from_u8(reader.read_u8()?)?;
        length = length.sub1()?;
        self.density_x = reader.read_u16_be()?;
        length = length.sub(2)?;
        self.density_y = reader.read_u16_be()?;
        length = length.sub(2)?;
        self.thumbnail_width = reader.read_u8()?;
        length = length.sub1()?;
        self.thumbnail_height = reader.read_u8()?;
        length = length.sub1()?;
        let thumb_bytes = 3 * self.thumbnail_width as usize * self.thumbnail_height as usize;
        self.thumbnail_rgb = reader.read_exact(thumb_bytes)?;
        length.sub(thumb_bytes as u16)?;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let expected = 3 * self.thumbnail_width as usize * self.thumbnail_height as usize;
        if self.thumbnail_rgb.len() != expected {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "JFIF thumbnail is {}x{} but carries {} RGB bytes (expected {})",
                    self.thumbnail_width,
                    self.thumbnail_height,
                    self.thumbnail_rgb.len(),
                    expected
                ),
            });
        }
        let total = 9 + expected;
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        writer.write_u8(self.version_major)?;
        writer.write_u8(self.version_minor)?;
        writer.write_u8(self.density_units.to_u8())?;
        writer.write_u16_be(self.density_x)?;
        writer.write_u16_be(self.density_y)?;
        writer.write_u8(self.thumbnail_width)?;
        writer.write_u8(self.thumbnail_height)?;
        writer.write_bytes(&self.thumbnail_rgb)?;
        Ok(())
    }
}
