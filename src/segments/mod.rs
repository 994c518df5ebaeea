//! Concrete JFIF segment types and the tagged `Segment` enum used to
//! dispatch between them.
//!
//! A class hierarchy of segment types would need downcasting to reach
//! type-specific fields; a flat enum gets exhaustive `match` dispatch
//! for free and keeps every concrete type's fields directly reachable.

mod app0_jfif;
mod app0_jfxx;
mod app1_exif;
mod app1_extended_xmp;
mod app1_xmp;
mod generic;
mod sos;

pub use app0_jfif::JfifApp0;
pub use app0_jfxx::{JfxxApp0, JfxxThumbnail};
pub use app1_exif::ExifApp1;
pub use app1_extended_xmp::ExtendedXmpApp1;
pub use app1_xmp::XmpApp1;
pub use generic::GenericSegment;
pub use sos::{SosComponent, SosSegment};

pub use crate::markers;

use std::io::Read;

use crate::error::Result;
use crate::io::JfifReader;
use crate::key::{SegmentKey, SegmentKeyTemplate};
use crate::length::SegmentLength;

/// Well-known APP0/APP1 identifiers.
pub mod identifiers {
    pub const JFIF: &str = "JFIF";
    pub const JFXX: &str = "JFXX";
    pub const EXIF: &str = "Exif";
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    pub const EXTENDED_XMP: &str = "http://ns.adobe.com/xmp/extension/";
}

/// A single JFIF marker segment, tagged by concrete variant.
#[derive(Debug, Clone)]
pub enum Segment {
    Soi,
    Eoi,
    JfifApp0(JfifApp0),
    JfxxApp0(JfxxApp0),
    ExifApp1(ExifApp1),
    XmpApp1(XmpApp1),
    ExtendedXmpApp1(ExtendedXmpApp1),
    Sos(SosSegment),
    Generic(GenericSegment),
}

impl Segment {
    pub fn key(&self) -> SegmentKey {
        match self {
            Segment::Soi => SOI_TEMPLATE.key(),
            Segment::Eoi => EOI_TEMPLATE.key(),
            Segment::JfifApp0(_) => JfifApp0::TEMPLATE.key(),
            Segment::JfxxApp0(_) => JfxxApp0::TEMPLATE.key(),
            Segment::ExifApp1(_) => ExifApp1::TEMPLATE.key(),
            Segment::XmpApp1(_) => XmpApp1::TEMPLATE.key(),
            Segment::ExtendedXmpApp1(_) => ExtendedXmpApp1::TEMPLATE.key(),
            Segment::Sos(_) => SosSegment::TEMPLATE.key(),
            Segment::Generic(g) => SegmentKey::new(g.marker, g.identifier.clone()),
        }
    }

    pub fn has_length(&self) -> bool {
        !matches!(self, Segment::Soi | Segment::Eoi)
    }

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        length: SegmentLength,
    ) -> Result<()> {
        match self {
            Segment::Soi | Segment::Eoi => Ok(()),
            Segment::JfifApp0(s) => s.read_body(reader, length),
            Segment::JfxxApp0(s) => s.read_body(reader, length),
            Segment::ExifApp1(s) => s.read_body(reader, length),
            Segment::XmpApp1(s) => s.read_body(reader, length),
            Segment::ExtendedXmpApp1(s) => s.read_body(reader, length),
            Segment::Sos(s) => s.read_body(reader, length),
            Segment::Generic(s) => s.read_body(reader, length),
        }
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        match self {
            Segment::Soi | Segment::Eoi => Ok(0),
            Segment::JfifApp0(s) => s.validate_and_compute_body_length(),
            Segment::JfxxApp0(s) => s.validate_and_compute_body_length(),
            Segment::ExifApp1(s) => s.validate_and_compute_body_length(),
            Segment::XmpApp1(s) => s.validate_and_compute_body_length(),
            Segment::ExtendedXmpApp1(s) => s.validate_and_compute_body_length(),
            Segment::Sos(s) => s.validate_and_compute_body_length(),
            Segment::Generic(s) => s.validate_and_compute_body_length(),
        }
    }

    pub fn write_body<W: std::io::Write>(&self, writer: &mut crate::io::JfifWriter<W>) -> Result<()> {
        match self {
            Segment::Soi | Segment::Eoi => Ok(()),
            Segment::JfifApp0(s) => s.write_body(writer),
            Segment::JfxxApp0(s) => s.write_body(writer),
            Segment::ExifApp1(s) => s.write_body(writer),
            Segment::XmpApp1(s) => s.write_body(writer),
            Segment::ExtendedXmpApp1(s) => s.write_body(writer),
            Segment::Sos(s) => s.write_body(writer),
            Segment::Generic(s) => s.write_body(writer),
        }
    }

    /// Writes the out-of-band entropy-coded payload, if any. Only
    /// `Sos` carries one; every other variant is a no-op.
    pub fn write_out_of_band<W: std::io::Write>(
        &self,
        writer: &mut crate::io::JfifWriter<W>,
    ) -> Result<()> {
        if let Segment::Sos(s) = self {
            writer.write_bytes(&s.payload)?;
        }
        Ok(())
    }
}

pub(crate) const SOI_TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
    marker: markers::SOI,
    identifier: None,
    has_length: false,
};

pub(crate) const EOI_TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
    marker: markers::EOI,
    identifier: None,
    has_length: false,
};
