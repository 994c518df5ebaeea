use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKey;
use crate::length::SegmentLength;

/// A segment whose `(marker, identifier)` has no registered type: the
/// opaque body is preserved byte-for-byte so an unknown segment
/// round-trips unchanged.
#[derive(Debug, Clone)]
pub struct GenericSegment {
    pub marker: u8,
    pub identifier: Option<String>,
    pub body: Vec<u8>,
}

impl GenericSegment {
    pub fn new(marker: u8, identifier: Option<String>) -> Self {
        Self {
            marker,
            identifier,
            body: Vec::new(),
        }
    }

    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(self.marker, self.identifier.clone())
    }

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        length: SegmentLength,
    ) -> Result<()> {
        self.body = reader.read_exact(length.remaining() as usize)?;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let total = self.body.len();
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        writer.write_bytes(&self.body)?;
        Ok(())
    }
}
