use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::io::{JfifReader, JfifWriter};
use crate::key::SegmentKeyTemplate;
use crate::length::SegmentLength;
use crate::markers;

/// One component reference inside an SOS header: a component id and its
/// packed DC/AC Huffman table indices (high nibble DC, low nibble AC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosComponent {
    pub component_id: u8,
    pub dc_ac_table: u8,
}

/// Start-of-Scan: the header that precedes entropy-coded data, plus the
/// entropy-coded payload itself (the "out-of-band" bytes that follow
/// until the next real marker).
#[derive(Debug, Clone)]
pub struct SosSegment {
    pub components: Vec<SosComponent>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approximation: u8,
    /// The entropy-coded payload, retained in its stuffed on-wire form:
    /// literal `0xFF` bytes still appear as `0xFF 0x00`, and `0xFF RSTn`
    /// restart markers are kept in place. Written back unmodified.
    pub payload: Vec<u8>,
}

impl Default for SosSegment {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            spectral_start: 0,
            spectral_end: 63,
            approximation: 0,
            payload: Vec::new(),
        }
    }
}

impl SosSegment {
    pub const TEMPLATE: SegmentKeyTemplate = SegmentKeyTemplate {
        marker: markers::SOS,
        identifier: None,
        has_length: true,
    };

    pub fn read_body<R: Read>(
        &mut self,
        reader: &mut JfifReader<R>,
        mut length: SegmentLength,
    ) -> Result<()> {
        let component_count = reader.read_u8()?;
        length = length.sub1()?;
        self.components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let component_id = reader.read_u8()?;
            length = length.sub1()?;
            let dc_ac_table = reader.read_u8()?;
            length = length.sub1()?;
            self.components.push(SosComponent {
                component_id,
                dc_ac_table,
            });
        }
        self.spectral_start = reader.read_u8()?;
        length = length.sub1()?;
        self.spectral_end = reader.read_u8()?;
        length = length.sub1()?;
        self.approximation = reader.read_u8()?;
        length = length.sub1()?;

        // Any bytes still inside the declared segment length beyond the
        // fields above are padding; skip them before the out-of-band scan.
        reader.skip(length.remaining() as usize)?;

        // Marker-escape scan: copy entropy-coded bytes verbatim (stuffed
        // `0xFF 0x00` and restart markers included) until a `0xFF` is
        // found that is followed by a real marker byte. That `0xFF` is
        // un-read so the next `read_one` call sees it as its own marker
        // indicator.
        let mut payload = Vec::new();
        loop {
            if !reader.ensure_buffered(1)? {
                break;
            }
            let byte = reader.read_u8()?;
            if byte == 0xFF {
                if reader.ensure_buffered(1)? {
                    let next = reader.peek_bytes(1)[0];
                    if next == 0x00 {
                        reader.skip(1)?;
                        payload.push(0xFF);
                        payload.push(0x00);
                        continue;
                    }
                    if markers::is_restart_marker(next) {
                        reader.skip(1)?;
                        payload.push(0xFF);
                        payload.push(next);
                        continue;
                    }
                }
                reader.unread_one(0xFF);
                break;
            }
            payload.push(byte);
        }
        self.payload = payload;
        Ok(())
    }

    pub fn validate_and_compute_body_length(&self) -> Result<u16> {
        let mut prev: Option<u8> = None;
        for &byte in &self.payload {
            if let Some(0xFF) = prev {
                if byte != 0x00 && !markers::is_restart_marker(byte) {
                    return Err(Error::ShapeMismatch {
                        reason: format!(
                            "SOS payload contains an unescaped 0xFF followed by 0x{byte:02x}, which would collide with marker framing on write"
                        ),
                    });
                }
            }
            prev = Some(byte);
        }
        let total = 1 + 2 * self.components.len() + 3;
        u16::try_from(total).map_err(|_| Error::OversizedSegment { total })
    }

    pub fn write_body<W: Write>(&self, writer: &mut JfifWriter<W>) -> Result<()> {
        let count = u8::try_from(self.components.len()).map_err(|_| Error::ShapeMismatch {
            reason: format!("SOS has {} components, which exceeds u8", self.components.len()),
        })?;
        writer.write_u8(count)?;
        for component in &self.components {
            writer.write_u8(component.component_id)?;
            writer.write_u8(component.dc_ac_table)?;
        }
        writer.write_u8(self.spectral_start)?;
        writer.write_u8(self.spectral_end)?;
        writer.write_u8(self.approximation)?;
        Ok(())
    }
}
