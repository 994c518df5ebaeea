//! File-level read/write: the outer SOI-probe / segment loop / EOI-stop
//! loop that turns a byte stream into one or more [`JfifMetadata`]
//! values, and back.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::Result;
use crate::io::{JfifReader, JfifWriter, NulBehavior};
use crate::markers;
use crate::metadata::JfifMetadata;
use crate::registry::SegmentRegistry;
use crate::segments::Segment;

/// Reads one JFIF stream (`SOI` ... `EOI`) from `reader`. Returns
/// `Ok(None)` without consuming any bytes if the stream doesn't begin
/// with `SOI` (including an empty stream).
pub fn read_one<R: Read>(
    reader: &mut JfifReader<R>,
    registry: &SegmentRegistry,
) -> Result<Option<JfifMetadata>> {
    if !reader.probe_for_start_of_image()? {
        return Ok(None);
    }

    let mut metadata = JfifMetadata::new();
    loop {
        let segment = read_segment(reader, registry)?;
        let is_eoi = matches!(segment, Segment::Eoi);
        metadata.push(segment);
        if is_eoi {
            break;
        }
    }
    Ok(Some(metadata))
}

/// Repeatedly invokes [`read_one`] until it yields `None`, for byte
/// sources that concatenate multiple back-to-back JFIF streams (e.g. a
/// thumbnail or grayscale variant appended after the main image).
pub fn read_all<R: Read>(
    reader: &mut JfifReader<R>,
    registry: &SegmentRegistry,
) -> Result<Vec<JfifMetadata>> {
    let mut all = Vec::new();
    while let Some(metadata) = read_one(reader, registry)? {
        all.push(metadata);
    }
    Ok(all)
}

/// Writes every segment of `metadata`, in order, to `writer`.
pub fn write_one<W: Write>(writer: &mut JfifWriter<W>, metadata: &JfifMetadata) -> Result<()> {
    for segment in metadata.segments() {
        write_segment(writer, segment)?;
    }
    Ok(())
}

fn read_segment<R: Read>(
    reader: &mut JfifReader<R>,
    registry: &SegmentRegistry,
) -> Result<Segment> {
    let offset = reader.position();
    let indicator = reader.read_u8()?;
    if indicator != 0xFF {
        return Err(crate::error::Error::ExpectedMarkerIndicator {
            offset,
            found: indicator,
        });
    }
    // Consecutive 0xFF fill bytes before a marker are legal padding.
    let mut marker = reader.read_u8()?;
    while marker == 0xFF {
        marker = reader.read_u8()?;
    }

    let mut segment = registry.lookup_no_identifier(marker);
    if segment.as_ref().is_some_and(|s| !s.has_length()) {
        return Ok(segment.expect("checked Some above"));
    }

    let total = reader.read_u16_be()?;
    let mut length = crate::length::SegmentLength::from_total(marker, total)?;

    if segment.is_none() && registry.has_identifier(marker) {
        let (identifier, consumed) =
            reader.read_ascii_string(length.remaining() as usize, NulBehavior::Stop)?;
        length = length.sub(consumed as u16)?;
        segment = Some(
            registry
                .lookup_identifier(marker, &identifier)
                .unwrap_or_else(|| {
                    let mut generic = crate::segments::GenericSegment::new(marker, Some(identifier));
                    generic.body = Vec::new();
                    Segment::Generic(generic)
                }),
        );
    }
    let mut segment = segment.unwrap_or_else(|| {
        Segment::Generic(crate::segments::GenericSegment::new(marker, None))
    });

    segment.read_body(reader, length)?;
    Ok(segment)
}

fn write_segment<W: Write>(writer: &mut JfifWriter<W>, segment: &Segment) -> Result<()> {
    if !segment.has_length() {
        writer.write_u8(0xFF)?;
        writer.write_u8(segment_marker(segment))?;
        segment.write_out_of_band(writer)?;
        return Ok(());
    }

    let key = segment.key();
    let body_len = segment.validate_and_compute_body_length()? as usize;
    let identifier_len = key
        .identifier
        .as_ref()
        .map(|id| id.len() + 1)
        .unwrap_or(0);
    let total = 2 + identifier_len + body_len;
    let total_u16 = u16::try_from(total)
        .map_err(|_| crate::error::Error::OversizedSegment { total })?;

    writer.write_u8(0xFF)?;
    writer.write_u8(key.marker)?;
    writer.write_u16_be(total_u16)?;
    if let Some(identifier) = &key.identifier {
        writer.write_ascii_nul(identifier)?;
    }
    segment.write_body(writer)?;
    segment.write_out_of_band(writer)?;
    Ok(())
}

fn segment_marker(segment: &Segment) -> u8 {
    match segment {
        Segment::Soi => markers::SOI,
        Segment::Eoi => markers::EOI,
        _ => segment.key().marker,
    }
}

/// Convenience: read using the shared, frozen default registry.
pub fn read_one_default<R: Read>(reader: &mut JfifReader<R>) -> Result<Option<JfifMetadata>> {
    read_one(reader, &default_registry())
}

pub fn read_all_default<R: Read>(reader: &mut JfifReader<R>) -> Result<Vec<JfifMetadata>> {
    read_all(reader, &default_registry())
}

fn default_registry() -> Arc<SegmentRegistry> {
    SegmentRegistry::default_registry()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn registry() -> Arc<SegmentRegistry> {
        SegmentRegistry::default_registry()
    }

    #[test]
    fn s1_minimal_file_round_trips() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xD9];
        let mut reader = JfifReader::new(Cursor::new(bytes.clone()));
        let metadata = read_one(&mut reader, &registry()).unwrap().unwrap();
        assert_eq!(metadata.len(), 2);
        assert!(matches!(metadata.segments()[0], Segment::Soi));
        assert!(matches!(metadata.segments()[1], Segment::Eoi));

        let mut out = Vec::new();
        {
            let mut writer = JfifWriter::new(&mut out);
            write_one(&mut writer, &metadata).unwrap();
        }
        assert_eq!(out, bytes);
    }

    #[test]
    fn s2_jfif_app0_round_trips() {
        let bytes: Vec<u8> = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x16, b'J', b'F', b'I', b'F', 0x00, 0x07, 0x08, 0x01,
            0x12, 0x34, 0x56, 0x78, 0x01, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF, 0xD9,
        ];
        let mut reader = JfifReader::new(Cursor::new(bytes.clone()));
        let metadata = read_one(&mut reader, &registry()).unwrap().unwrap();
        assert_eq!(metadata.len(), 3);
        match &metadata.segments()[1] {
            Segment::JfifApp0(app0) => {
                assert_eq!(app0.version_major, 7);
                assert_eq!(app0.version_minor, 8);
                assert_eq!(app0.density_x, 0x1234);
                assert_eq!(app0.density_y, 0x5678);
                assert_eq!(app0.thumbnail_width, 1);
                assert_eq!(app0.thumbnail_height, 2);
                assert_eq!(app0.thumbnail_rgb, vec![1, 2, 3, 4, 5, 6]);
            }
            other => panic!("expected JfifApp0, got {other:?}"),
        }

        let mut out = Vec::new();
        {
            let mut writer = JfifWriter::new(&mut out);
            write_one(&mut writer, &metadata).unwrap();
        }
        assert_eq!(out, bytes);
    }

    #[test]
    fn s3_back_to_back_streams_read_independently() {
        let block = |major: u8| -> Vec<u8> {
            vec![
                0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x16, b'J', b'F', b'I', b'F', 0x00, major, 0x08,
                0x01, 0x12, 0x34, 0x56, 0x78, 0x01, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
                0xFF, 0xD9,
            ]
        };
        let mut bytes = block(7);
        bytes.extend(block(1));
        let mut reader = JfifReader::new(Cursor::new(bytes.clone()));

        let all = read_all(&mut reader, &registry()).unwrap();
        assert_eq!(all.len(), 2);

        let mut reader2 = JfifReader::new(Cursor::new(bytes.clone()));
        read_one(&mut reader2, &registry()).unwrap();
        assert_eq!(reader2.position(), (bytes.len() / 2) as u64);
    }

    #[test]
    fn probe_false_on_non_soi_consumes_nothing() {
        let bytes = vec![0x01, 0x02, 0x03];
        let mut reader = JfifReader::new(Cursor::new(bytes));
        assert!(read_one(&mut reader, &registry()).unwrap().is_none());
        assert_eq!(reader.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn unknown_app_segment_round_trips_as_generic() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xEF, 0x00, 0x05, 0x01, 0x02, 0x03, 0xFF, 0xD9];
        let mut reader = JfifReader::new(Cursor::new(bytes.clone()));
        let metadata = read_one(&mut reader, &registry()).unwrap().unwrap();
        assert!(matches!(metadata.segments()[1], Segment::Generic(_)));

        let mut out = Vec::new();
        {
            let mut writer = JfifWriter::new(&mut out);
            write_one(&mut writer, &metadata).unwrap();
        }
        assert_eq!(out, bytes);
    }
}
