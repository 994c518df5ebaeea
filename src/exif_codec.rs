//! Splits and joins an EXIF TIFF buffer across one or more `APP1
//! "Exif"` segments.

use crate::config::ExifCodecOptions;
use crate::key::SegmentKey;
use crate::metadata::JfifMetadata;
use crate::segments::{ExifApp1, JfifApp0, JfxxApp0, Segment};

fn exif_key() -> SegmentKey {
    ExifApp1::TEMPLATE.key()
}

/// Concatenates the payloads of every (non-empty) `APP1 "Exif"` segment
/// in order. Returns `None` if no such segment exists.
pub fn deserialize_exif(metadata: &JfifMetadata) -> Option<Vec<u8>> {
    let key = exif_key();
    let mut bytes = Vec::new();
    let mut found = false;
    for segment in metadata.find_all(&key) {
        if let Segment::ExifApp1(exif) = segment {
            if !exif.payload.is_empty() {
                found = true;
                bytes.extend_from_slice(&exif.payload);
            }
        }
    }
    if found {
        Some(bytes)
    } else {
        None
    }
}

/// Splits `exif` across one or more `APP1 "Exif"` segments, reusing
/// existing segments where the positions line up and removing any
/// surplus ones left over from a previous, longer buffer.
pub fn serialize_exif(metadata: &mut JfifMetadata, exif: &[u8], options: ExifCodecOptions) {
    let key = exif_key();
    if exif.is_empty() {
        metadata.remove_all(&key);
        return;
    }

    let max = options.max_bytes_per_segment.max(1) as usize;
    let chunks: Vec<&[u8]> = exif.chunks(max).collect();

    let anchor_keys = [JfifApp0::TEMPLATE.key(), JfxxApp0::TEMPLATE.key()];

    let mut last_index = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let index = if i == 0 {
            let (index, _created) =
                metadata.get_or_create(&key, true, &anchor_keys, || {
                    Segment::ExifApp1(ExifApp1::default())
                });
            index
        } else {
            let after = last_index.expect("first chunk always sets last_index") + 1;
            match metadata.segments().get(after) {
                Some(segment) if segment.key() == key => after,
                _ => {
                    metadata
                        .segments_mut()
                        .insert(after, Segment::ExifApp1(ExifApp1::default()));
                    after
                }
            }
        };
        if let Segment::ExifApp1(exif_segment) = &mut metadata.segments_mut()[index] {
            exif_segment.payload = chunk.to_vec();
        }
        last_index = Some(index);
    }

    // Remove any leftover `APP1 "Exif"` segments immediately after the
    // last chunk we just wrote — they belonged to a longer buffer
    // written previously.
    let mut trailing = last_index.expect("exif is non-empty") + 1;
    while let Some(segment) = metadata.segments().get(trailing) {
        if segment.key() == key {
            metadata.segments_mut().remove(trailing);
        } else {
            break;
        }
    }
}
