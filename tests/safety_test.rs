//! Safety tests: the bounds and limits that protect a caller handing
//! this crate an untrusted byte stream from under/over-reads and
//! implausible allocation requests.

use std::io::Cursor;

use jfif_segments::config::{MAX_EXTENDED_XMP_FULL_LENGTH, MAX_EXTENDED_XMP_PORTION_UTF8_BYTES};
use jfif_segments::{
    deserialize_xmp, ExtendedXmpApp1, JfifMetadata, Segment, SegmentLength, XmpCodecOptions,
};

#[test]
fn extended_xmp_full_length_limit_is_reasonable() {
    // Comfortably covers any real XMP document while staying well
    // short of a DOS-sized allocation.
    assert!(MAX_EXTENDED_XMP_FULL_LENGTH > 10 * 1024 * 1024);
    assert!(MAX_EXTENDED_XMP_FULL_LENGTH < 1024 * 1024 * 1024);
}

#[test]
fn oversized_full_length_is_rejected_before_allocation() {
    let mut metadata = JfifMetadata::new();
    metadata.push(Segment::Soi);
    metadata.push(Segment::XmpApp1(jfif_segments::segments::XmpApp1 {
        packet: "<?xpacket begin=\"\" id=\"W5M0\"?><x:xmpmeta/><?xpacket end=\"w\"?>".to_string(),
    }));
    metadata.push(Segment::ExtendedXmpApp1(ExtendedXmpApp1 {
        full_md5_fingerprint: "0".repeat(32),
        full_length: MAX_EXTENDED_XMP_FULL_LENGTH + 1,
        starting_offset: 0,
        portion: vec![1, 2, 3],
    }));
    metadata.push(Segment::Eoi);

    let err = deserialize_xmp(&metadata, XmpCodecOptions::default());
    assert!(err.is_err(), "an implausible full_length must be rejected, not allocated");

    let lenient = XmpCodecOptions::default().with_throw_on_invalid_samples(false);
    let result = deserialize_xmp(&metadata, lenient).unwrap();
    assert_eq!(
        result.as_deref(),
        Some("<x:xmpmeta/>"),
        "lenient mode drops the oversized group but keeps the base packet"
    );
}

#[test]
fn segment_length_cannot_be_overdrawn() {
    // A declared length of 4 permits reading 2 bytes of body; a third
    // byte must fail rather than silently reading past the segment.
    let length = SegmentLength::from_total(0xE0, 4).unwrap();
    assert_eq!(length.remaining(), 2);
    assert!(length.sub(2).is_ok());
    let length = SegmentLength::from_total(0xE0, 4).unwrap();
    assert!(length.sub(3).is_err());
}

#[test]
fn segment_length_below_minimum_is_rejected() {
    // The on-wire length field includes its own two bytes, so any
    // declared total below 2 is structurally impossible.
    assert!(SegmentLength::new(0xE0, 1, 0).is_err());
    assert!(SegmentLength::new(0xE0, 0, 0).is_err());
}

#[test]
fn oversized_body_is_rejected_rather_than_truncated() {
    use jfif_segments::segments::GenericSegment;

    let mut segment = GenericSegment::new(0xEF, None);
    segment.body = vec![0u8; 70_000];
    assert!(
        segment.validate_and_compute_body_length().is_err(),
        "a body that can't fit the 16-bit length field must fail serialization, not wrap"
    );
}

#[test]
fn extended_xmp_portion_cap_keeps_every_chunk_under_the_segment_limit() {
    let options = XmpCodecOptions::default();
    assert!(options.max_portion_utf8_bytes as usize <= MAX_EXTENDED_XMP_PORTION_UTF8_BYTES);
    // Every portion plus its fixed-size header (32-hex fingerprint + 8
    // bytes of full_length/starting_offset + identifier + NUL) must fit
    // the 16-bit on-wire length field.
    let header_overhead = 32 + 8 + "http://ns.adobe.com/xmp/extension/".len() + 1 + 2;
    assert!(options.max_portion_utf8_bytes as usize + header_overhead <= 0xFFFF);
}

#[test]
fn probing_an_empty_stream_does_not_error() {
    let mut reader = jfif_segments::JfifReader::new(Cursor::new(Vec::<u8>::new()));
    assert!(!reader.probe_for_start_of_image().unwrap());
}
