//! End-to-end scenarios exercising the public API across the framing
//! layer and both higher-level codecs.

use std::io::Cursor;

use jfif_segments::segments::{markers, ExifApp1, SosComponent, SosSegment};
use jfif_segments::{
    deserialize_exif, deserialize_xmp, file_io, serialize_exif, serialize_xmp, ExifCodecOptions,
    JfifMetadata, JfifReader, JfifWriter, Segment, XmpCodecOptions,
};

fn roundtrip(bytes: &[u8]) -> JfifMetadata {
    let mut reader = JfifReader::new(Cursor::new(bytes.to_vec()));
    let metadata = file_io::read_one_default(&mut reader)
        .unwrap()
        .expect("stream begins with SOI");
    let mut out = Vec::new();
    {
        let mut writer = JfifWriter::new(&mut out);
        file_io::write_one(&mut writer, &metadata).unwrap();
    }
    assert_eq!(out, bytes, "reserialization must be byte-identical");
    metadata
}

/// S1 — minimal file.
#[test]
fn s1_minimal_file() {
    let bytes = [0xFF, 0xD8, 0xFF, 0xD9];
    let metadata = roundtrip(&bytes);
    assert_eq!(metadata.len(), 2);
    assert!(matches!(metadata.segments()[0], Segment::Soi));
    assert!(matches!(metadata.segments()[1], Segment::Eoi));
}

/// S2 — JFIF APP0 round trip.
#[test]
fn s2_jfif_app0_round_trip() {
    let bytes = [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x16, b'J', b'F', b'I', b'F', 0x00, 0x07, 0x08, 0x01, 0x12,
        0x34, 0x56, 0x78, 0x01, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF, 0xD9,
    ];
    let metadata = roundtrip(&bytes);
    assert_eq!(metadata.len(), 3);
    let Segment::JfifApp0(app0) = &metadata.segments()[1] else {
        panic!("expected JfifApp0");
    };
    assert_eq!(app0.version_major, 7);
    assert_eq!(app0.version_minor, 8);
    assert_eq!(app0.density_x, 0x1234);
    assert_eq!(app0.density_y, 0x5678);
    assert_eq!(app0.thumbnail_width, 1);
    assert_eq!(app0.thumbnail_height, 2);
    assert_eq!(app0.thumbnail_rgb, vec![1, 2, 3, 4, 5, 6]);
}

/// S3 — back-to-back streams.
#[test]
fn s3_back_to_back_streams() {
    let block = |major: u8, minor: u8| -> Vec<u8> {
        vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x16, b'J', b'F', b'I', b'F', 0x00, major, minor, 0x01,
            0x12, 0x34, 0x56, 0x78, 0x01, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF, 0xD9,
        ]
    };
    let mut bytes = block(7, 8);
    bytes.extend(block(1, 2));

    let mut reader = JfifReader::new(Cursor::new(bytes.clone()));
    let all = file_io::read_all_default(&mut reader).unwrap();
    assert_eq!(all.len(), 2);
    let Segment::JfifApp0(first) = &all[0].segments()[1] else {
        panic!("expected JfifApp0");
    };
    let Segment::JfifApp0(second) = &all[1].segments()[1] else {
        panic!("expected JfifApp0");
    };
    assert_eq!((first.version_major, first.version_minor), (7, 8));
    assert_eq!((second.version_major, second.version_minor), (1, 2));

    let mut reader2 = JfifReader::new(Cursor::new(bytes.clone()));
    file_io::read_one_default(&mut reader2).unwrap();
    assert_eq!(reader2.position(), (bytes.len() / 2) as u64);
}

/// S4 — SOS round trip.
#[test]
fn s4_sos_round_trip() {
    let mut metadata = JfifMetadata::new();
    metadata.push(Segment::Soi);
    let payload = vec![0x01, 0x02, 0xFF, 0x00, 0x03, 0xFF, markers::RST0, 0x04];
    metadata.push(Segment::Sos(SosSegment {
        components: vec![SosComponent {
            component_id: 1,
            dc_ac_table: 0,
        }],
        spectral_start: 0,
        spectral_end: 63,
        approximation: 0,
        payload: payload.clone(),
    }));
    metadata.push(Segment::Eoi);

    let Segment::Sos(sos) = &metadata.segments()[1] else {
        panic!("expected Sos");
    };
    assert!(sos.validate_and_compute_body_length().is_ok());

    let mut bytes = Vec::new();
    {
        let mut writer = JfifWriter::new(&mut bytes);
        file_io::write_one(&mut writer, &metadata).unwrap();
    }

    let mut reader = JfifReader::new(Cursor::new(bytes));
    let recovered = file_io::read_one_default(&mut reader).unwrap().unwrap();
    let Segment::Sos(sos) = &recovered.segments()[1] else {
        panic!("expected Sos");
    };
    assert_eq!(sos.payload, payload);
}

/// S5 — Extended-XMP split and merge.
#[test]
fn s5_extended_xmp_split_and_merge() {
    let mut metadata = JfifMetadata::new();
    metadata.push(Segment::Soi);
    metadata.push(Segment::Eoi);

    // Large enough that the serialized extended document crosses the
    // default portion cap's 3-chunk boundary, forcing a fourth chunk.
    let attr_value = "y".repeat(66_000);
    let xmp = format!(
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="" xmlns:ex="urn:example" ex:a="{a}" ex:b="{b}" ex:c="{c}"/></rdf:RDF></x:xmpmeta>"#,
        a = attr_value,
        b = attr_value,
        c = attr_value,
    );

    let options = XmpCodecOptions::default().with_max_base_utf8_bytes(256);
    serialize_xmp(&mut metadata, Some(&xmp), options).unwrap();

    let base_key = jfif_segments::XmpApp1::TEMPLATE.key();
    let extended_key = jfif_segments::ExtendedXmpApp1::TEMPLATE.key();

    assert_eq!(metadata.find_all(&base_key).count(), 1);
    let extended: Vec<&jfif_segments::ExtendedXmpApp1> = metadata
        .find_all(&extended_key)
        .filter_map(|s| match s {
            Segment::ExtendedXmpApp1(e) => Some(e),
            _ => None,
        })
        .collect();
    assert_eq!(extended.len(), 4);

    let fingerprint = extended[0].full_md5_fingerprint.clone();
    assert_eq!(fingerprint.len(), 32);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(extended.iter().all(|e| e.full_md5_fingerprint == fingerprint));

    let mut sorted = extended.clone();
    sorted.sort_by_key(|e| e.starting_offset);
    let mut expected_offset = 0u32;
    let cap = u32::from(XmpCodecOptions::default().max_portion_utf8_bytes);
    for portion in &sorted {
        assert_eq!(portion.starting_offset, expected_offset);
        assert!(portion.portion.len() as u32 <= cap);
        expected_offset += portion.portion.len() as u32;
    }
    assert_eq!(expected_offset, sorted[0].full_length);

    let (base, _) = metadata.find_first(&base_key).unwrap();
    let Segment::XmpApp1(base) = base else {
        panic!("expected XmpApp1")
    };
    assert!(base.packet.contains("HasExtendedXMP"));

    let recovered = deserialize_xmp(&metadata, XmpCodecOptions::default())
        .unwrap()
        .unwrap();
    assert!(recovered.contains("ex:a"));
    assert!(recovered.contains("ex:b"));
    assert!(recovered.contains("ex:c"));
    assert!(!recovered.contains("HasExtendedXMP"));
}

/// S6 — EXIF split and truncate.
#[test]
fn s6_exif_split_and_truncate() {
    let mut metadata = JfifMetadata::new();
    metadata.push(Segment::Soi);
    metadata.push(Segment::ExifApp1(ExifApp1 {
        payload: vec![0; 3],
    }));
    metadata.push(Segment::ExifApp1(ExifApp1 {
        payload: vec![0; 1],
    }));
    metadata.push(Segment::ExifApp1(ExifApp1 {
        payload: vec![0; 2],
    }));
    metadata.push(Segment::Eoi);

    let exif = [0x11u8, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
    serialize_exif(
        &mut metadata,
        &exif,
        ExifCodecOptions::default().with_max_bytes_per_segment(4),
    );

    let key = ExifApp1::TEMPLATE.key();
    let chunks: Vec<Vec<u8>> = metadata
        .find_all(&key)
        .filter_map(|s| match s {
            Segment::ExifApp1(e) => Some(e.payload.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        chunks,
        vec![vec![0x11, 0x22, 0x33, 0x44], vec![0x55, 0x66, 0x77]]
    );
    assert!(matches!(metadata.segments()[0], Segment::Soi));
    assert!(matches!(metadata.segments().last().unwrap(), Segment::Eoi));
    assert_eq!(deserialize_exif(&metadata), Some(exif.to_vec()));
}
