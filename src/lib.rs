//! Byte-accurate JFIF/JPEG marker-segment framing, plus EXIF and Adobe
//! XMP / Extended-XMP codecs.
//!
//! This crate reads and writes the marker-segment structure of a JFIF
//! (JPEG) file — `SOI`, `APPn`, `SOS`, `EOI`, and everything in between
//! — as an ordered [`JfifMetadata`] of typed [`Segment`]s, without
//! decoding the entropy-coded image data itself. On top of that framing
//! layer it implements two higher-level codecs: splitting and joining
//! an EXIF TIFF buffer across `APP1 "Exif"` segments, and splitting and
//! joining an Adobe XMP packet across a base `APP1` XMP segment plus
//! one or more Extended-XMP portions.
//!
//! # Example
//!
//! ```no_run
//! use jfif_segments::{file_io, io::JfifReader, xmp};
//! use std::fs::File;
//!
//! # fn main() -> jfif_segments::Result<()> {
//! let mut file = File::open("image.jpg")?;
//! let mut reader = JfifReader::new(&mut file);
//! let mut metadata = file_io::read_one_default(&mut reader)?.expect("not a JFIF stream");
//!
//! if let Some(packet) = xmp::deserialize_xmp(&metadata, Default::default())? {
//!     println!("Found XMP: {} bytes", packet.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod exif_codec;
pub mod file_io;
pub mod io;
pub mod key;
pub mod length;
pub mod markers;
pub mod metadata;
pub mod registry;
pub mod segments;
pub mod xmp;

pub use config::{ExifCodecOptions, XmpCodecOptions};
pub use error::{Error, Result};
pub use exif_codec::{deserialize_exif, serialize_exif};
pub use file_io::{read_all, read_all_default, read_one, read_one_default, write_one};
pub use io::{JfifReader, JfifWriter, NulBehavior};
pub use key::{SegmentKey, SegmentKeyTemplate};
pub use length::SegmentLength;
pub use metadata::JfifMetadata;
pub use registry::SegmentRegistry;
pub use segments::{
    ExifApp1, ExtendedXmpApp1, GenericSegment, JfifApp0, JfxxApp0, JfxxThumbnail, Segment,
    SosComponent, SosSegment, XmpApp1,
};
pub use xmp::{deserialize_xmp, serialize_xmp};
