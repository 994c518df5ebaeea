//! Adobe XMP and Extended-XMP: a narrow in-crate XML DOM (`dom`) plus
//! the split/merge codec that implements the Extended-XMP protocol on
//! top of it (`codec`).

pub mod codec;
pub mod dom;

pub use codec::{deserialize_xmp, serialize_xmp};
