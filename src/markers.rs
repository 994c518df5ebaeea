//! JPEG marker byte constants, shared by the reader/writer and the
//! segment type table.

pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;

pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;

pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;

/// Restart markers `RST0..=RST7` are part of the entropy-coded payload
/// stream, not real framing markers — they never terminate a
/// marker-escape scan.
pub fn is_restart_marker(byte: u8) -> bool {
    (RST0..=RST7).contains(&byte)
}

/// `0xFF 0x00` is a byte-stuffed literal `0xFF` inside entropy-coded
/// data, never a marker.
pub fn is_stuffed_zero(byte: u8) -> bool {
    byte == 0x00
}
