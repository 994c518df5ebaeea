use std::collections::VecDeque;
use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::Result;

/// How `read_ascii_string` should treat a NUL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NulBehavior {
    /// Stop at the first NUL byte (which is consumed but not included
    /// in the returned string).
    Stop,
    /// Read exactly `max_bytes`, then trim any trailing NUL bytes from
    /// the returned string.
    TrimTrailing,
}

/// The result of a [`JfifReader::scan`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Whether the predicate matched before the stream ran out.
    pub is_positive_match: bool,
    /// Number of bytes copied into the sink, excluding the matched
    /// terminator byte(s).
    pub bytes_read: u64,
}

/// A buffered big-endian byte reader over any [`Read`], with a small
/// lookahead buffer so callers can probe ahead (e.g. for the leading
/// SOI marker) without consuming.
pub struct JfifReader<R: Read> {
    inner: R,
    peek: VecDeque<u8>,
    position: u64,
}

impl<R: Read> JfifReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peek: VecDeque::with_capacity(4),
            position: 0,
        }
    }

    /// Current byte offset, counting bytes that have been consumed
    /// (peeked-but-unconsumed bytes don't count).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Ensure at least `n` bytes are buffered without consuming them.
    /// Returns `false` if the stream ran out before `n` bytes could be
    /// buffered.
    pub fn ensure_buffered(&mut self, n: usize) -> Result<bool> {
        while self.peek.len() < n {
            let mut byte = [0u8; 1];
            match self.inner.read(&mut byte)? {
                0 => return Ok(false),
                _ => self.peek.push_back(byte[0]),
            }
        }
        Ok(true)
    }

    /// Peek at the next `n` buffered bytes without consuming them.
    /// Panics if fewer than `n` bytes are buffered; call
    /// [`Self::ensure_buffered`] first.
    pub fn peek_bytes(&self, n: usize) -> Vec<u8> {
        self.peek.iter().take(n).copied().collect()
    }

    /// Push a single already-consumed byte back onto the front of the
    /// lookahead buffer, as if it had never been read. Used by the SOS
    /// out-of-band scanner: it must read one byte ahead to decide
    /// whether a `0xFF` starts real framing or entropy-coded stuffing,
    /// and un-reads it when the answer is "real framing".
    pub fn unread_one(&mut self, byte: u8) {
        self.peek.push_front(byte);
        self.position -= 1;
    }

    /// Peeks for the two-byte start-of-image marker (`0xFF 0xD8`)
    /// without consuming any bytes. Returns `false` (not an error) if
    /// the stream doesn't have two bytes available.
    pub fn probe_for_start_of_image(&mut self) -> Result<bool> {
        if !self.ensure_buffered(2)? {
            return Ok(false);
        }
        let bytes = self.peek_bytes(2);
        Ok(bytes[0] == 0xFF && bytes[1] == crate::markers::SOI)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if let Some(b) = self.peek.pop_front() {
            self.position += 1;
            return Ok(b);
        }
        let b = ReadBytesExt::read_u8(&mut self.inner)?;
        self.position += 1;
        Ok(b)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        for slot in buf.iter_mut() {
            *slot = self.read_u8()?;
        }
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(n);
        for _ in 0..n {
            buf.push(self.read_u8()?);
        }
        Ok(buf)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.read_u8()?;
        }
        Ok(())
    }

    /// Read an ASCII identifier string. Returns the decoded string and
    /// the number of bytes consumed from the stream (including any NUL
    /// terminator).
    pub fn read_ascii_string(
        &mut self,
        max_bytes: usize,
        behavior: NulBehavior,
    ) -> Result<(String, usize)> {
        match behavior {
            NulBehavior::Stop => {
                let mut bytes = Vec::new();
                let mut consumed = 0usize;
                loop {
                    if consumed >= max_bytes {
                        break;
                    }
                    let b = self.read_u8()?;
                    consumed += 1;
                    if b == 0 {
                        break;
                    }
                    bytes.push(b);
                }
                Ok((String::from_utf8_lossy(&bytes).into_owned(), consumed))
            }
            NulBehavior::TrimTrailing => {
                let bytes = self.read_exact(max_bytes)?;
                let trimmed: Vec<u8> = bytes
                    .into_iter()
                    .rev()
                    .skip_while(|&b| b == 0)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                Ok((String::from_utf8_lossy(&trimmed).into_owned(), max_bytes))
            }
        }
    }

    /// Stream bytes into `sink` until `is_terminator(prev_byte,
    /// current_byte)` reports a match. The byte that triggered the
    /// match is consumed from the stream but neither it nor the byte
    /// before it remain in `sink`.
    pub fn scan(
        &mut self,
        sink: &mut Vec<u8>,
        mut is_terminator: impl FnMut(u8, u8) -> bool,
    ) -> Result<ScanResult> {
        let start_len = sink.len();
        let mut prev: Option<u8> = None;
        loop {
            if !self.ensure_buffered(1)? {
                return Ok(ScanResult {
                    is_positive_match: false,
                    bytes_read: (sink.len() - start_len) as u64,
                });
            }
            let byte = self.read_u8()?;
            if let Some(p) = prev {
                if is_terminator(p, byte) {
                    sink.pop();
                    return Ok(ScanResult {
                        is_positive_match: true,
                        bytes_read: (sink.len() - start_len) as u64,
                    });
                }
            }
            sink.push(byte);
            prev = Some(byte);
        }
    }
}
