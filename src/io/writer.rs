use std::io::Write;

use byteorder::WriteBytesExt;

use crate::error::Result;

/// A thin big-endian byte writer over any [`Write`].
pub struct JfifWriter<W: Write> {
    inner: W,
}

impl<W: Write> JfifWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        WriteBytesExt::write_u8(&mut self.inner, value)?;
        Ok(())
    }

    pub fn write_u16_be(&mut self, value: u16) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    pub fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write an ASCII identifier followed by a NUL terminator.
    pub fn write_ascii_nul(&mut self, s: &str) -> Result<()> {
        self.inner.write_all(s.as_bytes())?;
        self.write_u8(0)?;
        Ok(())
    }
}
