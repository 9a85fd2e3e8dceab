//! Utilities for reading/writing sealnote encodings.
//!
//! Every integer is big-endian. Variable sized fields are preceded by
//! a 1, 2, or 4 byte length prefix. Reads never go past the end of the
//! input, a short buffer is always a [SealError::Format].

use crate::*;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Width of the length prefix in front of a variable sized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenWidth {
    /// 1 byte length prefix.
    U8,

    /// 2 byte length prefix.
    U16,

    /// 4 byte length prefix.
    U32,
}

impl LenWidth {
    /// The largest field length this prefix can describe.
    pub fn max_len(self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
            Self::U32 => u32::MAX as usize,
        }
    }
}

/// Read from bytes.
pub struct CodecReader<'lt>(std::io::Cursor<&'lt [u8]>);

impl<'lt> CodecReader<'lt> {
    /// Create a new codec Reader.
    pub fn new(data: &'lt [u8]) -> Self {
        Self(std::io::Cursor::new(data))
    }

    /// Current read offset into the underlying bytes.
    pub fn position(&self) -> usize {
        self.0.position() as usize
    }

    /// Count of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data().len().saturating_sub(self.position())
    }

    /// True if every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Raw access to an already-read region of the input,
    /// e.g. to keep a sub-structure's exact bytes.
    pub fn slice(&self, start: usize, end: usize) -> SealResult<&'lt [u8]> {
        if start > end || end > self.position() {
            return Err(SealError::format(format!(
                "{start}..{end} is not an already read region"
            )));
        }
        Ok(&self.data()[start..end])
    }

    /// Fail if any bytes remain.
    pub fn expect_end(&self, what: &str) -> SealResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SealError::format(format!(
                "{n} unexpected trailing bytes after {what}"
            ))),
        }
    }

    /// Read a u8 element.
    pub fn read_u8(&mut self) -> SealResult<u8> {
        self.0.read_u8().map_err(short_read)
    }

    /// Read a u16 element.
    pub fn read_u16(&mut self) -> SealResult<u16> {
        self.0.read_u16::<BigEndian>().map_err(short_read)
    }

    /// Read a u32 element.
    pub fn read_u32(&mut self) -> SealResult<u32> {
        self.0.read_u32::<BigEndian>().map_err(short_read)
    }

    /// Read bytes element.
    pub fn read_bytes(&mut self, size: usize) -> SealResult<&'lt [u8]> {
        if size > self.remaining() {
            return Err(SealError::format(format!(
                "expected {size} bytes, only {} remain",
                self.remaining()
            )));
        }
        let start = self.position();
        let end = start + size;
        self.0.set_position(end as u64);
        Ok(&self.data()[start..end])
    }

    /// Read a length prefix, then that many bytes.
    pub fn read_len_bytes(&mut self, width: LenWidth) -> SealResult<&'lt [u8]> {
        let len = match width {
            LenWidth::U8 => self.read_u8()? as usize,
            LenWidth::U16 => self.read_u16()? as usize,
            LenWidth::U32 => self.read_u32()? as usize,
        };
        self.read_bytes(len)
    }

    /// Read a length prefixed utf8 string.
    pub fn read_len_str(&mut self, width: LenWidth) -> SealResult<String> {
        let bytes = self.read_len_bytes(width)?;
        String::from_utf8(bytes.to_vec()).map_err(SealError::format)
    }

    /// Consume everything left in the input.
    pub fn read_remaining(&mut self) -> &'lt [u8] {
        let start = self.position();
        let data = self.data();
        self.0.set_position(data.len() as u64);
        &data[start.min(data.len())..]
    }

    fn data(&self) -> &'lt [u8] {
        *self.0.get_ref()
    }
}

/// Write to bytes.
#[derive(Debug, Default)]
pub struct CodecWriter(Vec<u8>);

impl CodecWriter {
    /// Create a new codec Writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new codec Writer with a pre-allocated capacity.
    pub fn with_capacity(size: usize) -> Self {
        Self(Vec::with_capacity(size))
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert this codec writer into the underlying Vec<u8>
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Finalize this codec writer into an immutable byte sequence.
    pub fn into_bin_data(self) -> BinData {
        self.0.into_boxed_slice().into()
    }

    /// Write a u8 element.
    pub fn write_u8(&mut self, val: u8) -> SealResult<()> {
        self.0.write_u8(val).map_err(SealError::other)
    }

    /// Write a u16 element.
    pub fn write_u16(&mut self, val: u16) -> SealResult<()> {
        self.0.write_u16::<BigEndian>(val).map_err(SealError::other)
    }

    /// Write a u32 element.
    pub fn write_u32(&mut self, val: u32) -> SealResult<()> {
        self.0.write_u32::<BigEndian>(val).map_err(SealError::other)
    }

    /// Write an element count as a u32.
    pub fn write_count(&mut self, count: usize) -> SealResult<()> {
        let count = u32::try_from(count).map_err(SealError::format)?;
        self.write_u32(count)
    }

    /// Write bytes element.
    pub fn write_bytes(&mut self, val: &[u8]) -> SealResult<()> {
        self.0.extend_from_slice(val);
        Ok(())
    }

    /// Write a length prefix, then the bytes.
    pub fn write_len_bytes(
        &mut self,
        width: LenWidth,
        val: &[u8],
    ) -> SealResult<()> {
        if val.len() > width.max_len() {
            return Err(SealError::format(format!(
                "{} bytes cannot be described by a {width:?} length prefix",
                val.len()
            )));
        }
        match width {
            LenWidth::U8 => self.write_u8(val.len() as u8)?,
            LenWidth::U16 => self.write_u16(val.len() as u16)?,
            LenWidth::U32 => self.write_u32(val.len() as u32)?,
        }
        self.write_bytes(val)
    }

    /// Write a length prefixed utf8 string.
    pub fn write_len_str(&mut self, width: LenWidth, val: &str) -> SealResult<()> {
        self.write_len_bytes(width, val.as_bytes())
    }
}

// -- local helpers -- //

fn short_read(e: std::io::Error) -> SealError {
    SealError::format(format!("unexpected end of input: {e}"))
}

// -- tests -- //
