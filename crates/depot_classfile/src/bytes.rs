//! Big-endian cursor over class-file bytes.

use crate::error::ClassFileError;

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ClassFileError::UnexpectedEof)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassFileError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16, ClassFileError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32, ClassFileError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u64, ClassFileError> {
        let hi = u64::from(self.read_u4()?);
        let lo = u64::from(self.read_u4()?);
        Ok((hi << 32) | lo)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }
}
