//! Cursor over the bytes of one chunk.

use crate::FormatError;

/// Longest variable-length quantity allowed by the file format.
pub const MAX_VLQ_BYTES: usize = 4;

pub(crate) struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek_u8(&self) -> Result<u8, FormatError> {
        self.data.get(self.pos).copied().ok_or(FormatError::UnexpectedEof)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FormatError> {
        let v = self.peek_u8()?;
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(n).ok_or(FormatError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(FormatError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Big-endian base-128 number, high bit set on every byte but the last.
    pub(crate) fn read_vlq(&mut self) -> Result<u32, FormatError> {
        let mut value: u32 = 0;
        for _ in 0..MAX_VLQ_BYTES {
            let byte = self.read_u8()?;
            value = (value << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FormatError::VlqTooLong)
    }

    /// A VLQ length followed by that many bytes.
    pub(crate) fn read_vlq_bytes(&mut self) -> Result<&'a [u8], FormatError> {
        let len = self.read_vlq()? as usize;
        self.read_bytes(len)
    }
}
