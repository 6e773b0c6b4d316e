use crate::error::SerdeErr;

/// Cursor over an incoming frame. Every read is checked; running past the
/// end of the buffer is a decode error, never a panic.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        let byte = *self.buffer.get(self.cursor).ok_or(SerdeErr::UnexpectedEnd)?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SerdeErr> {
        let end = self.cursor.checked_add(len).ok_or(SerdeErr::UnexpectedEnd)?;
        if end > self.buffer.len() {
            return Err(SerdeErr::UnexpectedEnd);
        }
        let slice = &self.buffer[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    pub fn read_var_u32(&mut self) -> Result<u32, SerdeErr> {
        let value = self.read_var_u64()?;
        u32::try_from(value).map_err(|_| SerdeErr::InvalidValue("var u32"))
    }

    pub fn read_var_u64(&mut self) -> Result<u64, SerdeErr> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(SerdeErr::InvalidValue("var u64"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(SerdeErr::InvalidValue("var u64"));
            }
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}
