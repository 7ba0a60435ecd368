//! Little-endian field cursors over fixed-size buffers.
//!
//! Every on-disk structure in a BAR archive has a fixed layout, so callers
//! size the buffer up front (`HEADER_SIZE`, `RECORD_SIZE`, `FOOTER_SIZE`) and
//! these cursors only advance through it.  Running past the end of the
//! buffer is a caller bug and panics.

use byteorder::{ByteOrder, LittleEndian};

/// Writes fields front to back into a borrowed buffer.
pub struct Encoder<'a> {
    buf: &'a mut [u8],
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    fn advance(&mut self, n: usize) -> &mut [u8] {
        let buf = std::mem::take(&mut self.buf);
        let (head, tail) = buf.split_at_mut(n);
        self.buf = tail;
        head
    }

    pub fn put_u8(&mut self, v: u8) {
        self.advance(1)[0] = v;
    }

    pub fn put_u16(&mut self, v: u16) {
        LittleEndian::write_u16(self.advance(2), v);
    }

    pub fn put_u32(&mut self, v: u32) {
        LittleEndian::write_u32(self.advance(4), v);
    }

    pub fn put_u64(&mut self, v: u64) {
        LittleEndian::write_u64(self.advance(8), v);
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.advance(v.len()).copy_from_slice(v);
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

/// Reads fields front to back out of a borrowed buffer.
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn advance(&mut self, n: usize) -> &'a [u8] {
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        head
    }

    pub fn get_u8(&mut self) -> u8 {
        self.advance(1)[0]
    }

    pub fn get_u16(&mut self) -> u16 {
        LittleEndian::read_u16(self.advance(2))
    }

    pub fn get_u32(&mut self) -> u32 {
        LittleEndian::read_u32(self.advance(4))
    }

    pub fn get_u64(&mut self) -> u64 {
        LittleEndian::read_u64(self.advance(8))
    }

    pub fn get_bytes(&mut self, n: usize) -> &'a [u8] {
        self.advance(n)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_little_endian() {
        let mut buf = [0u8; 15];
        let mut enc = Encoder::new(&mut buf);
        enc.put_u8(0xAB);
        enc.put_u16(0x0102);
        enc.put_u32(0x0304_0506);
        enc.put_u64(0x0708_090A_0B0C_0D0E);
        assert_eq!(enc.remaining(), 0);
        assert_eq!(
            buf,
            [0xAB, 0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0x0E, 0x0D, 0x0C, 0x0B, 0x0A, 0x09, 0x08, 0x07]
        );

        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.get_u8(), 0xAB);
        assert_eq!(dec.get_u16(), 0x0102);
        assert_eq!(dec.get_u32(), 0x0304_0506);
        assert_eq!(dec.get_u64(), 0x0708_090A_0B0C_0D0E);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    #[should_panic]
    fn overrun_panics() {
        let buf = [0u8; 3];
        Decoder::new(&buf).get_u32();
    }
}
