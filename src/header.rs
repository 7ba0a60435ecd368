//! Fixed-size regions: the 4-byte header and the 16-byte footer.
//!
//! The footer is the only structure located without knowing its position;
//! it always occupies the last [`FOOTER_SIZE`] bytes of the archive.

use std::io::{Read, Write};

use crate::bytes::{Decoder, Encoder};
use crate::error::{Error, Result};

pub const MAGIC: &[u8; 3] = b"BAR";
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 4;
pub const FOOTER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
}

impl Header {
    pub fn new() -> Self {
        Self { version: VERSION }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut enc = Encoder::new(&mut buf);
        enc.put_bytes(MAGIC);
        enc.put_u8(self.version);
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Read and validate a header.  The magic is checked before the version.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf)?;
        let mut dec = Decoder::new(&buf);
        if dec.get_bytes(MAGIC.len()) != MAGIC {
            return Err(Error::UnknownFormat);
        }
        let version = dec.get_u8();
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(Self { version })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Absolute position of the compressed table.
    pub table_offset:   u64,
    /// Adler-32 of the compressed table bytes.
    pub table_checksum: u32,
    pub entry_count:    u32,
}

impl Footer {
    pub fn encode(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        let mut enc = Encoder::new(&mut buf);
        enc.put_u64(self.table_offset);
        enc.put_u32(self.table_checksum);
        enc.put_u32(self.entry_count);
        buf
    }

    pub fn decode(buf: &[u8; FOOTER_SIZE]) -> Self {
        let mut dec = Decoder::new(buf);
        Self {
            table_offset:   dec.get_u64(),
            table_checksum: dec.get_u32(),
            entry_count:    dec.get_u32(),
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_bytes() {
        let mut out = Vec::new();
        Header::new().write(&mut out).unwrap();
        assert_eq!(out, b"BAR\x01");
        assert_eq!(Header::read(Cursor::new(out)).unwrap().version, VERSION);
    }

    #[test]
    fn bad_magic_is_checked_before_version() {
        assert!(matches!(Header::read(&b"ZIP\x07"[..]), Err(Error::UnknownFormat)));
        assert!(matches!(Header::read(&b"BAR\x02"[..]), Err(Error::UnsupportedVersion(2))));
    }

    #[test]
    fn short_header_is_truncation() {
        assert!(matches!(Header::read(&b"BA"[..]), Err(Error::Truncated)));
    }

    #[test]
    fn footer_layout() {
        let footer = Footer { table_offset: 0x1122, table_checksum: 0xAABB_CCDD, entry_count: 3 };
        let buf = footer.encode();
        assert_eq!(&buf[0..8], &0x1122u64.to_le_bytes());
        assert_eq!(&buf[8..12], &0xAABB_CCDDu32.to_le_bytes());
        assert_eq!(&buf[12..16], &3u32.to_le_bytes());
        assert_eq!(Footer::decode(&buf), footer);
    }
}
