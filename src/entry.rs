//! Table records.
//!
//! Each record is a fixed 32-byte portion followed by the raw name bytes:
//!
//! | Field             | Size |
//! |-------------------|------|
//! | compressed_size   | 8 B  |
//! | uncompressed_size | 8 B  |
//! | offset            | 8 B  |
//! | checksum          | 4 B  |
//! | permissions       | 2 B  |
//! | name_length       | 2 B  |
//! | name              | name_length B |

use std::io::{self, Read, Write};

use serde::Serialize;

use crate::bytes::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::stream::StreamSummary;

/// Size of the fixed portion of a record.
pub const RECORD_SIZE: usize = 32;
pub const MAX_NAME_LEN: usize = u16::MAX as usize;
/// Permission bits given to an entry until the caller sets its own.
pub const DEFAULT_PERMISSIONS: u16 = 0o644;

/// One archived file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    name:            String,
    size:            u64,
    compressed_size: u64,
    offset:          u64,
    checksum:        u32,
    permissions:     u16,
}

impl Entry {
    pub(crate) fn new(name: String, offset: u64) -> Self {
        Self {
            name,
            size: 0,
            compressed_size: 0,
            offset,
            checksum: 0,
            permissions: DEFAULT_PERMISSIONS,
        }
    }

    pub(crate) fn set_permissions(&mut self, permissions: u16) {
        self.permissions = permissions;
    }

    /// Record the totals of the entry's finished stream.
    pub(crate) fn seal(&mut self, summary: &StreamSummary) {
        self.size = summary.uncompressed;
        self.compressed_size = summary.compressed;
        self.checksum = summary.checksum;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Absolute position of the entry's compressed stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Adler-32 of the compressed stream.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn permissions(&self) -> u16 {
        self.permissions
    }

    /// Compressed size divided by uncompressed size; `0.0` for empty entries.
    pub fn ratio(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        self.compressed_size as f64 / self.size as f64
    }

    pub fn encode_record<W: Write>(&self, mut w: W) -> Result<()> {
        let name_len = u16::try_from(self.name.len())
            .map_err(|_| Error::NameTooLong(self.name.len()))?;

        let mut buf = [0u8; RECORD_SIZE];
        let mut enc = Encoder::new(&mut buf);
        enc.put_u64(self.compressed_size);
        enc.put_u64(self.size);
        enc.put_u64(self.offset);
        enc.put_u32(self.checksum);
        enc.put_u16(self.permissions);
        enc.put_u16(name_len);

        w.write_all(&buf)?;
        w.write_all(self.name.as_bytes())?;
        Ok(())
    }

    /// Decode one record.
    ///
    /// End of input anywhere inside the fixed portion or the name is a
    /// truncation.  The last record of a table has nothing after its name,
    /// so end of input right after it is the normal terminal condition; for
    /// any other record the same condition surfaces as a truncation when the
    /// next record is read.
    pub fn decode_record<R: Read>(mut r: R) -> Result<Self> {
        let mut buf = [0u8; RECORD_SIZE];
        r.read_exact(&mut buf)?;

        let mut dec = Decoder::new(&buf);
        let compressed_size = dec.get_u64();
        let size = dec.get_u64();
        let offset = dec.get_u64();
        let checksum = dec.get_u32();
        let permissions = dec.get_u16();
        let name_len = dec.get_u16() as usize;

        let mut name = vec![0u8; name_len];
        if read_full(&mut r, &mut name)? < name_len {
            return Err(Error::Truncated);
        }
        let name = String::from_utf8(name)
            .map_err(|e| Error::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;

        Ok(Self { name, size, compressed_size, offset, checksum, permissions })
    }
}

/// Fill `buf` as far as the reader allows; returns how much was read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Check that `name` is a simple relative path.
///
/// Segments are separated by `/` only; empty, `.` and `..` segments,
/// backslashes, NUL bytes and a leading `/` are all rejected.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong(name.len()));
    }
    let simple = !name.is_empty()
        && !name.contains(['\\', '\0'])
        && name
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if !simple {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample(name: &str) -> Entry {
        let mut e = Entry::new(name.to_owned(), 4);
        e.set_permissions(0o755);
        e.seal(&StreamSummary { uncompressed: 10, compressed: 7, checksum: 0xDEAD_BEEF });
        e
    }

    #[test]
    fn record_layout() {
        let mut out = Vec::new();
        sample("a.txt").encode_record(&mut out).unwrap();
        assert_eq!(out.len(), RECORD_SIZE + 5);
        assert_eq!(&out[0..8], &7u64.to_le_bytes());
        assert_eq!(&out[8..16], &10u64.to_le_bytes());
        assert_eq!(&out[16..24], &4u64.to_le_bytes());
        assert_eq!(&out[24..28], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&out[28..30], &0o755u16.to_le_bytes());
        assert_eq!(&out[30..32], &5u16.to_le_bytes());
        assert_eq!(&out[32..], b"a.txt");
    }

    #[test]
    fn consecutive_records_decode() {
        let mut out = Vec::new();
        sample("one").encode_record(&mut out).unwrap();
        sample("dir/two").encode_record(&mut out).unwrap();

        let mut cur = Cursor::new(out);
        assert_eq!(Entry::decode_record(&mut cur).unwrap(), sample("one"));
        assert_eq!(Entry::decode_record(&mut cur).unwrap(), sample("dir/two"));
        assert!(matches!(Entry::decode_record(&mut cur), Err(Error::Truncated)));
    }

    #[test]
    fn short_fixed_portion_is_truncation() {
        let mut out = Vec::new();
        sample("x").encode_record(&mut out).unwrap();
        out.truncate(RECORD_SIZE - 1);
        assert!(matches!(Entry::decode_record(Cursor::new(out)), Err(Error::Truncated)));
    }

    #[test]
    fn short_name_is_truncation() {
        let mut out = Vec::new();
        sample("name").encode_record(&mut out).unwrap();
        out.pop();
        assert!(matches!(Entry::decode_record(Cursor::new(out)), Err(Error::Truncated)));
    }

    #[test]
    fn ratio_of_empty_entry_is_zero() {
        let e = Entry::new("empty".into(), 4);
        assert_eq!(e.ratio(), 0.0);
        assert!((sample("r").ratio() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn names() {
        for ok in ["a.txt", "dir/b.txt", "a/b/c", "..hidden", "x..y"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "/abs", "../up", "a/../b", "a/./b", "a//b", "dir/", "win\\path", "nul\0"] {
            assert!(matches!(validate_name(bad), Err(Error::InvalidName(_))), "{bad}");
        }
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(validate_name(&long), Err(Error::NameTooLong(_))));
    }
}
