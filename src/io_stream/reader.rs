use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::header::{Footer, Header, FOOTER_SIZE, HEADER_SIZE};
use crate::stream::{EntryDecoder, EntryReader};

/// Random-access archive reader.
///
/// [`BarReader::new`] validates the header, locates the footer, then
/// decompresses and checksums the whole table.  It either succeeds with a
/// fully verified entry list or fails outright.  Entry payloads are opened
/// on demand with [`entry_reader`](Self::entry_reader); each one is verified
/// on its own and a bad entry does not affect the others.
pub struct BarReader<R: Read + Seek> {
    source:  R,
    entries: Vec<Entry>,
    len:     u64,
}

impl<R: Read + Seek> BarReader<R> {
    pub fn new(mut source: R) -> Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        Header::read(&mut source)?;

        if len < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(Error::Truncated);
        }
        let table_end = len - FOOTER_SIZE as u64;
        source.seek(SeekFrom::Start(table_end))?;
        let footer = Footer::read(&mut source)?;

        if footer.table_offset < HEADER_SIZE as u64 || footer.table_offset > table_end {
            return Err(Error::Truncated);
        }
        source.seek(SeekFrom::Start(footer.table_offset))?;
        let entries = read_table(&mut source, table_end - footer.table_offset, &footer)?;

        debug!(entries = entries.len(), table_offset = footer.table_offset, len, "archive opened");
        Ok(Self { source, entries, len })
    }

    /// All entries in the order they were written.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Total archive length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open a read view over `entry`'s payload.
    ///
    /// Views share the reader's cursor, so only one can be alive at a time;
    /// opening another repositions the source.
    pub fn entry_reader(&mut self, entry: &Entry) -> Result<EntryReader<'_, R>> {
        self.source.seek(SeekFrom::Start(entry.offset()))?;
        Ok(EntryReader::new(&mut self.source, entry))
    }

    /// Read a whole entry into memory and verify it.
    ///
    /// A checksum failure takes precedence over a decoding error, since a
    /// corrupt stream usually produces both.
    pub fn read_entry(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let capacity = usize::try_from(entry.size()).unwrap_or(0).min(1 << 20);
        let mut data = Vec::with_capacity(capacity);
        let mut reader = self.entry_reader(entry)?;
        let read = reader.read_to_end(&mut data);
        reader.close()?;
        read?;
        Ok(data)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Decode `footer.entry_count` records straight off the table stream, then
/// decode the rest of it so the checksum covers every compressed byte.
///
/// The checksum is compared before any parse error is reported, so
/// corruption in the table region reads as a table checksum failure rather
/// than as whatever the record decoder happened to trip over first.
/// Nothing beyond one record is held in memory at a time.
fn read_table<R: Read>(source: &mut R, region: u64, footer: &Footer) -> Result<Vec<Entry>> {
    let mut decoder = EntryDecoder::new(source, region);
    let count = footer.entry_count as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    let mut parsed = Ok(());
    for _ in 0..count {
        match Entry::decode_record(&mut decoder) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                parsed = Err(e);
                break;
            }
        }
    }
    let drained = decoder.drain();

    let actual = decoder.checksum();
    if actual != footer.table_checksum {
        return Err(Error::TableChecksum { expected: footer.table_checksum, actual });
    }
    parsed?;
    let trailing = drained?;
    if trailing > 0 {
        debug!(trailing, "ignoring bytes after the last table record");
    }
    Ok(entries)
}
