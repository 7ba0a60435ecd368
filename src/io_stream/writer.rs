use std::collections::HashSet;
use std::io::{self, Read, Write};

use flate2::Compression;
use tracing::debug;

use crate::entry::{validate_name, Entry};
use crate::error::{Error, Result};
use crate::header::{Footer, Header, FOOTER_SIZE, HEADER_SIZE};
use crate::stream::EntryEncoder;

enum State<W: Write> {
    /// Header written, no entry open.
    Ready(W),
    Entry(EntryEncoder<W>),
    Closed(W),
    Failed(Error),
    /// Only observed while a transition is in flight.
    Busy,
}

/// Sequential archive builder.
///
/// Entries are appended one at a time: [`create`](Self::create) opens an
/// entry, [`Write`] feeds it, and the next `create` (or [`close`](Self::close))
/// finalizes it.  The first error is latched and returned by every later
/// call.  Dropping the writer without closing it leaves an unreadable archive.
pub struct BarWriter<W: Write> {
    state:   State<W>,
    entries: Vec<Entry>,
    names:   HashSet<String>,
    /// Absolute position of the next byte to be written.
    offset:  u64,
    level:   Compression,
}

impl<W: Write> BarWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        Self::with_level(sink, Compression::best())
    }

    /// Write the header and return a writer compressing at `level`.
    pub fn with_level(mut sink: W, level: Compression) -> Result<Self> {
        Header::new().write(&mut sink)?;
        Ok(Self {
            state:   State::Ready(sink),
            entries: Vec::new(),
            names:   HashSet::new(),
            offset:  HEADER_SIZE as u64,
            level,
        })
    }

    /// Entries appended so far, in order.  The last one is still growing
    /// while it is open.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Bytes committed to the sink by finalized regions.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Finalize the open entry, if any, and start a new one called `name`.
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.check()?;
        let res = self.start_entry(name);
        self.latch(res)
    }

    /// Set the permission bits of the open entry.
    pub fn set_permissions(&mut self, permissions: u16) -> Result<()> {
        self.check()?;
        match (&self.state, self.entries.last_mut()) {
            (State::Entry(_), Some(entry)) => {
                entry.set_permissions(permissions);
                Ok(())
            }
            _ => Err(Error::NoEntry),
        }
    }

    /// Append a whole entry from `data`; returns its uncompressed size.
    pub fn add<R: Read>(&mut self, name: &str, permissions: u16, mut data: R) -> Result<u64> {
        self.create(name)?;
        self.set_permissions(permissions)?;
        match io::copy(&mut data, &mut *self) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.check()?;
                self.latch(Err(e.into()))
            }
        }
    }

    /// Finalize the open entry, then write the table and the footer.
    pub fn close(&mut self) -> Result<()> {
        self.check()?;
        let res = self.write_trailer();
        self.latch(res)
    }

    /// Close if still open and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        if !matches!(self.state, State::Closed(_)) {
            self.close()?;
        }
        match self.state {
            State::Closed(sink) => Ok(sink),
            State::Failed(e) => Err(e),
            _ => Err(Error::WriteAfterClose),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────────────

    fn check(&self) -> Result<()> {
        match &self.state {
            State::Closed(_) | State::Busy => Err(Error::WriteAfterClose),
            State::Failed(e) => Err(e.clone()),
            State::Ready(_) | State::Entry(_) => Ok(()),
        }
    }

    fn latch<T>(&mut self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            debug!(error = %e, "writer failed");
            self.state = State::Failed(e.clone());
        }
        res
    }

    /// Bring the writer back to a bare sink, finalizing the open entry.
    fn settle(&mut self) -> Result<W> {
        match std::mem::replace(&mut self.state, State::Busy) {
            State::Ready(sink) => Ok(sink),
            State::Entry(encoder) => {
                let (sink, summary) = encoder.finish()?;
                let entry = self.entries.last_mut().ok_or(Error::NoEntry)?;
                entry.seal(&summary);
                self.offset += summary.compressed;
                debug!(
                    name = entry.name(),
                    offset = entry.offset(),
                    size = summary.uncompressed,
                    compressed = summary.compressed,
                    "entry finalized"
                );
                Ok(sink)
            }
            State::Closed(_) | State::Busy => Err(Error::WriteAfterClose),
            State::Failed(e) => Err(e),
        }
    }

    fn start_entry(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.names.contains(name) {
            return Err(Error::DuplicateName(name.to_owned()));
        }
        if self.entries.len() >= u32::MAX as usize {
            return Err(Error::TooManyEntries);
        }

        let sink = self.settle()?;
        self.names.insert(name.to_owned());
        self.entries.push(Entry::new(name.to_owned(), self.offset));
        self.state = State::Entry(EntryEncoder::new(sink, self.level));
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        let sink = self.settle()?;
        let entry_count = u32::try_from(self.entries.len()).map_err(|_| Error::TooManyEntries)?;
        let table_offset = self.offset;

        let mut table = EntryEncoder::new(sink, self.level);
        for entry in &self.entries {
            entry.encode_record(&mut table)?;
        }
        let (mut sink, summary) = table.finish()?;

        let footer = Footer { table_offset, table_checksum: summary.checksum, entry_count };
        footer.write(&mut sink)?;
        sink.flush()?;

        self.offset += summary.compressed + FOOTER_SIZE as u64;
        debug!(entries = entry_count, table_offset, total = self.offset, "archive closed");
        self.state = State::Closed(sink);
        Ok(())
    }
}

impl<W: Write> Write for BarWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        let res = match &mut self.state {
            State::Entry(encoder) => encoder.write(buf).map_err(Error::from),
            _ => return Err(Error::NoEntry.into()),
        };
        Ok(self.latch(res)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        let res = match &mut self.state {
            State::Entry(encoder) => encoder.flush(),
            State::Ready(sink) => sink.flush(),
            _ => Ok(()),
        };
        Ok(self.latch(res.map_err(Error::from))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_archive_is_header_table_footer() {
        let out = BarWriter::new(Vec::new()).unwrap().finish().unwrap();
        assert_eq!(&out[..4], b"BAR\x01");
        let footer_start = out.len() - FOOTER_SIZE;
        let mut footer = [0u8; FOOTER_SIZE];
        footer.copy_from_slice(&out[footer_start..]);
        let footer = Footer::decode(&footer);
        assert_eq!(footer.table_offset, HEADER_SIZE as u64);
        assert_eq!(footer.entry_count, 0);
    }

    #[test]
    fn offsets_follow_compressed_sizes() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        w.add("a", 0o644, &b"aaaaaaaaaaaaaaaa"[..]).unwrap();
        w.add("b", 0o600, &b"bbbb"[..]).unwrap();
        w.close().unwrap();

        let e = w.entries();
        assert_eq!(e[0].offset(), HEADER_SIZE as u64);
        assert_eq!(e[1].offset(), e[0].offset() + e[0].compressed_size());
        assert_eq!(e[0].size(), 16);
        assert_eq!(e[1].size(), 4);
        assert_eq!(e[1].permissions(), 0o600);
    }

    #[test]
    fn write_before_create_is_not_latched() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        let err = w.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(w.set_permissions(0o600), Err(Error::NoEntry)));
        w.create("ok").unwrap();
    }

    #[test]
    fn invalid_name_latches() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        w.add("good", 0o644, &b"1"[..]).unwrap();
        assert!(matches!(w.create("../evil"), Err(Error::InvalidName(_))));
        assert_eq!(w.entries().len(), 1);
        assert!(matches!(w.create("fine"), Err(Error::InvalidName(_))));
        assert!(matches!(w.close(), Err(Error::InvalidName(_))));
        assert!(w.write(b"more").is_err());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        w.create("same").unwrap();
        assert!(matches!(w.create("same"), Err(Error::DuplicateName(_))));
    }

    #[test]
    fn closed_writer_refuses_everything() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        w.add("a", 0o644, &b"1"[..]).unwrap();
        w.close().unwrap();
        assert!(matches!(w.create("b"), Err(Error::WriteAfterClose)));
        assert!(matches!(w.close(), Err(Error::WriteAfterClose)));
        assert!(matches!(w.set_permissions(0), Err(Error::WriteAfterClose)));
        assert!(w.write(b"x").is_err());
        assert!(w.finish().is_ok());
    }
}
