//! Per-entry DEFLATE streams.
//!
//! # Write path
//! ```text
//! caller ─▶ Counter (uncompressed) ─▶ DeflateEncoder ─▶ Counter (compressed) ─▶ AdlerWriter ─▶ sink
//! ```
//!
//! # Read path
//! ```text
//! source ─▶ Take(region) ─▶ BufReader ─▶ AdlerReader ─▶ Counter (compressed) ─▶ DeflateDecoder ─▶ Counter (uncompressed) ─▶ caller
//! ```
//!
//! The checksum always sits directly on the container bytes, so it covers
//! the compressed stream on both sides.  The decoder is the `bufread`
//! flavour: it releases exactly the bytes of its own stream, which keeps
//! back-to-back entries out of each other's checksums.

use std::io::{self, BufReader, Read, Take, Write};

use flate2::bufread::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::{debug, trace};

use crate::checksum::{AdlerReader, AdlerWriter, Counter};
use crate::entry::Entry;
use crate::error::{Error, Result};

/// Totals reported by a finished [`EntryEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub uncompressed: u64,
    pub compressed:   u64,
    /// Adler-32 of the compressed bytes.
    pub checksum:     u32,
}

// ── Encoder ──────────────────────────────────────────────────────────────────

pub struct EntryEncoder<W: Write> {
    inner: Counter<DeflateEncoder<Counter<AdlerWriter<W>>>>,
}

impl<W: Write> EntryEncoder<W> {
    pub fn new(sink: W, level: Compression) -> Self {
        let compressed = Counter::new(AdlerWriter::new(sink));
        Self { inner: Counter::new(DeflateEncoder::new(compressed, level)) }
    }

    /// Terminate the DEFLATE stream and return the sink with the totals.
    pub fn finish(self) -> io::Result<(W, StreamSummary)> {
        let uncompressed = self.inner.count();
        let compressed = self.inner.into_inner().finish()?;
        let summary = StreamSummary {
            uncompressed,
            compressed: compressed.count(),
            checksum:   compressed.get_ref().checksum(),
        };
        trace!(?summary, "stream finished");
        Ok((compressed.into_inner().into_inner(), summary))
    }

    #[cfg(test)]
    fn uncompressed(&self) -> u64 {
        self.inner.count()
    }
}

impl<W: Write> Write for EntryEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ── Decoder ──────────────────────────────────────────────────────────────────

type Source<R> = Counter<AdlerReader<BufReader<Take<R>>>>;

/// Decompresses one stream out of a bounded region of the container.
pub struct EntryDecoder<R: Read> {
    inner: Counter<DeflateDecoder<Source<R>>>,
}

impl<R: Read> EntryDecoder<R> {
    /// `source` must be positioned at the start of the stream; at most
    /// `region` bytes are taken from it.
    pub fn new(source: R, region: u64) -> Self {
        let source = Counter::new(AdlerReader::new(BufReader::new(source.take(region))));
        Self { inner: Counter::new(DeflateDecoder::new(source)) }
    }

    /// Adler-32 of the compressed bytes consumed so far.
    pub fn checksum(&self) -> u32 {
        self.inner.get_ref().get_ref().get_ref().checksum()
    }

    pub fn compressed(&self) -> u64 {
        self.inner.get_ref().get_ref().count()
    }

    /// Decode and discard everything up to the end of the stream.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(&mut self.inner, &mut io::sink())
    }
}

impl<R: Read> Read for EntryDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

// ── Entry read view ──────────────────────────────────────────────────────────

/// Read view over one entry's payload.
///
/// Yields exactly the entry's declared uncompressed size.  Running dry
/// earlier is an `UnexpectedEof` error; reaching the declared size is end of
/// stream even if the DEFLATE stream has more to give.  Call
/// [`close`](Self::close) to verify the entry checksum.
pub struct EntryReader<'a, R: Read> {
    decoder:   EntryDecoder<&'a mut R>,
    name:      String,
    remaining: u64,
    checksum:  u32,
    truncated: bool,
}

impl<'a, R: Read> EntryReader<'a, R> {
    /// `source` must already be positioned at `entry.offset()`.
    pub(crate) fn new(source: &'a mut R, entry: &Entry) -> Self {
        Self {
            decoder:   EntryDecoder::new(source, entry.compressed_size()),
            name:      entry.name().to_owned(),
            remaining: entry.size(),
            checksum:  entry.checksum(),
            truncated: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes still owed to the caller.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Finish the entry and check its checksum.
    ///
    /// Whatever is left of the compressed stream is decoded first, so the
    /// checksum is compared over the whole stream regardless of how much the
    /// caller read.
    pub fn close(mut self) -> Result<()> {
        match self.decoder.drain() {
            Ok(0) => {}
            Ok(extra) => debug!(name = %self.name, extra, "discarded bytes past declared size"),
            Err(e) => debug!(name = %self.name, error = %e, "stream ended with an error"),
        }
        let actual = self.decoder.checksum();
        if actual != self.checksum {
            return Err(Error::InvalidChecksum {
                name:     self.name,
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }
}

impl<R: Read> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.truncated {
            return Err(truncated(&self.name, self.remaining));
        }
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.decoder.read(&mut buf[..max])?;
        if n == 0 {
            self.truncated = true;
            return Err(truncated(&self.name, self.remaining));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

fn truncated(name: &str, missing: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("entry '{name}' ends {missing} bytes early"),
    )
}
