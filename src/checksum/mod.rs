//! Pass-through byte filters: a rolling Adler-32 and a plain byte counter.
//!
//! Both filters forward bytes unchanged and can be stacked in any order.
//! On the read side they also implement [`BufRead`]; bytes are accounted
//! when they are handed out by `read` or released by `consume`, never when
//! they are merely buffered.  A `bufread` decompressor stacked on top can
//! therefore peek past the end of its stream without those bytes leaking
//! into the checksum.

use adler2::Adler32;
use std::io::{self, BufRead, Read, Write};

// ── Adler-32 ─────────────────────────────────────────────────────────────────

/// Sums every byte written through it into an Adler-32.
pub struct AdlerWriter<W> {
    inner: W,
    adler: Adler32,
}

impl<W: Write> AdlerWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, adler: Adler32::new() }
    }

    /// Checksum of all bytes the inner writer has accepted so far.
    pub fn checksum(&self) -> u32 {
        self.adler.checksum()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for AdlerWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.adler.write_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Sums every byte read through it into an Adler-32.
pub struct AdlerReader<R> {
    inner: R,
    adler: Adler32,
}

impl<R: Read> AdlerReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, adler: Adler32::new() }
    }

    /// Checksum of all bytes observed so far.
    pub fn checksum(&self) -> u32 {
        self.adler.checksum()
    }

    pub fn read_byte(&mut self) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }
}

impl<R: Read> Read for AdlerReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.adler.write_slice(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for AdlerReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // The buffer is still filled, so this does no I/O.
        if let Ok(buf) = self.inner.fill_buf() {
            let n = amt.min(buf.len());
            self.adler.write_slice(&buf[..n]);
        }
        self.inner.consume(amt);
    }
}

// ── Counter ──────────────────────────────────────────────────────────────────

/// Counts bytes flowing through in either direction.
pub struct Counter<T> {
    inner: T,
    count: u64,
}

impl<T> Counter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<W: Write> Write for Counter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<R: Read> Read for Counter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for Counter<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Ok(buf) = self.inner.fill_buf() {
            self.count += amt.min(buf.len()) as u64;
        }
        self.inner.consume(amt);
    }
}
