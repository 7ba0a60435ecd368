//! File-level API on top of [`BarWriter`] and [`BarReader`].
//!
//! ```no_run
//! use bar::archive::{self, ExtractOptions, PackOptions};
//!
//! let entries = archive::pack("out.bar", &["docs", "README.md"], &PackOptions::default())?;
//! for e in archive::list("out.bar")? {
//!     println!("{} {:o} {:.2}%", e.name(), e.permissions(), e.ratio() * 100.0);
//! }
//! let report = archive::extract("out.bar", &ExtractOptions::default())?;
//! assert!(report.corrupt.is_empty());
//! # let _ = entries;
//! # Ok::<(), bar::Error>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use tracing::{debug, info, warn};

use crate::entry::{validate_name, Entry};
use crate::error::{Error, Result};
use crate::inputs;
use crate::io_stream::{BarReader, BarWriter};

// ── Options ──────────────────────────────────────────────────────────────────

/// Configuration for [`pack`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// DEFLATE level, 0 (store) to 9 (best).
    pub level:     u32,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { level: 9, overwrite: false }
    }
}

/// Configuration for [`extract`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory the entry names are resolved against.
    pub dest:      PathBuf,
    /// Extract only this entry.
    pub name:      Option<String>,
    /// Replace existing files.
    pub overwrite: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { dest: PathBuf::from("."), name: None, overwrite: false }
    }
}

/// Outcome of [`extract`].
#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub extracted: Vec<String>,
    /// Entries written out whose checksum did not verify.
    pub corrupt:   Vec<String>,
    /// Entries whose stream ended before their recorded size.
    pub truncated: Vec<String>,
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Archive `paths` (files or directories) into `output`.
///
/// A partially written output is removed on failure.
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    output: P,
    paths:  &[Q],
    opts:   &PackOptions,
) -> Result<Vec<Entry>> {
    let output = output.as_ref();
    check_target(output, opts.overwrite)?;
    let files = inputs::collect(paths)?;

    let sink = BufWriter::new(File::create(output)?);
    let res = write_files(sink, &files, opts.level);
    if res.is_err() {
        if let Err(e) = fs::remove_file(output) {
            warn!("unable to remove partial archive '{}': {e}", output.display());
        }
    }
    res
}

fn write_files<W: Write>(sink: W, files: &[inputs::InputFile], level: u32) -> Result<Vec<Entry>> {
    let mut writer = BarWriter::with_level(sink, Compression::new(level.min(9)))?;
    for file in files {
        let size = writer.add(&file.name, file.permissions, File::open(&file.path)?)?;
        debug!(name = %file.name, size, "packed");
    }
    writer.close()?;
    info!(entries = writer.entries().len(), bytes = writer.position(), "archive written");
    Ok(writer.entries().to_vec())
}

/// Entries of the archive at `path`, in stored order.
pub fn list<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>> {
    let reader = open(path.as_ref())?;
    Ok(reader.entries().to_vec())
}

/// Extract the archive at `path`.
///
/// Every target is checked for conflicts before anything is written.  An
/// entry whose checksum fails is still written out, logged, and listed in
/// [`ExtractReport::corrupt`]; one whose stream runs out before its recorded
/// size is listed in [`ExtractReport::truncated`].  The remaining entries are
/// extracted normally.
pub fn extract<P: AsRef<Path>>(path: P, opts: &ExtractOptions) -> Result<ExtractReport> {
    let mut reader = open(path.as_ref())?;

    let selected: Vec<Entry> = match &opts.name {
        Some(name) => vec![reader
            .find(name)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(name.clone()))?],
        None => reader.entries().to_vec(),
    };

    for entry in &selected {
        validate_name(entry.name())?;
        check_target(&opts.dest.join(entry.name()), opts.overwrite)?;
    }

    let mut report = ExtractReport::default();
    for entry in &selected {
        let target = opts.dest.join(entry.name());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(create_file(&target, entry.permissions())?);

        let mut view = reader.entry_reader(entry)?;
        let copied = io::copy(&mut view, &mut out);
        match view.close() {
            Ok(()) => match copied {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!("File '{}' is shorter than its recorded size", entry.name());
                    report.truncated.push(entry.name().to_owned());
                }
                Err(e) => return Err(e.into()),
            },
            Err(e) if e.is_entry_checksum() => {
                warn!("Invalid checksum for file '{}'", entry.name());
                report.corrupt.push(entry.name().to_owned());
            }
            Err(e) => return Err(e),
        }
        out.flush()?;
        report.extracted.push(entry.name().to_owned());
    }
    Ok(report)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<BarReader<BufReader<File>>> {
    BarReader::new(BufReader::new(File::open(path)?))
}

/// Refuse to clobber `path` unless `overwrite` is set.
fn check_target(path: &Path, overwrite: bool) -> Result<()> {
    match fs::metadata(path) {
        Ok(_) if !overwrite => Err(Error::AlreadyExists(path.to_owned())),
        Ok(meta) if meta.is_dir() => Err(Error::IsDirectory(path.to_owned())),
        Ok(_) => {
            warn!("Overwriting file '{}'", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn create_file(path: &Path, permissions: u16) -> Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(u32::from(permissions));
    }
    #[cfg(not(unix))]
    let _ = permissions;
    Ok(opts.open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Footer;
    use crate::stream::EntryEncoder;

    #[test]
    fn refuses_to_clobber_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"data").unwrap();
        let out = dir.path().join("out.bar");
        fs::write(&out, b"precious").unwrap();

        let err = pack(&out, &[&input], &PackOptions::default()).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(fs::read(&out).unwrap(), b"precious");

        let opts = PackOptions { overwrite: true, ..PackOptions::default() };
        assert_eq!(pack(&out, &[&input], &opts).unwrap().len(), 1);
    }

    #[test]
    fn extract_checks_all_targets_first() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.bar");
        let mut w = BarWriter::new(File::create(&archive).unwrap()).unwrap();
        w.add("first", 0o644, &b"1"[..]).unwrap();
        w.add("second", 0o644, &b"2"[..]).unwrap();
        w.close().unwrap();

        let dest = dir.path().join("out");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("second"), b"keep").unwrap();

        let opts = ExtractOptions { dest: dest.clone(), ..ExtractOptions::default() };
        assert!(matches!(extract(&archive, &opts), Err(Error::AlreadyExists(_))));
        assert!(!dest.join("first").exists());
    }

    #[test]
    fn directory_in_the_way_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.bar");
        let mut w = BarWriter::new(File::create(&archive).unwrap()).unwrap();
        w.add("thing", 0o644, &b"1"[..]).unwrap();
        w.close().unwrap();

        let dest = dir.path().join("out");
        fs::create_dir_all(dest.join("thing")).unwrap();
        let opts = ExtractOptions { dest, name: None, overwrite: true };
        assert!(matches!(extract(&archive, &opts), Err(Error::IsDirectory(_))));
    }

    #[test]
    fn unknown_entry_name() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.bar");
        BarWriter::new(File::create(&archive).unwrap()).unwrap().close().unwrap();
        let opts = ExtractOptions {
            dest: dir.path().to_owned(),
            name: Some("ghost".into()),
            overwrite: false,
        };
        assert!(matches!(extract(&archive, &opts), Err(Error::EntryNotFound(_))));
    }

    #[test]
    fn short_entry_is_reported_and_extraction_continues() {
        let mut w = BarWriter::new(Vec::new()).unwrap();
        w.add("short", 0o644, &b"abc"[..]).unwrap();
        w.add("whole", 0o644, &b"intact"[..]).unwrap();
        w.close().unwrap();
        let entries = w.entries().to_vec();
        let source = w.finish().unwrap();

        // Rewrite the table so "short" claims two more bytes than it holds.
        let table_offset = entries[1].offset() + entries[1].compressed_size();
        let mut bytes = source[..table_offset as usize].to_vec();
        let mut table = EntryEncoder::new(Vec::new(), Compression::best());
        let mut record = Vec::new();
        entries[0].encode_record(&mut record).unwrap();
        record[8..16].copy_from_slice(&5u64.to_le_bytes());
        table.write_all(&record).unwrap();
        entries[1].encode_record(&mut table).unwrap();
        let (table, summary) = table.finish().unwrap();
        bytes.extend_from_slice(&table);
        Footer { table_offset, table_checksum: summary.checksum, entry_count: 2 }
            .write(&mut bytes)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("short.bar");
        fs::write(&archive, bytes).unwrap();
        let dest = dir.path().join("out");
        let opts = ExtractOptions { dest: dest.clone(), ..ExtractOptions::default() };

        let report = extract(&archive, &opts).unwrap();
        assert_eq!(report.truncated, ["short"]);
        assert!(report.corrupt.is_empty());
        assert_eq!(report.extracted, ["short", "whole"]);
        assert_eq!(fs::read(dest.join("short")).unwrap(), b"abc");
        assert_eq!(fs::read(dest.join("whole")).unwrap(), b"intact");
    }
}
