//! Turning command-line paths into archive entries.
//!
//! Directories are walked recursively in name order.  Each regular file
//! becomes one [`InputFile`] whose archive name is the lexically cleaned
//! path with `/` separators.  Absolute paths lose their root and leading
//! `../` segments are dropped; both rewrites are logged.

use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::entry::validate_name;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Name stored in the archive.
    pub name:        String,
    /// Where to read the contents from.
    pub path:        PathBuf,
    pub permissions: u16,
}

/// Expand `paths` into the files to archive, in argument order.
pub fn collect<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for path in paths {
        add_path(path.as_ref(), &mut files, &mut seen)?;
    }
    Ok(files)
}

fn add_path(path: &Path, files: &mut Vec<InputFile>, seen: &mut HashSet<String>) -> Result<()> {
    let meta = fs::metadata(path)?;

    if meta.is_dir() {
        let mut children = fs::read_dir(path)?
            .map(|e| e.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        children.sort();
        for child in children {
            add_path(&child, files, seen)?;
        }
        return Ok(());
    }

    if !meta.is_file() {
        return Err(Error::UnsupportedFileType(path.to_owned()));
    }

    let name = archive_name(path);
    validate_name(&name)?;
    if !seen.insert(name.clone()) {
        return Err(Error::DuplicateName(name));
    }
    files.push(InputFile {
        name,
        path: path.to_owned(),
        permissions: permissions(&meta),
    });
    Ok(())
}

/// Archive name for `path`: cleaned, relative, `/`-separated.
pub fn archive_name(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut rewritten = false;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => rewritten = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    rewritten = true;
                }
            }
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
        }
    }

    let name = parts.join("/");
    if rewritten {
        warn!("'{}' => '{}'", path.display(), name);
    }
    name
}

#[cfg(unix)]
fn permissions(meta: &Metadata) -> u16 {
    use std::os::unix::fs::PermissionsExt;
    (meta.permissions().mode() & 0o777) as u16
}

#[cfg(not(unix))]
fn permissions(meta: &Metadata) -> u16 {
    if meta.permissions().readonly() {
        0o444
    } else {
        crate::entry::DEFAULT_PERMISSIONS
    }
}
