//! Flat record file: whole-file load and atomic rewrite

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::properties;
use crate::error::Result;

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// The temp file is flushed to disk before the rename, so a crash leaves
/// either the old file or the new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// A `key=value` record file on disk. Holds no cached state.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create an empty file if none exists. Returns whether this call created it.
    pub fn create_if_missing(&self) -> Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(_) => {
                debug!("Created empty record file at {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every record. An absent or empty file holds zero records.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No record file at {:?}", self.path);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        // ISO-8859-1, like every .properties reader; what we write is ASCII
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        let records = properties::parse(&text)?;

        debug!("Loaded {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Rewrite the whole file with `records`
    pub fn save(&self, records: &BTreeMap<String, String>) -> Result<()> {
        let contents = properties::write(records);
        write_atomic(&self.path, contents.as_bytes())?;

        debug!("Saved {} records to {:?}", records.len(), self.path);
        Ok(())
    }
}
