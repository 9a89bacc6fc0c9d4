//! Container entry sources.
//!
//! A container exposes a flat namespace of named entries. One entry holds the
//! JSON header; the others hold either a pre-shaped numeric array or an opaque
//! record blob. The reader that opens the container decides which, so the
//! dispatcher only ever matches on [`RawStreamEntry`].

use crate::types::NumericArray;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors raised by an [`EntrySource`].
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Entry '{name}' is not a numeric array: {source}")]
    InvalidArray {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entry '{0}' has rows of different lengths")]
    RaggedArray(String),
}

impl ContainerError {
    /// True when the entry was read but its content is unusable, as opposed
    /// to the container itself failing.
    pub fn is_malformed_entry(&self) -> bool {
        matches!(self, Self::InvalidArray { .. } | Self::RaggedArray(_))
    }
}

/// A raw entry as handed over by the container reader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStreamEntry {
    /// Pre-shaped 2D numeric array
    Array(NumericArray),
    /// Opaque bytes, either a record blob or the header document
    Blob(Vec<u8>),
    /// Any other entry shape, described by `kind`
    Other { kind: String },
}

impl RawStreamEntry {
    /// Short description of the entry shape, used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Self::Array(_) => "array",
            Self::Blob(_) => "blob",
            Self::Other { kind } => kind,
        }
    }
}

/// Read access to the entries of a container.
pub trait EntrySource {
    /// Names of all entries, header included.
    fn entry_names(&self) -> Result<Vec<String>, ContainerError>;

    /// Reads one entry by name.
    fn read_entry(&self, name: &str) -> Result<RawStreamEntry, ContainerError>;
}

impl<T: EntrySource + ?Sized> EntrySource for &T {
    fn entry_names(&self) -> Result<Vec<String>, ContainerError> {
        (**self).entry_names()
    }

    fn read_entry(&self, name: &str) -> Result<RawStreamEntry, ContainerError> {
        (**self).read_entry(name)
    }
}

/// A container held entirely in memory.
///
/// Entries are listed in name order, like the groups of an HDF5 file.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    entries: BTreeMap<String, RawStreamEntry>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the header document under `"header"`.
    pub fn with_header(self, json: impl Into<Vec<u8>>) -> Self {
        self.with_blob("header", json)
    }

    pub fn with_blob(self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_entry(name, RawStreamEntry::Blob(bytes.into()))
    }

    pub fn with_array(self, name: impl Into<String>, array: NumericArray) -> Self {
        self.with_entry(name, RawStreamEntry::Array(array))
    }

    pub fn with_entry(mut self, name: impl Into<String>, entry: RawStreamEntry) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: RawStreamEntry) {
        self.entries.insert(name.into(), entry);
    }
}

impl EntrySource for MemoryContainer {
    fn entry_names(&self) -> Result<Vec<String>, ContainerError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn read_entry(&self, name: &str) -> Result<RawStreamEntry, ContainerError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::EntryNotFound(name.to_string()))
    }
}

/// A container unpacked into a directory.
///
/// Layout:
/// - `header.json`: the header entry (exposed as `"header"`, configurable)
/// - `<name>.bin`: an opaque record blob
/// - `<name>.json`: a pre-shaped array, as a JSON list of numeric rows
/// - anything else is listed with its extension as the entry kind
///
/// The directory is scanned once when opened. When several files share a
/// name, the first in file name order is used (`gps.bin` before `gps.json`).
#[derive(Debug, Clone)]
pub struct DirContainer {
    header_entry: String,
    files: FileMap,
    shadowed: Vec<PathBuf>,
}

impl DirContainer {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ContainerError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )));
        }
        let (files, shadowed) = scan_files(root)?;
        Ok(Self {
            header_entry: "header".to_string(),
            files,
            shadowed,
        })
    }

    /// Sets the entry whose `.json` file is read as raw header bytes.
    pub fn with_header_entry(mut self, name: impl Into<String>) -> Self {
        self.header_entry = name.into();
        self
    }

    /// Files hidden because an earlier file already took their entry name.
    pub fn shadowed(&self) -> &[PathBuf] {
        &self.shadowed
    }
}

type FileMap = BTreeMap<String, PathBuf>;

/// Maps entry names to file paths, in file name order.
fn scan_files(root: &Path) -> Result<(FileMap, Vec<PathBuf>), ContainerError> {
    let mut paths = Vec::new();
    for dir_entry in fs::read_dir(root)? {
        let path = dir_entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = FileMap::new();
    let mut shadowed = Vec::new();
    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(kept) = files.get(name) {
            warn!(
                "Ignoring {} because {} already provides entry '{}'",
                path.display(),
                kept.display(),
                name
            );
            shadowed.push(path);
        } else {
            files.insert(name.to_string(), path);
        }
    }
    Ok((files, shadowed))
}

impl EntrySource for DirContainer {
    fn entry_names(&self) -> Result<Vec<String>, ContainerError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_entry(&self, name: &str) -> Result<RawStreamEntry, ContainerError> {
        let path = self
            .files
            .get(name)
            .ok_or_else(|| ContainerError::EntryNotFound(name.to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "json" if name == self.header_entry => Ok(RawStreamEntry::Blob(fs::read(path)?)),
            "json" => read_json_array(name, path).map(RawStreamEntry::Array),
            "bin" => Ok(RawStreamEntry::Blob(fs::read(path)?)),
            _ => Ok(RawStreamEntry::Other { kind: extension }),
        }
    }
}

fn read_json_array(name: &str, path: &Path) -> Result<NumericArray, ContainerError> {
    let bytes = fs::read(path)?;
    let rows: Vec<Vec<f64>> =
        serde_json::from_slice(&bytes).map_err(|source| ContainerError::InvalidArray {
            name: name.to_string(),
            source,
        })?;
    NumericArray::from_rows(rows).ok_or_else(|| ContainerError::RaggedArray(name.to_string()))
}
