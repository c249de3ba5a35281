//! On-disk slice storage
//!
//! The destination folder is the only checkpoint: a slice that exists is
//! never fetched or written again.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{parse_slice_file_name, slice_path, Result, Slice, SliceError};

/// Outcome of a guarded slice write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Slice file was created
    Written,
    /// Slice already existed and was left untouched
    Skipped,
}

/// Slice folder manager
#[derive(Debug, Clone)]
pub struct SliceStore {
    folder: PathBuf,
}

impl SliceStore {
    /// Open an existing slice folder
    pub fn open(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        if !folder.is_dir() {
            return Err(SliceError::FolderNotFound(folder));
        }
        Ok(Self { folder })
    }

    /// Open a slice folder, creating it (and parents) when missing
    pub fn create(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        std::fs::create_dir_all(&folder).map_err(|e| SliceError::io(&folder, e))?;
        Ok(Self { folder })
    }

    /// Folder this store manages
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path a slice with `index` lives at
    pub fn path_for(&self, index: u32) -> PathBuf {
        slice_path(&self.folder, index)
    }

    /// All slices on disk, ascending by index
    pub fn list(&self) -> Result<Vec<Slice>> {
        Ok(self
            .indices()?
            .into_iter()
            .map(|index| Slice {
                index,
                path: self.path_for(index),
            })
            .collect())
    }

    /// Set of slice indices present on disk
    pub fn indices(&self) -> Result<BTreeSet<u32>> {
        let entries = std::fs::read_dir(&self.folder).map_err(|e| SliceError::io(&self.folder, e))?;

        let mut indices = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| SliceError::io(&self.folder, e))?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(parse_slice_file_name) else {
                continue;
            };
            if entry.path().is_file() {
                indices.insert(index);
            }
        }
        Ok(indices)
    }

    /// Number of slices on disk
    pub fn count(&self) -> Result<usize> {
        Ok(self.indices()?.len())
    }

    /// Whether the slice with `index` is already stored
    pub fn exists(&self, index: u32) -> bool {
        self.path_for(index).is_file()
    }

    /// Write slice bytes, truncating any file at that path
    ///
    /// The handle is flushed before returning; on error it is dropped
    /// (and closed) on the way out.
    pub fn write(&self, index: u32, bytes: &[u8]) -> Result<PathBuf> {
        if index == 0 {
            return Err(SliceError::InvalidIndex(index));
        }
        let path = self.path_for(index);
        let file = File::create(&path).map_err(|e| SliceError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(|e| SliceError::io(&path, e))?;
        writer.flush().map_err(|e| SliceError::io(&path, e))?;
        Ok(path)
    }

    /// Write a slice unless it is already on disk
    ///
    /// `produce` only runs for a missing slice, so its bytes are never
    /// decoded for an index that is skipped.
    pub fn write_if_absent<F, E>(
        &self,
        index: u32,
        produce: F,
    ) -> std::result::Result<WriteOutcome, E>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, E>,
        E: From<SliceError>,
    {
        if self.exists(index) {
            debug!(index, "slice already present, skipping");
            return Ok(WriteOutcome::Skipped);
        }
        let bytes = produce()?;
        let path = self.write(index, &bytes)?;
        debug!(index, path = %path.display(), "slice written");
        Ok(WriteOutcome::Written)
    }
}

// ============================================================
// Tests
// ============================================================
