//! Slice module core types

use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================
// Constants
// ============================================================

/// Number of slices that make up one logical page
pub const GROUP_SIZE: usize = 5;

/// Filename prefix for stored slices
pub const SLICE_PREFIX: &str = "slice_";

/// File extension for stored slices
pub const SLICE_EXTENSION: &str = "jpg";

/// Zero-padding width of the index embedded in slice filenames
pub const INDEX_WIDTH: usize = 5;

// ============================================================
// Error Types
// ============================================================

/// Slice store error types
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("Slice folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("Slice index must be 1-based, got {0}")]
    InvalidIndex(u32),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SliceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SliceError>;

// ============================================================
// Core Data Structures
// ============================================================

/// One decoded image fragment stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Global 1-based slice index
    pub index: u32,
    /// Location of the slice file
    pub path: PathBuf,
}

impl Slice {
    /// Read the raw image bytes of this slice
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| SliceError::io(&self.path, e))
    }
}

/// Filename for a slice index, e.g. `slice_00042.jpg`
pub fn slice_file_name(index: u32) -> String {
    format!(
        "{}{:0width$}.{}",
        SLICE_PREFIX,
        index,
        SLICE_EXTENSION,
        width = INDEX_WIDTH
    )
}

/// Parse the slice index back out of a filename
///
/// Returns `None` for anything that does not follow the slice naming pattern.
pub fn parse_slice_file_name(name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix(SLICE_PREFIX)?
        .strip_suffix(SLICE_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&index| index > 0)
}

/// Full path of a slice inside `folder`
pub fn slice_path(folder: &Path, index: u32) -> PathBuf {
    folder.join(slice_file_name(index))
}

/// Global slice index of the `position`-th (0-based) image on web page `page`
pub fn global_slice_index(page: u32, position: usize) -> u32 {
    (page - 1) * GROUP_SIZE as u32 + position as u32 + 1
}
