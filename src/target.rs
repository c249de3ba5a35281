//! Novel target resolution
//!
//! Turns the user's input (a bare category id or a URL containing
//! `cat=<digits>`) into the category id that names the fetch URLs, the
//! slice folder and the output document.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Default site origin
pub const DEFAULT_BASE_URL: &str = "https://thisaccessories.com";

/// Path of the paginated reading view
const READING_PATH: &str = "/reading-base/";

static CATEGORY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cat=(\d+)").expect("category pattern is valid"));

/// Target resolution errors
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("No novel id or URL given")]
    Empty,

    #[error("Invalid novel id: {0:?} (expected letters, digits, '-' or '_')")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, TargetError>;

/// A resolved novel category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelTarget {
    category_id: String,
}

impl NovelTarget {
    /// Parse user input into a target
    ///
    /// A `cat=<digits>` parameter anywhere in the input wins; otherwise the
    /// trimmed input itself is the id.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TargetError::Empty);
        }

        if let Some(caps) = CATEGORY_PARAM.captures(input) {
            return Ok(Self {
                category_id: caps[1].to_string(),
            });
        }

        let valid = input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(TargetError::InvalidId(input.to_string()));
        }

        Ok(Self {
            category_id: input.to_string(),
        })
    }

    /// Category id
    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    /// URL of web page `page` (1-based)
    pub fn page_url(&self, base_url: &str, page: u32) -> String {
        let base = format!(
            "{}{}?cat={}",
            base_url.trim_end_matches('/'),
            READING_PATH,
            self.category_id
        );
        if page <= 1 {
            base
        } else {
            format!("{}&paged={}", base, page)
        }
    }

    /// Slice folder name, e.g. `novel_cat_201`
    pub fn folder_name(&self) -> String {
        format!("novel_cat_{}", self.category_id)
    }

    /// Output document name, e.g. `Novel_Cat_201_Final.pdf`
    pub fn output_file_name(&self) -> String {
        format!("Novel_Cat_{}_Final.pdf", self.category_id)
    }

    /// Slice folder under `output_dir`
    pub fn folder_in(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.folder_name())
    }

    /// Output document path under `output_dir`
    pub fn output_path_in(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_file_name())
    }
}

impl std::fmt::Display for NovelTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.category_id)
    }
}
