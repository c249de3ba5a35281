//! Fetch module core types

use std::time::Duration;
use thiserror::Error;

use crate::slice::SliceError;

// ============================================================
// Constants
// ============================================================

/// Desktop browser User-Agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default delay between successfully fetched pages in milliseconds
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 500;

/// Default wait before retrying a failed fetch in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;

// ============================================================
// Error Types
// ============================================================

/// Transient page fetch failure; the retry policy decides what follows
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Embedded image decoding errors
#[derive(Debug, Error)]
pub enum EmbeddedImageError {
    #[error("data URI has no payload separator")]
    MissingPayload,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("empty image payload")]
    EmptyPayload,
}

/// Fatal fetch loop errors
#[derive(Debug, Error)]
pub enum FetchLoopError {
    #[error("Slice {index} on page {page} could not be decoded: {source}")]
    Decode {
        page: u32,
        index: u32,
        source: EmbeddedImageError,
    },

    #[error(transparent)]
    Store(#[from] SliceError),
}

pub type Result<T> = std::result::Result<T, FetchLoopError>;

// ============================================================
// Core Data Structures
// ============================================================

/// Body of a successfully retrieved page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBody {
    /// HTML document
    Html(String),
    /// The site signalled there is no such page (HTTP 404)
    NotFound,
}

/// Why the fetch phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The site answered 404 for this page
    NotFound { page: u32 },
    /// The page was fetched but carried no embedded images
    NoImages { page: u32 },
    /// The user asked to stop
    Interrupted { page: u32 },
    /// The retry policy gave up on this page
    RetriesExhausted { page: u32, attempts: u32 },
}

impl StopReason {
    /// Page number the loop was on when it stopped
    pub fn page(&self) -> u32 {
        match self {
            StopReason::NotFound { page }
            | StopReason::NoImages { page }
            | StopReason::Interrupted { page }
            | StopReason::RetriesExhausted { page, .. } => *page,
        }
    }

    /// Whether the site itself signalled the end of content
    pub fn is_end_of_content(&self) -> bool {
        matches!(
            self,
            StopReason::NotFound { .. } | StopReason::NoImages { .. }
        )
    }
}

/// Summary of a completed fetch phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Web pages whose slices were saved
    pub pages_fetched: u32,
    /// Slice files created during this run
    pub slices_written: usize,
    /// Slices skipped because they were already on disk
    pub slices_skipped: usize,
    /// Failed fetch attempts that were retried or gave up
    pub transient_failures: u32,
    /// How the phase ended
    pub stop: StopReason,
}

/// Timing knobs of the fetch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTiming {
    /// Pause after each saved page
    pub politeness_delay: Duration,
}

impl Default for FetchTiming {
    fn default() -> Self {
        Self {
            politeness_delay: Duration::from_millis(DEFAULT_POLITENESS_DELAY_MS),
        }
    }
}

impl FetchTiming {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            politeness_delay: Duration::ZERO,
        }
    }
}
