//! Page fetch module
//!
//! Walks the paginated reading view one web page at a time, turning every
//! inline `data:image` source into a numbered slice on disk.
//!
//! # Components
//!
//! - [`PageSource`] / [`HttpPageSource`] - page retrieval
//! - [`extract_embedded_images`] / [`decode_data_uri`] - HTML to image bytes
//! - [`FetchState`] - explicit state machine (`Fetching` / `Done`)
//! - [`RetryPolicy`] - what to do about transient failures
//! - [`ShutdownCoordinator`] - cooperative Ctrl-C handling
//! - [`FetchLoop`] - ties the above together

mod extract;
mod fetch_loop;
mod retry;
mod shutdown;
mod source;
mod state;
mod types;

pub use extract::{decode_data_uri, extract_embedded_images};
pub use fetch_loop::FetchLoop;
pub use retry::{policy_for, FixedInterval, Limited, RetryPolicy};
pub use shutdown::{wait_for_shutdown_signal, ShutdownCoordinator};
pub use source::{HttpPageSource, HttpSourceOptions, PageSource};
pub use state::{FetchState, LoopEvent, Transition};
pub use types::{
    EmbeddedImageError, FetchError, FetchLoopError, FetchReport, FetchTiming, PageBody,
    StopReason, DEFAULT_POLITENESS_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_USER_AGENT,
};
