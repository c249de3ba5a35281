//! Slice storage module
//!
//! A slice is one decoded image fragment, saved as `slice_NNNNN.jpg` where
//! `NNNNN` is its zero-padded global index. Five consecutive slices make up
//! one logical page.
//!
//! # Example
//!
//! ```rust,no_run
//! use slicebook::{RunState, SliceStore};
//!
//! let store = SliceStore::create("novel_cat_201").unwrap();
//! let state = RunState::from_indices(&store.indices().unwrap());
//! println!("Resuming from web page {}", state.resume_page);
//! ```

mod run_state;
mod store;
mod types;

pub use run_state::RunState;
pub use store::{SliceStore, WriteOutcome};
pub use types::{
    global_slice_index, parse_slice_file_name, slice_file_name, slice_path, Result, Slice,
    SliceError, GROUP_SIZE, INDEX_WIDTH, SLICE_EXTENSION, SLICE_PREFIX,
};
