//! slicebook - rebuild sliced web novels as PDF
//!
//! The reading view of the site splits every book page into
//! [`GROUP_SIZE`] horizontal image slices embedded inline as `data:image`
//! URIs. This crate downloads those slices page by page, keeps them on disk
//! so an interrupted run can resume, stacks each group of slices back into a
//! full page and writes the pages out as one PDF.
//!
//! # Modules
//!
//! - [`target`] - novel id / URL parsing and naming
//! - [`slice`] - slice folder on disk and resume state
//! - [`fetch`] - page retrieval, image extraction, retry and shutdown
//! - [`reassemble`] - grouping and stitching slices into pages
//! - [`pdf_writer`] - PDF output
//! - [`pipeline`] - the whole run
//! - [`progress`], [`config`], [`cli`] - CLI support
//!
//! # Example
//!
//! ```no_run
//! use slicebook::{Config, NoProgress, NovelTarget, Pipeline};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let target = NovelTarget::parse("https://thisaccessories.com/reading-base/?cat=201")?;
//! let result = Pipeline::new(Config::default())
//!     .run(&target, false, &NoProgress)
//!     .await?;
//! println!("{} pages -> {}", result.page_count, result.output_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Exit codes
//!
//! ```rust
//! use slicebook::ExitCode;
//!
//! assert_eq!(ExitCode::Success.code(), 0);
//! assert_eq!(ExitCode::Interrupted.code(), 130);
//! ```

pub mod cli;
pub mod config;
pub mod fetch;
pub mod pdf_writer;
pub mod pipeline;
pub mod progress;
pub mod reassemble;
pub mod slice;
pub mod target;

// Re-exports for convenience
pub use cli::{create_page_progress_bar, init_tracing, Cli, ExitCode, LogFormat};
pub use config::{CliOverrides, Config, ConfigError, FetchConfig, OutputConfig};
pub use fetch::{
    policy_for, wait_for_shutdown_signal, FetchError, FetchLoop, FetchLoopError, FetchReport,
    FetchState, FetchTiming, FixedInterval, HttpPageSource, HttpSourceOptions, Limited, PageBody,
    PageSource, RetryPolicy, ShutdownCoordinator, StopReason,
};
pub use pdf_writer::{DocumentBuilder, DocumentSummary, PdfWriterError, PdfWriterOptions};
pub use pipeline::{Pipeline, PipelineError, PipelineResult};
pub use progress::{ConsoleProgress, NoProgress, OutputMode, ProcessingStage, ProgressCallback};
pub use reassemble::{
    group_slices, stitch, CompositePage, PageReassembler, ReassembleError, SliceGroup,
};
pub use slice::{RunState, Slice, SliceError, SliceStore, WriteOutcome, GROUP_SIZE};
pub use target::{NovelTarget, TargetError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_types_accessible() {
        let _ = Config::default();
        let _ = PdfWriterOptions::builder().dpi(144).build();
        let _ = RunState::default();
        let _ = ShutdownCoordinator::new();
        let _ = OutputMode::default();
        let _: Box<dyn ProgressCallback> = Box::new(NoProgress);
    }

    #[test]
    fn test_group_size() {
        assert_eq!(GROUP_SIZE, 5);
    }

    #[test]
    fn test_exit_code_values_are_distinct() {
        let codes = [
            ExitCode::Success,
            ExitCode::GeneralError,
            ExitCode::Interrupted,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
