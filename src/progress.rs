//! Progress reporting for a download-and-assemble run.
//!
//! Library code reports through [`ProgressCallback`]; the binary plugs in
//! [`ConsoleProgress`], tests use [`NoProgress`].

use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::fetch::{FetchError, StopReason};
use crate::slice::RunState;

/// Processing stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Resolving the target and reading the slice folder
    #[default]
    Initializing,
    /// Downloading pages and saving slices
    Fetching,
    /// Stacking slices into full pages
    Stitching,
    /// Writing the PDF
    WritingPdf,
    /// Completed
    Completed,
}

impl ProcessingStage {
    /// Get the name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "Initializing",
            ProcessingStage::Fetching => "Fetching",
            ProcessingStage::Stitching => "Stitching",
            ProcessingStage::WritingPdf => "WritingPdf",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Get a short description of the stage
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "reading slice folder",
            ProcessingStage::Fetching => "downloading pages",
            ProcessingStage::Stitching => "rebuilding pages",
            ProcessingStage::WritingPdf => "writing PDF",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (page-level lines)
    #[default]
    Normal,
    /// Verbose output (stages and per-page slice counts)
    Verbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            _ => OutputMode::Verbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, _) => true,
            _ => false,
        }
    }
}

/// Receives progress events from the fetch loop, reassembler and pipeline
///
/// Every method has an empty default.
pub trait ProgressCallback {
    /// A new stage begins
    fn on_stage(&self, _stage: ProcessingStage) {}

    /// The run resumes from the slices already on disk
    fn on_resume(&self, _category_id: &str, _folder: &Path, _state: &RunState) {}

    /// A web page's slices were stored
    fn on_page_saved(&self, _page: u32, _written: usize, _skipped: usize) {}

    /// A fetch failed and will be retried after `delay`
    fn on_retry(&self, _page: u32, _attempt: u32, _error: &FetchError, _delay: Duration) {}

    /// The fetch phase ended
    fn on_fetch_stopped(&self, _reason: &StopReason) {}

    /// Stitching starts over `slices` slices forming `pages` full pages
    fn on_stitch_start(&self, _slices: usize, _pages: usize) {}

    /// One composite page is done
    fn on_stitch_progress(&self, _done: usize, _total: usize) {}

    /// The output document was written
    fn on_document_written(&self, _path: &Path, _pages: usize) {}
}

/// Progress sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

/// Console progress output for the CLI
pub struct ConsoleProgress {
    output_mode: OutputMode,
    stitch_bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new(output_mode: OutputMode) -> Self {
        Self {
            output_mode,
            stitch_bar: Mutex::new(None),
        }
    }

    fn show(&self, required: OutputMode) -> bool {
        self.output_mode.should_show(required)
    }

    fn finish_bar(&self) {
        if let Ok(mut bar) = self.stitch_bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish();
            }
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_stage(&self, stage: ProcessingStage) {
        if self.show(OutputMode::Verbose) {
            println!("  Stage: {}", stage);
        }
    }

    fn on_resume(&self, category_id: &str, folder: &Path, state: &RunState) {
        if self.show(OutputMode::Normal) {
            println!();
            println!("--- Starting Scraper for Category: {} ---", category_id);
            println!("Saving to: {}", folder.display());
            println!("Resuming from Web Page: {}", state.resume_page);
            println!();
        }
    }

    fn on_page_saved(&self, page: u32, written: usize, skipped: usize) {
        if self.show(OutputMode::Verbose) {
            println!(
                "Done: Page {} ({} new, {} already present)",
                page, written, skipped
            );
        } else if self.show(OutputMode::Normal) {
            println!("Done: Page {}", page);
        }
    }

    fn on_retry(&self, _page: u32, _attempt: u32, error: &FetchError, delay: Duration) {
        if self.show(OutputMode::Normal) {
            println!(
                "\n[Connection Issue] {}. Retrying in {}s...",
                error,
                delay.as_secs_f64()
            );
        }
    }

    fn on_fetch_stopped(&self, reason: &StopReason) {
        if !self.show(OutputMode::Normal) {
            return;
        }
        match reason {
            StopReason::NotFound { .. } => println!("\nReached the end of the novel (404)."),
            StopReason::NoImages { .. } => println!("No more images found on this page."),
            StopReason::Interrupted { .. } => {
                println!("\nInterrupted. Building PDF from slices collected so far...")
            }
            StopReason::RetriesExhausted { page, attempts } => println!(
                "\nGave up on page {} after {} failed attempts. Building PDF from slices collected so far...",
                page, attempts
            ),
        }
    }

    fn on_stitch_start(&self, slices: usize, pages: usize) {
        if !self.show(OutputMode::Normal) {
            return;
        }
        println!("\nStitching {} slices into gap-free pages...", slices);
        let bar = crate::cli::create_page_progress_bar(pages as u64);
        if let Ok(mut slot) = self.stitch_bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_stitch_progress(&self, done: usize, total: usize) {
        if let Ok(bar) = self.stitch_bar.lock() {
            if let Some(bar) = bar.as_ref() {
                bar.set_position(done as u64);
            }
        }
        if done == total {
            self.finish_bar();
        }
    }

    fn on_document_written(&self, path: &Path, _pages: usize) {
        self.finish_bar();
        if self.show(OutputMode::Normal) {
            println!("\nSUCCESS! Created: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_stage_name() {
        assert_eq!(ProcessingStage::Initializing.name(), "Initializing");
        assert_eq!(ProcessingStage::Fetching.name(), "Fetching");
        assert_eq!(ProcessingStage::Stitching.name(), "Stitching");
        assert_eq!(ProcessingStage::WritingPdf.name(), "WritingPdf");
        assert_eq!(ProcessingStage::Completed.name(), "Completed");
    }

    #[test]
    fn test_processing_stage_display() {
        let display = format!("{}", ProcessingStage::Fetching);
        assert_eq!(display, "Fetching (downloading pages)");
    }

    #[test]
    fn test_processing_stage_default() {
        let stage: ProcessingStage = Default::default();
        assert_eq!(stage, ProcessingStage::Initializing);
    }

    #[test]
    fn test_output_mode_from_verbosity() {
        assert_eq!(OutputMode::from_verbosity(0), OutputMode::Normal);
        assert_eq!(OutputMode::from_verbosity(1), OutputMode::Verbose);
        assert_eq!(OutputMode::from_verbosity(3), OutputMode::Verbose);
    }

    #[test]
    fn test_output_mode_quiet() {
        let mode = OutputMode::Quiet;
        assert!(!mode.should_show(OutputMode::Quiet));
        assert!(!mode.should_show(OutputMode::Normal));
        assert!(!mode.should_show(OutputMode::Verbose));
    }

    #[test]
    fn test_output_mode_normal() {
        let mode = OutputMode::Normal;
        assert!(mode.should_show(OutputMode::Normal));
        assert!(!mode.should_show(OutputMode::Verbose));
    }

    #[test]
    fn test_output_mode_verbose() {
        let mode = OutputMode::Verbose;
        assert!(mode.should_show(OutputMode::Normal));
        assert!(mode.should_show(OutputMode::Verbose));
    }

    #[test]
    fn test_quiet_console_progress_is_silent() {
        // Nothing to assert on stdout; this exercises every callback without
        // creating a progress bar.
        let progress = ConsoleProgress::new(OutputMode::Quiet);
        progress.on_stage(ProcessingStage::Fetching);
        progress.on_page_saved(1, 5, 0);
        progress.on_stitch_start(10, 2);
        progress.on_stitch_progress(2, 2);
        assert!(progress.stitch_bar.lock().unwrap().is_none());
    }
}
