//! Run orchestration
//!
//! One run goes through four steps in order:
//!
//! 1. Open (or create) the slice folder and derive the [`RunState`]
//! 2. Fetch pages from the resume page until the fetch phase stops
//! 3. Rebuild composite pages from every complete slice group on disk
//! 4. Write the composite pages to the output PDF
//!
//! An interrupted or exhausted fetch still continues with steps 3 and 4.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::cli::ExitCode;
use crate::config::Config;
use crate::fetch::{
    policy_for, FetchError, FetchLoop, FetchLoopError, FetchReport, FetchTiming, HttpPageSource,
    PageSource, ShutdownCoordinator,
};
use crate::pdf_writer::{DocumentBuilder, PdfWriterError};
use crate::progress::{ProcessingStage, ProgressCallback};
use crate::reassemble::{PageReassembler, ReassembleError};
use crate::slice::{RunState, SliceError, SliceStore, GROUP_SIZE};
use crate::target::{NovelTarget, TargetError};

// ============================================================
// Error Types
// ============================================================

/// Pipeline error types
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Slice(#[from] SliceError),

    #[error("Failed to set up HTTP client: {0}")]
    Client(#[from] FetchError),

    #[error(transparent)]
    Fetch(#[from] FetchLoopError),

    #[error(transparent)]
    Reassemble(#[from] ReassembleError),

    #[error(transparent)]
    Pdf(#[from] PdfWriterError),

    #[error("{}", insufficient_message(.found))]
    InsufficientSlices { found: usize },
}

fn insufficient_message(found: &usize) -> String {
    if *found == 0 {
        "No slices found to combine".to_string()
    } else {
        format!(
            "Only {} slice(s) found, need at least {} slices for one page",
            found, GROUP_SIZE
        )
    }
}

impl PipelineError {
    /// Outcomes that are reported to the user but are not faults
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            PipelineError::Target(_) | PipelineError::InsufficientSlices { .. }
        )
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> ExitCode {
        if self.is_handled() {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================
// Result
// ============================================================

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Novel this run was for
    pub target: NovelTarget,
    /// Slice folder
    pub folder: PathBuf,
    /// Written PDF
    pub output_path: PathBuf,
    /// Pages in the PDF
    pub page_count: usize,
    /// Slices on disk when reassembly started
    pub slice_count: usize,
    /// Trailing slices that did not fill a group
    pub dropped_slices: usize,
    /// PDF size in bytes
    pub output_size: u64,
    /// Fetch phase report, absent when fetching was skipped
    pub fetch: Option<FetchReport>,
}

// ============================================================
// Pipeline
// ============================================================

/// Store, fetch, reassemble and write for one novel
pub struct Pipeline {
    config: Config,
    shutdown: ShutdownCoordinator,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Use an externally owned shutdown coordinator
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Fetch over HTTP (unless `skip_fetch`) and build the PDF
    pub async fn run(
        &self,
        target: &NovelTarget,
        skip_fetch: bool,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineResult> {
        if skip_fetch {
            return self.rebuild(target, progress);
        }
        let source = HttpPageSource::new(target.clone(), &self.config.http_options())?;
        self.run_with_source(target, &source, progress).await
    }

    /// Fetch from `source` and build the PDF
    pub async fn run_with_source<S: PageSource>(
        &self,
        target: &NovelTarget,
        source: &S,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineResult> {
        progress.on_stage(ProcessingStage::Initializing);
        let (store, run_state) = self.prepare(target)?;
        progress.on_resume(target.category_id(), store.folder(), &run_state);

        progress.on_stage(ProcessingStage::Fetching);
        let policy = policy_for(self.config.retry_delay(), self.config.fetch.max_retries);
        let timing = FetchTiming {
            politeness_delay: self.config.politeness_delay(),
        };
        let report = FetchLoop::new(source, &store, policy.as_ref(), timing, self.shutdown.clone())
            .run(&run_state, progress)
            .await?;
        if !report.stop.is_end_of_content() {
            warn!(
                stop = ?report.stop,
                "fetch stopped before the end of the novel, run again to resume"
            );
        }

        let mut result = self.assemble(target, &store, progress)?;
        result.fetch = Some(report);
        Ok(result)
    }

    /// Build the PDF from slices already on disk
    pub fn rebuild(
        &self,
        target: &NovelTarget,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineResult> {
        progress.on_stage(ProcessingStage::Initializing);
        let folder = target.folder_in(&self.config.output.output_dir);
        let store = match SliceStore::open(&folder) {
            Ok(store) => store,
            Err(SliceError::FolderNotFound(_)) => {
                return Err(PipelineError::InsufficientSlices { found: 0 })
            }
            Err(e) => return Err(e.into()),
        };
        info!(folder = %folder.display(), "skipping fetch, rebuilding from disk");
        self.assemble(target, &store, progress)
    }

    /// Open the slice folder and derive where to resume
    pub fn prepare(&self, target: &NovelTarget) -> Result<(SliceStore, RunState)> {
        let folder = target.folder_in(&self.config.output.output_dir);
        let store = SliceStore::create(&folder)?;
        let run_state = RunState::from_indices(&store.indices()?);

        if !run_state.is_dense() {
            warn!(
                gaps = ?run_state.gaps,
                "slice numbering has gaps, resume page is based on the slice count"
            );
        }
        info!(
            novel = %target,
            folder = %folder.display(),
            slices = run_state.slice_count,
            resume_page = run_state.resume_page,
            "run prepared"
        );
        Ok((store, run_state))
    }

    /// Reassemble pages and write the PDF
    fn assemble(
        &self,
        target: &NovelTarget,
        store: &SliceStore,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineResult> {
        let slice_count = store.count()?;
        if slice_count < GROUP_SIZE {
            return Err(PipelineError::InsufficientSlices { found: slice_count });
        }

        progress.on_stage(ProcessingStage::Stitching);
        let pages = PageReassembler::reassemble(store, progress)?;

        progress.on_stage(ProcessingStage::WritingPdf);
        let output_path = target.output_path_in(&self.config.output.output_dir);
        let summary = DocumentBuilder::write(&pages, &output_path, &self.config.pdf_options())?;
        progress.on_document_written(&summary.path, summary.page_count);
        progress.on_stage(ProcessingStage::Completed);

        Ok(PipelineResult {
            target: target.clone(),
            folder: store.folder().to_path_buf(),
            output_path: summary.path,
            page_count: summary.page_count,
            slice_count,
            dropped_slices: slice_count - summary.page_count * GROUP_SIZE,
            output_size: summary.output_size,
            fetch: None,
        })
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{PageBody, StopReason};
    use crate::progress::NoProgress;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct PagesThenNotFound {
        pages: Mutex<VecDeque<Vec<Vec<u8>>>>,
    }

    impl PagesThenNotFound {
        fn new(pages: Vec<Vec<Vec<u8>>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
            }
        }
    }

    impl PageSource for PagesThenNotFound {
        async fn fetch_page(&self, _page: u32) -> std::result::Result<PageBody, FetchError> {
            let next = self.pages.lock().unwrap().pop_front();
            Ok(match next {
                Some(slices) => {
                    let imgs: String = slices
                        .iter()
                        .map(|b| {
                            format!(r#"<img src="data:image/png;base64,{}">"#, STANDARD.encode(b))
                        })
                        .collect();
                    PageBody::Html(format!(r#"<div id="primary">{}</div>"#, imgs))
                }
                None => PageBody::NotFound,
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn test_config(output_dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.output_dir = output_dir.to_path_buf();
        config.fetch.politeness_delay_ms = 0;
        config.fetch.retry_delay_ms = 0;
        config
    }

    fn target() -> NovelTarget {
        NovelTarget::parse("201").unwrap()
    }

    #[tokio::test]
    async fn test_one_page_then_not_found_gives_one_page_pdf() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(test_config(dir.path()));
        let source = PagesThenNotFound::new(vec![(0..5).map(|i| png(8, 2 + i)).collect()]);

        let result = pipeline
            .run_with_source(&target(), &source, &NoProgress)
            .await
            .unwrap();

        assert_eq!(result.page_count, 1);
        assert_eq!(result.slice_count, 5);
        assert_eq!(result.dropped_slices, 0);
        assert_eq!(result.output_path, dir.path().join("Novel_Cat_201_Final.pdf"));
        assert!(result.output_path.exists());
        assert_eq!(
            result.fetch.as_ref().map(|r| r.stop.clone()),
            Some(StopReason::NotFound { page: 2 })
        );

        let doc = lopdf::Document::load(&result.output_path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_three_slices_fails_without_output() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(test_config(dir.path()));
        let source = PagesThenNotFound::new(vec![(0..3).map(|_| png(4, 4)).collect()]);

        let err = pipeline
            .run_with_source(&target(), &source, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InsufficientSlices { found: 3 }));
        assert!(err.is_handled());
        assert_eq!(err.exit_code(), ExitCode::Success);
        assert!(!dir.path().join("Novel_Cat_201_Final.pdf").exists());
    }

    #[tokio::test]
    async fn test_resume_adds_to_existing_slices() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let store = SliceStore::create(target().folder_in(dir.path())).unwrap();
        for index in 1..=7 {
            store.write(index, &png(6, 3)).unwrap();
        }

        let pipeline = Pipeline::new(config);
        let source = PagesThenNotFound::new(vec![(0..5).map(|_| png(6, 3)).collect()]);
        let result = pipeline
            .run_with_source(&target(), &source, &NoProgress)
            .await
            .unwrap();

        let report = result.fetch.unwrap();
        assert_eq!(report.slices_skipped, 2);
        assert_eq!(report.slices_written, 3);
        assert_eq!(result.slice_count, 10);
        assert_eq!(result.page_count, 2);
    }

    #[tokio::test]
    async fn test_interrupted_run_still_writes_pdf() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(target().folder_in(dir.path())).unwrap();
        for index in 1..=6 {
            store.write(index, &png(5, 5)).unwrap();
        }

        let pipeline = Pipeline::new(test_config(dir.path()));
        pipeline.shutdown().trigger_shutdown();
        let source = PagesThenNotFound::new(vec![]);
        let result = pipeline
            .run_with_source(&target(), &source, &NoProgress)
            .await
            .unwrap();

        let stop = result.fetch.unwrap().stop;
        assert_eq!(stop, StopReason::Interrupted { page: 2 });
        assert!(!stop.is_end_of_content());
        assert_eq!(result.page_count, 1);
        assert_eq!(result.dropped_slices, 1);
    }

    #[test]
    fn test_rebuild_missing_folder() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(test_config(dir.path()));

        let err = pipeline.rebuild(&target(), &NoProgress).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientSlices { found: 0 }));
        assert_eq!(err.to_string(), "No slices found to combine");
    }

    #[test]
    fn test_rebuild_from_disk() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(target().folder_in(dir.path())).unwrap();
        for index in 1..=10 {
            store.write(index, &png(3, 2)).unwrap();
        }

        let result = Pipeline::new(test_config(dir.path()))
            .rebuild(&target(), &NoProgress)
            .unwrap();
        assert_eq!(result.page_count, 2);
        assert!(result.fetch.is_none());
    }

    #[test]
    fn test_insufficient_message() {
        let err = PipelineError::InsufficientSlices { found: 4 };
        assert_eq!(
            err.to_string(),
            "Only 4 slice(s) found, need at least 5 slices for one page"
        );
    }

    #[test]
    fn test_exit_code_mapping() {
        let err = PipelineError::Target(TargetError::InvalidId("a b".to_string()));
        assert_eq!(err.exit_code(), ExitCode::Success);

        let err = PipelineError::InsufficientSlices { found: 0 };
        assert_eq!(err.exit_code(), ExitCode::Success);

        let err = PipelineError::Pdf(PdfWriterError::NoPages);
        assert!(!err.is_handled());
        assert_eq!(err.exit_code(), ExitCode::GeneralError);

        let err = PipelineError::Reassemble(ReassembleError::InvalidImage {
            path: PathBuf::from("slice_00001.jpg"),
            reason: "truncated".to_string(),
        });
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
    }
}
