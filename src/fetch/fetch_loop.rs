//! Sequential page fetch loop

use tracing::{info, warn};

use super::extract::{decode_data_uri, extract_embedded_images};
use super::retry::RetryPolicy;
use super::shutdown::ShutdownCoordinator;
use super::source::PageSource;
use super::state::{FetchState, LoopEvent};
use super::types::{FetchError, FetchLoopError, FetchReport, FetchTiming, PageBody, Result};
use crate::progress::ProgressCallback;
use crate::slice::{global_slice_index, RunState, SliceStore, WriteOutcome, GROUP_SIZE};

/// Drives page retrieval from the resume page until the site runs out of
/// content, the retry policy gives up, or a shutdown is requested
pub struct FetchLoop<'a, S: PageSource> {
    source: &'a S,
    store: &'a SliceStore,
    policy: &'a dyn RetryPolicy,
    timing: FetchTiming,
    shutdown: ShutdownCoordinator,
}

impl<'a, S: PageSource> FetchLoop<'a, S> {
    pub fn new(
        source: &'a S,
        store: &'a SliceStore,
        policy: &'a dyn RetryPolicy,
        timing: FetchTiming,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            source,
            store,
            policy,
            timing,
            shutdown,
        }
    }

    /// Run until the fetch phase is done
    ///
    /// Only slice store failures and undecodable image payloads are errors;
    /// every other way of stopping is reported in [`FetchReport::stop`].
    pub async fn run(
        &self,
        run_state: &RunState,
        progress: &dyn ProgressCallback,
    ) -> Result<FetchReport> {
        let mut state = FetchState::start(run_state.resume_page);
        let mut pages_fetched = 0u32;
        let mut slices_written = 0usize;
        let mut slices_skipped = 0usize;
        let mut transient_failures = 0u32;

        info!(
            resume_page = run_state.resume_page,
            existing_slices = run_state.slice_count,
            "starting fetch"
        );

        let stop = loop {
            let page = match &state {
                FetchState::Fetching { page, .. } => *page,
                FetchState::Done(reason) => break reason.clone(),
            };

            let mut failure: Option<FetchError> = None;
            let event = if self.shutdown.is_shutting_down() {
                LoopEvent::Interrupted
            } else {
                match self.source.fetch_page(page).await {
                    Ok(PageBody::NotFound) => {
                        info!(page, "page not found, end of content");
                        LoopEvent::NotFound
                    }
                    Ok(PageBody::Html(html)) => {
                        let images = extract_embedded_images(&html);
                        if images.is_empty() {
                            warn!(page, "page has no embedded images, treating as end of content");
                            LoopEvent::NoImages
                        } else {
                            let (written, skipped) = self.save_page(page, &images)?;
                            slices_written += written;
                            slices_skipped += skipped;
                            pages_fetched += 1;
                            info!(page, written, skipped, "page saved");
                            progress.on_page_saved(page, written, skipped);
                            LoopEvent::PageSaved
                        }
                    }
                    Err(e) => {
                        transient_failures += 1;
                        failure = Some(e);
                        LoopEvent::TransientFailure
                    }
                }
            };

            let transition = state.on(event, self.policy, &self.timing);

            if let (Some(error), FetchState::Fetching { page, attempt }) =
                (failure.as_ref(), &transition.next)
            {
                warn!(page, attempt, error = %error, delay_ms = transition.delay.as_millis() as u64, "fetch failed, retrying");
                progress.on_retry(*page, *attempt, error, transition.delay);
            } else if let Some(error) = failure.as_ref() {
                warn!(page, error = %error, "fetch failed, giving up");
            }

            state = transition.next;
            if !state.is_done() && !transition.delay.is_zero() {
                // an interrupted sleep is picked up at the top of the next iteration
                self.shutdown.sleep(transition.delay).await;
            }
        };

        info!(
            pages_fetched,
            slices_written,
            slices_skipped,
            stop = ?stop,
            "fetch finished"
        );
        progress.on_fetch_stopped(&stop);

        Ok(FetchReport {
            pages_fetched,
            slices_written,
            slices_skipped,
            transient_failures,
            stop,
        })
    }

    /// Store every embedded image of `page`, skipping indices already on disk
    fn save_page(&self, page: u32, images: &[String]) -> Result<(usize, usize)> {
        if images.len() > GROUP_SIZE {
            warn!(
                page,
                images = images.len(),
                "page carries more images than a slice group, numbering will overlap the next page"
            );
        }

        let mut written = 0;
        let mut skipped = 0;
        for (position, uri) in images.iter().enumerate() {
            let index = global_slice_index(page, position);
            let outcome = self.store.write_if_absent(index, || {
                decode_data_uri(uri).map_err(|source| FetchLoopError::Decode {
                    page,
                    index,
                    source,
                })
            })?;
            match outcome {
                WriteOutcome::Written => written += 1,
                WriteOutcome::Skipped => skipped += 1,
            }
        }
        Ok((written, skipped))
    }
}
