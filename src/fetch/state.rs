//! Fetch loop state machine
//!
//! | From                        | Event              | To                               | Delay      |
//! |-----------------------------|--------------------|----------------------------------|------------|
//! | `Fetching { p, a }`         | `PageSaved`        | `Fetching { p + 1, 0 }`          | politeness |
//! | `Fetching { p, a }`         | `TransientFailure` | `Fetching { p, a + 1 }`          | policy     |
//! | `Fetching { p, a }`         | `TransientFailure` | `Done(RetriesExhausted)`         | none       |
//! | `Fetching { p, _ }`         | `NotFound`         | `Done(NotFound)`                 | none       |
//! | `Fetching { p, _ }`         | `NoImages`         | `Done(NoImages)`                 | none       |
//! | `Fetching { p, _ }`         | `Interrupted`      | `Done(Interrupted)`              | none       |
//! | `Done(_)`                   | any                | unchanged                        | none       |

use std::time::Duration;

use super::retry::RetryPolicy;
use super::types::{FetchTiming, StopReason};

/// What happened during one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// All embedded images of the page were stored (or already present)
    PageSaved,
    /// The page does not exist
    NotFound,
    /// The page exists but has no embedded images
    NoImages,
    /// Fetch failed in a way worth retrying
    TransientFailure,
    /// The user asked to stop
    Interrupted,
}

/// Fetch loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// About to fetch `page`; `attempt` failures so far on this page
    Fetching { page: u32, attempt: u32 },
    /// Fetch phase is over
    Done(StopReason),
}

/// Result of applying an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the event
    pub next: FetchState,
    /// Pause before acting on `next`
    pub delay: Duration,
}

impl Transition {
    fn immediate(next: FetchState) -> Self {
        Self {
            next,
            delay: Duration::ZERO,
        }
    }
}

impl FetchState {
    /// Initial state for a run starting on `page`
    pub fn start(page: u32) -> Self {
        FetchState::Fetching {
            page: page.max(1),
            attempt: 0,
        }
    }

    /// Whether the fetch phase is over
    pub fn is_done(&self) -> bool {
        matches!(self, FetchState::Done(_))
    }

    /// Apply `event` to this state
    pub fn on(&self, event: LoopEvent, policy: &dyn RetryPolicy, timing: &FetchTiming) -> Transition {
        let (page, attempt) = match *self {
            FetchState::Fetching { page, attempt } => (page, attempt),
            FetchState::Done(_) => return Transition::immediate(self.clone()),
        };

        match event {
            LoopEvent::PageSaved => Transition {
                next: FetchState::Fetching {
                    page: page + 1,
                    attempt: 0,
                },
                delay: timing.politeness_delay,
            },
            LoopEvent::TransientFailure => {
                let attempts = attempt.saturating_add(1);
                match policy.delay_for(attempts) {
                    Some(delay) => Transition {
                        next: FetchState::Fetching {
                            page,
                            attempt: attempts,
                        },
                        delay,
                    },
                    None => Transition::immediate(FetchState::Done(
                        StopReason::RetriesExhausted { page, attempts },
                    )),
                }
            }
            LoopEvent::NotFound => {
                Transition::immediate(FetchState::Done(StopReason::NotFound { page }))
            }
            LoopEvent::NoImages => {
                Transition::immediate(FetchState::Done(StopReason::NoImages { page }))
            }
            LoopEvent::Interrupted => {
                Transition::immediate(FetchState::Done(StopReason::Interrupted { page }))
            }
        }
    }
}
