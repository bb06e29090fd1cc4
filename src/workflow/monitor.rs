//! Post-upload reconciliation.
//!
//! The backend classifies untargeted uploads asynchronously and never tells
//! the client when it is done. The monitor waits on a [`CompletionSignal`],
//! refreshes every listing, and tries to say where a single uploaded file
//! ended up. Every path ends in a terminal notice unless the controller was
//! shut down in the meantime.

use std::sync::Arc;

use thiserror::Error;

use super::signal::CompletionSignal;
use super::view::ViewController;
use crate::error::ClientError;
use crate::library::{FileRecord, FolderListing, FolderRecord};
use crate::notify::{Notice, NotificationCenter, PROCESSING_NOTICE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Dispatched,
    Awaiting,
    Reconciling,
    Attributing,
    Resolved,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: MonitorPhase,
    pub to: MonitorPhase,
}

/// Tracks the phase of one monitor run and rejects impossible moves.
#[derive(Debug, Clone)]
pub struct MonitorStateMachine {
    phase: MonitorPhase,
    trail: Vec<MonitorPhase>,
}

impl Default for MonitorStateMachine {
    fn default() -> Self {
        Self {
            phase: MonitorPhase::Dispatched,
            trail: vec![MonitorPhase::Dispatched],
        }
    }
}

impl MonitorStateMachine {
    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Every phase visited so far, starting with `Dispatched`.
    pub fn trail(&self) -> &[MonitorPhase] {
        &self.trail
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, MonitorPhase::Resolved | MonitorPhase::Unknown)
    }

    pub fn advance(&mut self, next: MonitorPhase) -> Result<(), InvalidTransition> {
        use MonitorPhase::*;

        let allowed = match self.phase {
            Dispatched => matches!(next, Awaiting),
            Awaiting => matches!(next, Reconciling | Resolved),
            Reconciling => matches!(next, Attributing | Resolved | Unknown),
            Attributing => matches!(next, Awaiting | Resolved | Unknown),
            Resolved | Unknown => false,
        };
        if !allowed {
            return Err(InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.trail.push(next);
        Ok(())
    }
}

/// How a monitor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The single uploaded file was found in a folder.
    Attributed {
        file_name: String,
        folder: FolderRecord,
    },
    /// Generic completion: multi-file batch, or no folder matched in time.
    Organized,
    /// A fetch failed; the user is asked to refresh.
    Unclear,
    /// The controller shut down before the run finished. The loading notice
    /// is cleared and no result is shown.
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub outcome: ReconcileOutcome,
    pub phases: Vec<MonitorPhase>,
}

#[derive(Debug, Error)]
enum MonitorError {
    #[error(transparent)]
    Fetch(#[from] ClientError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// First folder, in listing order, holding a file called `file_name`.
///
/// Matching is by name only. A name shared with an older file can therefore
/// point at the older file's folder.
pub fn attribute<'a>(listings: &'a [FolderListing], file_name: &str) -> Option<&'a FolderRecord> {
    listings
        .iter()
        .find(|listing| listing.files.iter().any(|f| f.file_name == file_name))
        .map(|listing| &listing.folder)
}

pub struct ProcessingMonitor {
    view: Arc<ViewController>,
    notices: Arc<dyn NotificationCenter>,
    signal: Arc<dyn CompletionSignal>,
}

impl ProcessingMonitor {
    pub fn new(
        view: Arc<ViewController>,
        notices: Arc<dyn NotificationCenter>,
        signal: Arc<dyn CompletionSignal>,
    ) -> Self {
        Self {
            view,
            notices,
            signal,
        }
    }

    pub async fn run(self, uploaded: Vec<FileRecord>) -> MonitorReport {
        let mut machine = MonitorStateMachine::default();
        let outcome = match self.drive(&mut machine, &uploaded).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("reconciliation failed: {err}");
                if !machine.is_terminal() {
                    // Unknown is reachable from both fetching phases; anything
                    // else already broke the machine and stays recorded as is.
                    let _ = machine.advance(MonitorPhase::Unknown);
                }
                ReconcileOutcome::Unclear
            }
        };
        self.announce(&outcome);
        MonitorReport {
            outcome,
            phases: machine.trail().to_vec(),
        }
    }

    async fn drive(
        &self,
        machine: &mut MonitorStateMachine,
        uploaded: &[FileRecord],
    ) -> Result<ReconcileOutcome, MonitorError> {
        if self.view.is_closed() {
            return Ok(ReconcileOutcome::Abandoned);
        }
        self.notices.show(Notice::loading(
            PROCESSING_NOTICE_KEY,
            "AI Processing",
            "Your files are being analyzed and organized by the AI.",
        ));

        self.signal.settle().await;
        if self.view.is_closed() {
            return Ok(ReconcileOutcome::Abandoned);
        }
        machine.advance(MonitorPhase::Awaiting)?;

        let single = match uploaded {
            [only] => Some(only.file_name.as_str()),
            _ => None,
        };

        let mut attempt = 0;
        loop {
            if !self.signal.before_attempt(attempt).await {
                machine.advance(MonitorPhase::Resolved)?;
                return Ok(ReconcileOutcome::Organized);
            }
            if self.view.is_closed() {
                return Ok(ReconcileOutcome::Abandoned);
            }

            machine.advance(MonitorPhase::Reconciling)?;
            tracing::debug!(attempt, "reconciling listings");
            let listing = self.view.refresh_all().await?;

            let Some(file_name) = single else {
                machine.advance(MonitorPhase::Resolved)?;
                return Ok(ReconcileOutcome::Organized);
            };

            machine.advance(MonitorPhase::Attributing)?;
            if let Some(folder) = attribute(&listing.folders, file_name) {
                machine.advance(MonitorPhase::Resolved)?;
                return Ok(ReconcileOutcome::Attributed {
                    file_name: file_name.to_string(),
                    folder: folder.clone(),
                });
            }
            tracing::debug!(attempt, file_name, "file not placed in any folder yet");
            machine.advance(MonitorPhase::Awaiting)?;
            attempt += 1;
        }
    }

    fn announce(&self, outcome: &ReconcileOutcome) {
        self.notices.hide(PROCESSING_NOTICE_KEY);
        let notice = match outcome {
            ReconcileOutcome::Abandoned => {
                tracing::debug!("controller closed; dropping reconciliation result");
                return;
            }
            ReconcileOutcome::Attributed { file_name, folder } => Notice::success(
                "File Organized",
                format!("{file_name} categorized into folder {}", folder.name),
            ),
            ReconcileOutcome::Organized => Notice::success(
                "Processing Complete",
                "Your files have been organized. Check the folders for results.",
            ),
            ReconcileOutcome::Unclear => Notice::info(
                "Processing Status Unclear",
                "Processing status unclear, please refresh to see the latest results.",
            ),
        };
        self.notices.show(notice);
    }
}
