//! The view state controller.
//!
//! Owns the current [`ViewSelection`] and the cached folder and file
//! listings. Every fetch that feeds the displayed listing is tagged when it
//! is issued; a response is dropped when the selection has moved on or a
//! newer listing has already landed, so a slow reply for one folder never
//! lands on another folder's view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dispatcher::{UploadDispatcher, UploadOutcome};
use super::monitor::{MonitorReport, ProcessingMonitor};
use super::signal::{CompletionSignal, FixedDelayPoll};
use crate::api::DocumentApi;
use crate::confirm::{Confirm, ConfirmPrompt};
use crate::error::{ClientError, ClientResult};
use crate::library::{
    summary_state, FileId, FileRecord, FolderEntry, FolderId, FolderListing, FolderRecord,
    LibraryListing, SummaryState, UploadBatch, ViewSelection,
};
use crate::notify::{Notice, NotificationCenter};
use crate::retry::RetryPolicy;

/// Read-only copy of what the controller is displaying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub selection: ViewSelection,
    pub folders: Vec<FolderEntry>,
    pub active_files: Vec<FileRecord>,
}

#[derive(Debug, Default)]
struct ViewState {
    selection: ViewSelection,
    folders: Vec<FolderEntry>,
    active_files: Vec<FileRecord>,
    /// Bumped for every fetch of the active listing.
    active_seq: u64,
    /// Tag of the listing currently displayed. Only a result that lands
    /// supersedes older fetches.
    applied_seq: u64,
    /// Bumped for every fetch of the folder list.
    folders_seq: u64,
}

#[derive(Debug, Clone)]
struct ListingTag {
    seq: u64,
    selection: ViewSelection,
}

/// Result of a successful [`ViewController::upload`].
#[derive(Debug)]
pub struct UploadReceipt {
    pub outcome: UploadOutcome,
    /// Present for untargeted batches; resolves once reconciliation ends.
    pub monitor: Option<JoinHandle<MonitorReport>>,
}

/// Clears the in-flight flag when a folder creation finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ViewController {
    api: Arc<dyn DocumentApi>,
    notices: Arc<dyn NotificationCenter>,
    confirm: Arc<dyn Confirm>,
    signal: Arc<dyn CompletionSignal>,
    dispatcher: UploadDispatcher,
    summary_poll: RetryPolicy,
    summary_attempts: u32,
    state: Mutex<ViewState>,
    creating_folder: AtomicBool,
    closed: CancellationToken,
}

impl ViewController {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        notices: Arc<dyn NotificationCenter>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            dispatcher: UploadDispatcher::new(Arc::clone(&api), Arc::clone(&notices)),
            api,
            notices,
            confirm,
            signal: Arc::new(FixedDelayPoll::default()),
            summary_poll: RetryPolicy::default(),
            summary_attempts: 10,
            state: Mutex::new(ViewState::default()),
            creating_folder: AtomicBool::new(false),
            closed: CancellationToken::new(),
        }
    }

    pub fn with_signal(mut self, signal: Arc<dyn CompletionSignal>) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.dispatcher = UploadDispatcher::new(Arc::clone(&self.api), Arc::clone(&self.notices))
            .with_max_upload_bytes(max_upload_bytes);
        self
    }

    pub fn with_summary_poll(mut self, policy: RetryPolicy, attempts: u32) -> Self {
        self.summary_poll = policy;
        self.summary_attempts = attempts;
        self
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.lock();
        ViewSnapshot {
            selection: state.selection.clone(),
            folders: state.folders.clone(),
            active_files: state.active_files.clone(),
        }
    }

    pub fn selection(&self) -> ViewSelection {
        self.state.lock().selection.clone()
    }

    /// Stop reacting to late timers. In-flight requests still complete.
    pub fn shutdown(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Initial fetch: folder list and the Home listing.
    pub async fn load(&self) -> ClientResult<()> {
        let (folders, active) = tokio::join!(self.refresh_folders(), self.refresh_active());
        folders?;
        active.map(|_| ())
    }

    pub async fn select_home(&self) -> ClientResult<Vec<FileRecord>> {
        let tag = self.switch_to(ViewSelection::Home);
        self.fetch_active(tag).await
    }

    pub async fn select_folder(&self, folder: &FolderRecord) -> ClientResult<Vec<FileRecord>> {
        let tag = self.switch_to(ViewSelection::folder(folder));
        self.fetch_active(tag).await
    }

    /// Re-fetch the listing for whatever is currently selected.
    pub async fn refresh_active(&self) -> ClientResult<Vec<FileRecord>> {
        let tag = self.issue_active_tag();
        self.fetch_active(tag).await
    }

    /// Re-fetch the folder list and count each folder's files.
    ///
    /// Counts whose fetch fails stay `None`; the first such failure is
    /// returned after the rest of the list has been applied.
    pub async fn refresh_folders(&self) -> ClientResult<Vec<FolderListing>> {
        let seq = {
            let mut state = self.state.lock();
            state.folders_seq += 1;
            state.folders_seq
        };

        let folders = match self.api.list_folders().await {
            Ok(folders) => folders,
            Err(err) => {
                tracing::warn!("failed to list folders: {err}");
                return Err(err);
            }
        };
        tracing::debug!(count = folders.len(), "counting files per folder");

        let results = join_all(
            folders
                .iter()
                .map(|folder| self.api.list_folder_files(folder.id)),
        )
        .await;

        let mut entries = Vec::with_capacity(folders.len());
        let mut listings = Vec::with_capacity(folders.len());
        let mut first_error = None;
        for (folder, result) in folders.into_iter().zip(results) {
            match result {
                Ok(files) => {
                    entries.push(FolderEntry {
                        folder: folder.clone(),
                        file_count: Some(files.len()),
                    });
                    listings.push(FolderListing { folder, files });
                }
                Err(err) => {
                    tracing::warn!(folder = folder.id, "failed to count folder files: {err}");
                    entries.push(FolderEntry::pending(folder));
                    first_error.get_or_insert(err);
                }
            }
        }

        {
            let mut state = self.state.lock();
            if state.folders_seq == seq {
                state.folders = entries;
            } else {
                tracing::debug!(seq, "discarding superseded folder list");
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(listings),
        }
    }

    /// Re-fetch everything: folders with their files, unassigned files, and
    /// the active listing (served from those same responses).
    pub async fn refresh_all(&self) -> ClientResult<LibraryListing> {
        let tag = self.issue_active_tag();
        let (folders, unassigned) =
            tokio::join!(self.refresh_folders(), self.api.list_unassigned_files());

        let active = match &tag.selection {
            ViewSelection::Home => unassigned.as_ref().ok().cloned(),
            ViewSelection::Folder { id, .. } => folders.as_ref().ok().and_then(|listings| {
                listings
                    .iter()
                    .find(|listing| listing.folder.id == *id)
                    .map(|listing| listing.files.clone())
            }),
        };
        if let Some(files) = active {
            self.apply_active(&tag, files);
        }

        let unassigned = unassigned.map_err(|err| {
            tracing::warn!("failed to list unassigned files: {err}");
            err
        })?;
        Ok(LibraryListing {
            folders: folders?,
            unassigned,
        })
    }

    pub async fn create_folder(&self, name: &str) -> ClientResult<FolderRecord> {
        let name = name.trim();
        if name.is_empty() {
            self.notices
                .show(Notice::error("Error", "Folder name cannot be empty"));
            return Err(ClientError::validation("folder name cannot be empty"));
        }
        let Some(_in_flight) = InFlight::acquire(&self.creating_folder) else {
            tracing::debug!(name, "folder creation already in flight");
            return Err(ClientError::Busy("folder creation"));
        };

        let result = self.api.create_folder(name).await;
        if let Err(err) = self.refresh_folders().await {
            tracing::debug!("folder refresh after create failed: {err}");
        }

        match result {
            Ok(folder) => {
                tracing::info!(id = folder.id, name, "folder created");
                self.notices
                    .show(Notice::success("Success", "Folder created successfully"));
                Ok(folder)
            }
            Err(err) => {
                tracing::warn!(name, "failed to create folder: {err}");
                self.notices
                    .show(Notice::error("Error", "Failed to create folder"));
                Err(err)
            }
        }
    }

    /// Delete a folder and everything in it after the user confirms.
    /// Returns `Ok(false)` when the user declines.
    pub async fn delete_folder(&self, id: FolderId, name: &str) -> ClientResult<bool> {
        if !self
            .confirm
            .confirm(&ConfirmPrompt::delete_folder(name))
            .await
        {
            return Ok(false);
        }

        let result = self.api.delete_folder(id).await;
        if result.is_ok() && self.selection().folder_id() == Some(id) {
            self.switch_to(ViewSelection::Home);
        }
        self.refresh_after_mutation().await;

        match result {
            Ok(()) => {
                tracing::info!(id, name, "folder deleted");
                self.notices.show(Notice::success("Success", "Folder deleted."));
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(id, name, "failed to delete folder: {err}");
                self.notices
                    .show(Notice::error("Error", "Failed to delete folder."));
                Err(err)
            }
        }
    }

    /// Delete one file after the user confirms. Returns `Ok(false)` when
    /// the user declines.
    pub async fn delete_file(&self, id: FileId, name: &str) -> ClientResult<bool> {
        if !self.confirm.confirm(&ConfirmPrompt::delete_file(name)).await {
            return Ok(false);
        }

        let result = self.api.delete_file(id).await;
        self.refresh_after_mutation().await;

        match result {
            Ok(()) => {
                tracing::info!(id, name, "file deleted");
                self.notices
                    .show(Notice::success("Success", format!("{name} has been deleted.")));
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(id, name, "failed to delete file: {err}");
                self.notices
                    .show(Notice::error("Error", "Failed to delete the file."));
                Err(err)
            }
        }
    }

    /// Upload a batch, refresh every listing, and start reconciliation for
    /// untargeted batches.
    pub async fn upload(self: &Arc<Self>, batch: UploadBatch) -> ClientResult<UploadReceipt> {
        let result = self.dispatcher.dispatch(&batch).await;
        if !matches!(result, Err(ClientError::Validation(_))) {
            if let Err(err) = self.refresh_all().await {
                tracing::debug!("refresh after upload failed: {err}");
            }
        }
        let outcome = result?;

        let monitor = if outcome.targeted {
            None
        } else {
            let monitor = ProcessingMonitor::new(
                Arc::clone(self),
                Arc::clone(&self.notices),
                Arc::clone(&self.signal),
            );
            let uploaded = outcome.uploaded.clone();
            Some(tokio::spawn(monitor.run(uploaded)))
        };

        Ok(UploadReceipt { outcome, monitor })
    }

    pub async fn view_url(&self, id: FileId) -> ClientResult<String> {
        self.api.view_url(id).await.map_err(|err| {
            tracing::warn!(id, "error getting download URL: {err}");
            self.notices
                .show(Notice::error("Error", "Could not get the file URL."));
            err
        })
    }

    /// Ask the backend to (re)classify and summarize a file.
    pub async fn generate_ai_summary(&self, id: FileId) -> ClientResult<()> {
        match self.api.generate_summary(id).await {
            Ok(()) => {
                tracing::info!(id, "summary generation requested");
                self.notices.show(Notice::info(
                    "AI Processing",
                    "AI summary generation started. The summary will appear shortly.",
                ));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(id, "failed to request summary: {err}");
                self.notices
                    .show(Notice::error("Error", "Failed to generate AI summary."));
                Err(err)
            }
        }
    }

    /// Poll listings until the file's summary is no longer pending or the
    /// attempts run out. Returns the last state seen.
    pub async fn await_summary(&self, id: FileId) -> ClientResult<SummaryState> {
        let mut state = SummaryState::Pending;
        for attempt in 0..self.summary_attempts {
            let delay = self.summary_poll.delay_for_attempt(attempt);
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            if self.is_closed() {
                break;
            }
            let Some(record) = self.locate_file(id).await? else {
                tracing::debug!(id, attempt, "file not in any listing");
                continue;
            };
            state = summary_state(&record);
            if !state.is_pending() {
                break;
            }
        }
        Ok(state)
    }

    async fn locate_file(&self, id: FileId) -> ClientResult<Option<FileRecord>> {
        let active = self.refresh_active().await?;
        if let Some(found) = active.into_iter().find(|f| f.id == id) {
            return Ok(Some(found));
        }
        // Classification may have moved it out of the current view.
        let listing = self.refresh_all().await?;
        Ok(listing.find_file(id).cloned())
    }

    async fn refresh_after_mutation(&self) {
        let (folders, active) = tokio::join!(self.refresh_folders(), self.refresh_active());
        if let Err(err) = folders {
            tracing::debug!("folder refresh failed: {err}");
        }
        if let Err(err) = active {
            tracing::debug!("listing refresh failed: {err}");
        }
    }

    fn switch_to(&self, selection: ViewSelection) -> ListingTag {
        let mut state = self.state.lock();
        if state.selection != selection {
            state.active_files.clear();
        }
        state.selection = selection;
        state.active_seq += 1;
        ListingTag {
            seq: state.active_seq,
            selection: state.selection.clone(),
        }
    }

    fn issue_active_tag(&self) -> ListingTag {
        let mut state = self.state.lock();
        state.active_seq += 1;
        ListingTag {
            seq: state.active_seq,
            selection: state.selection.clone(),
        }
    }

    async fn fetch_active(&self, tag: ListingTag) -> ClientResult<Vec<FileRecord>> {
        let result = match &tag.selection {
            ViewSelection::Home => self.api.list_unassigned_files().await,
            ViewSelection::Folder { id, .. } => self.api.list_folder_files(*id).await,
        };
        match result {
            Ok(files) => {
                self.apply_active(&tag, files.clone());
                Ok(files)
            }
            Err(err) => {
                tracing::warn!(selection = ?tag.selection, "failed to load files: {err}");
                if self.is_current(&tag) {
                    self.notices
                        .show(Notice::error("Error", "Could not load files."));
                }
                Err(err)
            }
        }
    }

    fn is_current(&self, tag: &ListingTag) -> bool {
        let state = self.state.lock();
        state.selection == tag.selection && tag.seq > state.applied_seq
    }

    fn apply_active(&self, tag: &ListingTag, files: Vec<FileRecord>) -> bool {
        let mut state = self.state.lock();
        if state.selection != tag.selection || tag.seq <= state.applied_seq {
            tracing::debug!(seq = tag.seq, "discarding stale listing");
            return false;
        }
        state.applied_seq = tag.seq;
        state.active_files = files;
        true
    }
}
