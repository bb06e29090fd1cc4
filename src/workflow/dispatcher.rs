use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use crate::api::DocumentApi;
use crate::error::ClientResult;
use crate::library::{FileRecord, UploadBatch, MAX_UPLOAD_BYTES};
use crate::notify::{Notice, NotificationCenter, UPLOAD_NOTICE_KEY};

/// Files the server confirmed for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// The batch went to a chosen folder and skips AI classification.
    pub targeted: bool,
    /// In batch order.
    pub uploaded: Vec<FileRecord>,
}

/// Sends every file of a batch concurrently and resolves all-or-nothing.
pub struct UploadDispatcher {
    api: Arc<dyn DocumentApi>,
    notices: Arc<dyn NotificationCenter>,
    max_upload_bytes: u64,
}

impl UploadDispatcher {
    pub fn new(api: Arc<dyn DocumentApi>, notices: Arc<dyn NotificationCenter>) -> Self {
        Self {
            api,
            notices,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Upload the batch. Waits for every request to settle; any failure
    /// fails the whole batch. Files the server already stored stay there.
    pub async fn dispatch(&self, batch: &UploadBatch) -> ClientResult<UploadOutcome> {
        if let Err(err) = batch.validate(self.max_upload_bytes) {
            tracing::warn!("upload rejected before dispatch: {err}");
            self.notices.show(Notice::error("Upload Failed", err.to_string()));
            return Err(err);
        }

        let batch_id = Uuid::new_v4();
        let total = batch.files.len();
        let targeted = batch.target_folder.is_some();
        tracing::debug!(
            %batch_id,
            files = ?batch.file_names(),
            folder = ?batch.target_folder,
            "dispatching uploads"
        );

        self.notices.show(Notice::loading(
            UPLOAD_NOTICE_KEY,
            "Uploading",
            format!("Uploading {}...", describe_count(total)),
        ));

        let results = join_all(
            batch
                .files
                .iter()
                .map(|file| self.api.upload_file(file, batch.target_folder)),
        )
        .await;

        self.notices.hide(UPLOAD_NOTICE_KEY);

        let mut uploaded = Vec::with_capacity(total);
        let mut first_error = None;
        let mut failed = 0_usize;
        for (file, result) in batch.files.iter().zip(results) {
            match result {
                Ok(record) => uploaded.push(record),
                Err(err) => {
                    tracing::warn!(%batch_id, file = %file.name, "upload failed: {err}");
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            self.notices.show(Notice::error(
                "Upload Failed",
                format!("{failed} of {} could not be uploaded.", describe_count(total)),
            ));
            return Err(err);
        }

        tracing::info!(%batch_id, total, targeted, "upload batch complete");
        let message = if targeted {
            format!("{} uploaded to the folder.", describe_count(total))
        } else {
            format!(
                "{} sent to the server for AI processing.",
                describe_count(total)
            )
        };
        self.notices.show(Notice::success("Upload Complete", message));

        Ok(UploadOutcome { targeted, uploaded })
    }
}

fn describe_count(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{count} files")
    }
}
