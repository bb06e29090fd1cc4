use super::schema::FileRecord;

/// Text shown in listings while no summary exists yet.
pub const SUMMARY_PLACEHOLDER: &str =
    "No summary available. The AI is still processing this document.";

const DIRECT_UPLOAD_PREFIX: &str = "File uploaded directly to ";
const ERROR_PREFIX: &str = "Processing Error:";
const UNAVAILABLE: &str = "Summary not available.";

/// Where a file's AI summary stands, as far as the client can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryState {
    /// No summary yet, or the backend's direct-upload placeholder.
    Pending,
    Ready(String),
    /// The backend gave up on this file.
    Failed(String),
}

impl SummaryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Classify the summary text carried by a record.
pub fn summary_state(record: &FileRecord) -> SummaryState {
    let Some(text) = record.summary.as_deref().map(str::trim) else {
        return SummaryState::Pending;
    };
    if text.is_empty() || text.starts_with(DIRECT_UPLOAD_PREFIX) {
        SummaryState::Pending
    } else if text.starts_with(ERROR_PREFIX) || text == UNAVAILABLE {
        SummaryState::Failed(text.to_string())
    } else {
        SummaryState::Ready(text.to_string())
    }
}

/// Summary text for display, falling back to the placeholder.
pub fn display_summary(record: &FileRecord) -> &str {
    match record.summary.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => SUMMARY_PLACEHOLDER,
    }
}
