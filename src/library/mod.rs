//! Document library data model.
//!
//! Backend records, the client-side view selection, upload sources, and
//! summary classification.

pub mod schema;
pub mod source;
pub mod summary;

pub use schema::{
    normalize_view_url, CreateFolderRequest, FileId, FileRecord, FolderEntry, FolderId,
    FolderListing, FolderRecord, LibraryListing, ViewSelection,
};
pub use source::{guess_mime_type, LocalFile, UploadBatch, MAX_UPLOAD_BYTES};
pub use summary::{display_summary, summary_state, SummaryState, SUMMARY_PLACEHOLDER};
