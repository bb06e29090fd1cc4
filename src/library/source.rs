use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{ClientError, ClientResult};
use crate::library::FolderId;

/// Default advisory upload ceiling (10 MiB). The server is the real authority.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A local file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name);
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    /// Read a file from disk. `~` is expanded.
    pub async fn read(path: &str) -> ClientResult<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
        let name = expanded
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::validation(format!("'{path}' does not name a file")))?;
        let bytes = fs::read(&expanded)
            .await
            .map_err(|source| ClientError::Io {
                path: expanded.clone(),
                source,
            })?;
        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A set of files dropped together, optionally aimed at one folder.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub files: Vec<LocalFile>,
    pub target_folder: Option<FolderId>,
}

impl UploadBatch {
    pub fn new(files: Vec<LocalFile>) -> Self {
        Self {
            files,
            target_folder: None,
        }
    }

    pub fn into_folder(mut self, folder: FolderId) -> Self {
        self.target_folder = Some(folder);
        self
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    /// Reject empty batches and files above `max_bytes` before any request.
    pub fn validate(&self, max_bytes: u64) -> ClientResult<()> {
        if self.files.is_empty() {
            return Err(ClientError::validation("no files selected for upload"));
        }
        if let Some(big) = self.files.iter().find(|f| f.len() > max_bytes) {
            return Err(ClientError::validation(format!(
                "{} is {} bytes, over the {} byte upload limit",
                big.name,
                big.len(),
                max_bytes
            )));
        }
        Ok(())
    }
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
    .to_string()
}
