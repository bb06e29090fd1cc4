use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Backend identifier of a stored file.
pub type FileId = i64;
/// Backend identifier of a folder.
pub type FolderId = i64;

/// A file record as served by the backend. The client only ever holds a
/// read-only, possibly stale copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub file_name: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub upload_timestamp: Option<NaiveDateTime>,
}

/// A folder as served by `GET /folders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub creation_timestamp: Option<NaiveDateTime>,
}

/// A folder annotated with the client-derived file count.
///
/// `file_count` stays `None` until the per-folder listing resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub folder: FolderRecord,
    pub file_count: Option<usize>,
}

impl FolderEntry {
    pub fn pending(folder: FolderRecord) -> Self {
        Self {
            folder,
            file_count: None,
        }
    }
}

/// One folder together with the files the backend listed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    pub folder: FolderRecord,
    pub files: Vec<FileRecord>,
}

/// Full library listing produced by a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryListing {
    /// In the order the backend listed the folders.
    pub folders: Vec<FolderListing>,
    pub unassigned: Vec<FileRecord>,
}

impl LibraryListing {
    /// Find a file by id anywhere in the listing.
    pub fn find_file(&self, id: FileId) -> Option<&FileRecord> {
        self.folders
            .iter()
            .flat_map(|listing| listing.files.iter())
            .chain(self.unassigned.iter())
            .find(|file| file.id == id)
    }
}

/// Body of `POST /folders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// What the controller is currently displaying.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewSelection {
    /// Unassigned files.
    #[default]
    Home,
    Folder { id: FolderId, name: String },
}

impl ViewSelection {
    pub fn folder(folder: &FolderRecord) -> Self {
        Self::Folder {
            id: folder.id,
            name: folder.name.clone(),
        }
    }

    pub fn folder_id(&self) -> Option<FolderId> {
        match self {
            Self::Home => None,
            Self::Folder { id, .. } => Some(*id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Home => "Home (Unassigned Files)",
            Self::Folder { name, .. } => name,
        }
    }
}

/// Accepted shapes of the `view-url` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ViewUrlBody {
    Wrapped { url: String },
    Bare(String),
}

/// Normalize a `view-url` response body into the URL itself.
///
/// The backend answers with `{"url": ".."}`, a JSON string, or plain text
/// depending on its version. Returns `None` for an empty body.
pub fn normalize_view_url(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = match serde_json::from_str::<ViewUrlBody>(trimmed) {
        Ok(ViewUrlBody::Wrapped { url }) | Ok(ViewUrlBody::Bare(url)) => url,
        Err(_) => trimmed.to_string(),
    };
    let url = url.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
