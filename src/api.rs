//! Backend REST surface.
//!
//! [`DocumentApi`] is the seam the workflow talks to; [`HttpDocumentApi`]
//! implements it over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};
use crate::library::{
    normalize_view_url, CreateFolderRequest, FileId, FileRecord, FolderId, FolderRecord,
    LocalFile,
};

#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn list_folders(&self) -> ClientResult<Vec<FolderRecord>>;
    async fn create_folder(&self, name: &str) -> ClientResult<FolderRecord>;
    /// Deletes the folder together with every file in it.
    async fn delete_folder(&self, id: FolderId) -> ClientResult<()>;
    async fn list_folder_files(&self, id: FolderId) -> ClientResult<Vec<FileRecord>>;
    async fn list_unassigned_files(&self) -> ClientResult<Vec<FileRecord>>;
    /// Upload one file. Without a folder the backend queues AI classification.
    async fn upload_file(
        &self,
        file: &LocalFile,
        folder: Option<FolderId>,
    ) -> ClientResult<FileRecord>;
    async fn delete_file(&self, id: FileId) -> ClientResult<()>;
    async fn view_url(&self, id: FileId) -> ClientResult<String>;
    /// Ask the backend to (re)run classification and summary for a file.
    /// The outcome is only visible through later listings.
    async fn generate_summary(&self, id: FileId) -> ClientResult<()>;
}

pub struct HttpDocumentApi {
    client: Client,
    base_url: String,
}

impl HttpDocumentApi {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                path: base_url.to_string(),
                source,
            })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        builder: RequestBuilder,
    ) -> ClientResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(method, path, status = status.as_u16(), "backend rejected request");
            return Err(ClientError::Http {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self
            .send("GET", path, self.request(Method::GET, path))
            .await?;
        decode_json(path, response).await
    }

    async fn send_empty(&self, method: Method, label: &'static str, path: &str) -> ClientResult<()> {
        self.send(label, path, self.request(method, path)).await?;
        Ok(())
    }
}

async fn decode_json<T: DeserializeOwned>(path: &str, response: Response) -> ClientResult<T> {
    let body = response
        .text()
        .await
        .map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;
    serde_json::from_str(&body).map_err(|err| ClientError::Decode {
        path: path.to_string(),
        message: err.to_string(),
    })
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn list_folders(&self) -> ClientResult<Vec<FolderRecord>> {
        self.get_json("/folders").await
    }

    async fn create_folder(&self, name: &str) -> ClientResult<FolderRecord> {
        let path = "/folders";
        let builder = self
            .request(Method::POST, path)
            .json(&CreateFolderRequest {
                name: name.to_string(),
            });
        let response = self.send("POST", path, builder).await?;
        decode_json(path, response).await
    }

    async fn delete_folder(&self, id: FolderId) -> ClientResult<()> {
        self.send_empty(Method::DELETE, "DELETE", &format!("/folders/{id}"))
            .await
    }

    async fn list_folder_files(&self, id: FolderId) -> ClientResult<Vec<FileRecord>> {
        self.get_json(&format!("/folders/{id}/files")).await
    }

    async fn list_unassigned_files(&self) -> ClientResult<Vec<FileRecord>> {
        self.get_json("/files/unassigned").await
    }

    async fn upload_file(
        &self,
        file: &LocalFile,
        folder: Option<FolderId>,
    ) -> ClientResult<FileRecord> {
        let path = "/files/upload";
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|source| ClientError::Transport {
                path: path.to_string(),
                source,
            })?;
        let mut form = Form::new().part("file", part);
        if let Some(folder) = folder {
            form = form.text("folderId", folder.to_string());
        }
        let builder = self.request(Method::POST, path).multipart(form);
        let response = self.send("POST", path, builder).await?;
        decode_json(path, response).await
    }

    async fn delete_file(&self, id: FileId) -> ClientResult<()> {
        self.send_empty(Method::DELETE, "DELETE", &format!("/files/{id}"))
            .await
    }

    async fn view_url(&self, id: FileId) -> ClientResult<String> {
        let path = format!("/files/{id}/view-url");
        let response = self
            .send("GET", &path, self.request(Method::GET, &path))
            .await?;
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                path: path.clone(),
                source,
            })?;
        normalize_view_url(&body).ok_or_else(|| ClientError::Decode {
            path,
            message: "empty view URL".into(),
        })
    }

    async fn generate_summary(&self, id: FileId) -> ClientResult<()> {
        self.send_empty(
            Method::POST,
            "POST",
            &format!("/files/{id}/generate-summary"),
        )
        .await
    }
}
