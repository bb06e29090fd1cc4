use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use docuintel::library::LocalFile;
use docuintel::{ClientError, DocumentApi, ErrorCategory, HttpDocumentApi};

#[derive(Debug, Clone, Default)]
struct UploadedPart {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
    folder_id: Option<String>,
}

#[derive(Debug, Default)]
struct Backend {
    uploads: Mutex<Vec<UploadedPart>>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    summarized: Mutex<Vec<i64>>,
}

fn file_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "fileName": name,
        "fileType": "application/pdf",
        "size": 1024,
        "summary": "An invoice.",
        "classification": "Receipts",
        "uploadTimestamp": "2024-03-01T10:15:30"
    })
}

async fn list_folders() -> Json<Value> {
    Json(json!([
        { "id": 1, "name": "Receipts", "creationTimestamp": "2024-01-02T08:00:00" },
        { "id": 2, "name": "Contracts" }
    ]))
}

async fn create_folder(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Json<Value> {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    backend.created.lock().push(name.clone());
    Json(json!({ "id": 3, "name": name }))
}

async fn delete_folder(State(backend): State<Arc<Backend>>, Path(id): Path<i64>) -> StatusCode {
    backend.deleted.lock().push(format!("folder:{id}"));
    StatusCode::NO_CONTENT
}

async fn folder_files(Path(id): Path<i64>) -> Response {
    match id {
        1 => Json(json!([file_json(10, "invoice.pdf")])).into_response(),
        2 => Json(json!([])).into_response(),
        7 => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn unassigned() -> Json<Value> {
    Json(json!([{ "id": 11, "fileName": "loose.txt" }]))
}

async fn upload(State(backend): State<Arc<Backend>>, mut multipart: Multipart) -> Response {
    let mut part = UploadedPart::default();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        match field.name() {
            Some("file") => {
                part.file_name = field.file_name().map(str::to_string);
                part.content_type = field.content_type().map(str::to_string);
                part.bytes = field.bytes().await.expect("file bytes").to_vec();
            }
            Some("folderId") => {
                part.folder_id = Some(field.text().await.expect("folder id"));
            }
            _ => {}
        }
    }
    let name = part.file_name.clone().unwrap_or_default();
    backend.uploads.lock().push(part);
    if name == "reject.pdf" {
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }
    Json(file_json(20, &name)).into_response()
}

async fn delete_file(State(backend): State<Arc<Backend>>, Path(id): Path<i64>) -> StatusCode {
    if id == 500 {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    backend.deleted.lock().push(format!("file:{id}"));
    StatusCode::OK
}

async fn view_url(Path(id): Path<i64>) -> Response {
    match id {
        1 => Json(json!({ "url": "https://bucket.example/one?sig=1" })).into_response(),
        2 => Json(json!("https://bucket.example/two?sig=2")).into_response(),
        3 => "https://bucket.example/three?sig=3".into_response(),
        4 => StatusCode::OK.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn generate_summary(State(backend): State<Arc<Backend>>, Path(id): Path<i64>) -> StatusCode {
    if id == 429 {
        return StatusCode::TOO_MANY_REQUESTS;
    }
    backend.summarized.lock().push(id);
    StatusCode::ACCEPTED
}

async fn serve() -> (HttpDocumentApi, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/folders", get(list_folders).post(create_folder))
        .route("/api/folders/{id}", delete(delete_folder))
        .route("/api/folders/{id}/files", get(folder_files))
        .route("/api/files/unassigned", get(unassigned))
        .route("/api/files/upload", post(upload))
        .route("/api/files/{id}", delete(delete_file))
        .route("/api/files/{id}/view-url", get(view_url))
        .route("/api/files/{id}/generate-summary", post(generate_summary))
        .with_state(Arc::clone(&backend));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend");
    });

    let api = HttpDocumentApi::new(&format!("http://{addr}/api/"), Duration::from_secs(5))
        .expect("client should build");
    (api, backend)
}

#[tokio::test]
async fn lists_folders_and_files() {
    let (api, _backend) = serve().await;

    let folders = api.list_folders().await.expect("folders");
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].name, "Receipts");
    assert!(folders[0].creation_timestamp.is_some());
    assert!(folders[1].creation_timestamp.is_none());

    let files = api.list_folder_files(1).await.expect("folder files");
    assert_eq!(files[0].file_name, "invoice.pdf");
    assert_eq!(files[0].size, Some(1024));
    assert!(files[0].upload_timestamp.is_some());
    assert!(api.list_folder_files(2).await.expect("empty folder").is_empty());

    let loose = api.list_unassigned_files().await.expect("unassigned");
    assert_eq!(loose[0].id, 11);
    assert!(loose[0].summary.is_none());
}

#[tokio::test]
async fn creates_and_deletes() {
    let (api, backend) = serve().await;

    let folder = api.create_folder("Taxes").await.expect("create");
    assert_eq!(folder.id, 3);
    assert_eq!(backend.created.lock().as_slice(), ["Taxes".to_string()]);

    api.delete_folder(1).await.expect("delete folder");
    api.delete_file(9).await.expect("delete file");
    assert_eq!(
        backend.deleted.lock().as_slice(),
        ["folder:1".to_string(), "file:9".to_string()]
    );
}

#[tokio::test]
async fn upload_sends_multipart_with_optional_folder() {
    let (api, backend) = serve().await;
    let file = LocalFile::new("invoice.pdf", b"%PDF-1.7".to_vec());

    let record = api.upload_file(&file, Some(1)).await.expect("targeted upload");
    assert_eq!(record.file_name, "invoice.pdf");
    api.upload_file(&file, None).await.expect("untargeted upload");

    let uploads = backend.uploads.lock().clone();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].file_name.as_deref(), Some("invoice.pdf"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(uploads[0].bytes, b"%PDF-1.7");
    assert_eq!(uploads[0].folder_id.as_deref(), Some("1"));
    assert_eq!(uploads[1].folder_id, None);
}

#[tokio::test]
async fn view_url_accepts_every_response_shape() {
    let (api, _backend) = serve().await;

    assert_eq!(
        api.view_url(1).await.expect("wrapped"),
        "https://bucket.example/one?sig=1"
    );
    assert_eq!(
        api.view_url(2).await.expect("json string"),
        "https://bucket.example/two?sig=2"
    );
    assert_eq!(
        api.view_url(3).await.expect("plain text"),
        "https://bucket.example/three?sig=3"
    );
    let err = api.view_url(4).await.expect_err("empty body");
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn non_success_statuses_map_to_http_errors() {
    let (api, backend) = serve().await;

    let err = api.list_folder_files(99).await.expect_err("missing folder");
    assert!(matches!(err, ClientError::Http { status: 404, method: "GET", .. }));

    let err = api.view_url(5).await.expect_err("unauthorized");
    assert_eq!(err.category(), ErrorCategory::Auth);

    let err = api.generate_summary(429).await.expect_err("throttled");
    assert_eq!(err.category(), ErrorCategory::RateLimited);
    api.generate_summary(7).await.expect("accepted");
    assert_eq!(backend.summarized.lock().as_slice(), [7]);

    let err = api.delete_file(500).await.expect_err("server error");
    assert_eq!(err.category(), ErrorCategory::Server);

    let file = LocalFile::new("reject.pdf", vec![0; 16]);
    let err = api.upload_file(&file, None).await.expect_err("rejected upload");
    assert!(matches!(err, ClientError::Http { status: 413, method: "POST", .. }));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (api, _backend) = serve().await;
    let err = api.list_folder_files(7).await.expect_err("bad json");
    assert!(matches!(err, ClientError::Decode { .. }));
    assert_eq!(err.category(), ErrorCategory::Decode);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let api = HttpDocumentApi::new(&format!("http://{addr}"), Duration::from_secs(2))
        .expect("client should build");
    let err = api.list_folders().await.expect_err("nothing listening");
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.category(), ErrorCategory::Network);
}
