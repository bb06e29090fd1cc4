//! In-memory backend used by the workflow integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use docuintel::api::DocumentApi;
use docuintel::library::{FileId, FileRecord, FolderId, FolderRecord, LocalFile};
use docuintel::workflow::FixedDelayPoll;
use docuintel::{AutoConfirm, ClientError, ClientResult, NoticeBoard, RetryPolicy, ViewController};

#[derive(Debug, Clone)]
struct StoredFile {
    record: FileRecord,
    folder: Option<FolderId>,
}

#[derive(Debug)]
struct Placement {
    file_name: String,
    folder_name: String,
    /// `list_folders` calls still to go before the placement lands.
    passes_left: usize,
}

#[derive(Debug)]
struct SummaryScript {
    placeholder_reads_left: usize,
    text: String,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: i64,
    folders: Vec<FolderRecord>,
    files: Vec<StoredFile>,
    calls: Vec<String>,
    placements: Vec<Placement>,
    summaries: HashMap<FileId, SummaryScript>,
    failing_uploads: HashSet<String>,
    failing_folder_lists: HashSet<FolderId>,
    fail_list_folders: bool,
    fail_unassigned: bool,
    fail_mutations: bool,
    latencies: HashMap<FolderId, VecDeque<Duration>>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                next_id: 100,
                ..FakeState::default()
            }),
        })
    }

    pub fn add_folder(&self, name: &str) -> FolderRecord {
        let mut state = self.state.lock();
        Self::insert_folder(&mut state, name)
    }

    pub fn add_file(&self, name: &str, folder: Option<FolderId>) -> FileRecord {
        let mut state = self.state.lock();
        state.next_id += 1;
        let record = FileRecord {
            id: state.next_id,
            file_name: name.into(),
            file_type: None,
            size: None,
            summary: None,
            classification: None,
            upload_timestamp: None,
        };
        state.files.push(StoredFile {
            record: record.clone(),
            folder,
        });
        record
    }

    /// Move an uploaded file named `file_name` into `folder_name` once
    /// `passes` folder listings have been requested.
    pub fn classify_after(&self, file_name: &str, folder_name: &str, passes: usize) {
        self.state.lock().placements.push(Placement {
            file_name: file_name.into(),
            folder_name: folder_name.into(),
            passes_left: passes,
        });
    }

    pub fn script_summary(&self, id: FileId, placeholder_reads: usize, text: &str) {
        self.state.lock().summaries.insert(
            id,
            SummaryScript {
                placeholder_reads_left: placeholder_reads,
                text: text.into(),
            },
        );
    }

    pub fn fail_upload_of(&self, name: &str) {
        self.state.lock().failing_uploads.insert(name.into());
    }

    pub fn fail_folder_listing(&self, id: FolderId) {
        self.state.lock().failing_folder_lists.insert(id);
    }

    pub fn fail_list_folders(&self, fail: bool) {
        self.state.lock().fail_list_folders = fail;
    }

    pub fn fail_unassigned(&self, fail: bool) {
        self.state.lock().fail_unassigned = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().fail_mutations = fail;
    }

    /// Delay the next listing of `folder` by `delay`.
    pub fn delay_next_listing(&self, folder: FolderId, delay: Duration) {
        self.state
            .lock()
            .latencies
            .entry(folder)
            .or_default()
            .push_back(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn folder_of(&self, id: FileId) -> Option<FolderId> {
        self.state
            .lock()
            .files
            .iter()
            .find(|f| f.record.id == id)
            .and_then(|f| f.folder)
    }

    pub fn file_ids(&self) -> Vec<FileId> {
        self.state.lock().files.iter().map(|f| f.record.id).collect()
    }

    fn insert_folder(state: &mut FakeState, name: &str) -> FolderRecord {
        state.next_id += 1;
        let folder = FolderRecord {
            id: state.next_id,
            name: name.into(),
            creation_timestamp: None,
        };
        state.folders.push(folder.clone());
        folder
    }

    fn apply_placements(state: &mut FakeState) {
        let mut landed = Vec::new();
        for placement in state.placements.iter_mut() {
            placement.passes_left = placement.passes_left.saturating_sub(1);
            if placement.passes_left == 0 {
                landed.push((placement.file_name.clone(), placement.folder_name.clone()));
            }
        }
        state.placements.retain(|p| p.passes_left > 0);

        for (file_name, folder_name) in landed {
            let existing = state
                .folders
                .iter()
                .find(|f| f.name == folder_name)
                .map(|f| f.id);
            let folder_id = match existing {
                Some(id) => id,
                None => Self::insert_folder(state, &folder_name).id,
            };
            for file in state
                .files
                .iter_mut()
                .filter(|f| f.folder.is_none() && f.record.file_name == file_name)
            {
                file.folder = Some(folder_id);
                file.record.classification = Some(folder_name.clone());
            }
        }
    }

    fn read_listing(state: &mut FakeState, folder: Option<FolderId>) -> Vec<FileRecord> {
        let mut out = Vec::new();
        for file in state.files.iter().filter(|f| f.folder == folder) {
            let mut record = file.record.clone();
            if let Some(script) = state.summaries.get_mut(&record.id) {
                if script.placeholder_reads_left > 0 {
                    script.placeholder_reads_left -= 1;
                    record.summary = None;
                } else {
                    record.summary = Some(script.text.clone());
                }
            }
            out.push(record);
        }
        out
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

fn server_error(method: &'static str, path: String) -> ClientError {
    ClientError::Http {
        method,
        path,
        status: 500,
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn list_folders(&self) -> ClientResult<Vec<FolderRecord>> {
        self.record("list_folders".into());
        let mut state = self.state.lock();
        if state.fail_list_folders {
            return Err(server_error("GET", "/folders".into()));
        }
        Self::apply_placements(&mut state);
        Ok(state.folders.clone())
    }

    async fn create_folder(&self, name: &str) -> ClientResult<FolderRecord> {
        self.record(format!("create_folder:{name}"));
        let mut state = self.state.lock();
        if state.fail_mutations {
            return Err(server_error("POST", "/folders".into()));
        }
        Ok(Self::insert_folder(&mut state, name))
    }

    async fn delete_folder(&self, id: FolderId) -> ClientResult<()> {
        self.record(format!("delete_folder:{id}"));
        let mut state = self.state.lock();
        if state.fail_mutations {
            return Err(server_error("DELETE", format!("/folders/{id}")));
        }
        state.folders.retain(|f| f.id != id);
        state.files.retain(|f| f.folder != Some(id));
        Ok(())
    }

    async fn list_folder_files(&self, id: FolderId) -> ClientResult<Vec<FileRecord>> {
        self.record(format!("list_folder_files:{id}"));
        // The reply is decided when the request arrives and delivered late.
        let (reply, delay) = {
            let mut state = self.state.lock();
            let delay = state
                .latencies
                .get_mut(&id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default();
            let reply = if state.failing_folder_lists.contains(&id) {
                Err(server_error("GET", format!("/folders/{id}/files")))
            } else {
                Ok(Self::read_listing(&mut state, Some(id)))
            };
            (reply, delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    async fn list_unassigned_files(&self) -> ClientResult<Vec<FileRecord>> {
        self.record("list_unassigned".into());
        let mut state = self.state.lock();
        if state.fail_unassigned {
            return Err(server_error("GET", "/files/unassigned".into()));
        }
        Ok(Self::read_listing(&mut state, None))
    }

    async fn upload_file(
        &self,
        file: &LocalFile,
        folder: Option<FolderId>,
    ) -> ClientResult<FileRecord> {
        self.record(format!("upload:{}", file.name));
        if self.state.lock().failing_uploads.contains(&file.name) {
            return Err(server_error("POST", "/files/upload".into()));
        }
        let mut record = self.add_file(&file.name, folder);
        record.size = Some(file.len());
        record.file_type = Some(file.mime_type.clone());
        Ok(record)
    }

    async fn delete_file(&self, id: FileId) -> ClientResult<()> {
        self.record(format!("delete_file:{id}"));
        let mut state = self.state.lock();
        if state.fail_mutations {
            return Err(server_error("DELETE", format!("/files/{id}")));
        }
        state.files.retain(|f| f.record.id != id);
        Ok(())
    }

    async fn view_url(&self, id: FileId) -> ClientResult<String> {
        self.record(format!("view_url:{id}"));
        Ok(format!("https://bucket.example/{id}?sig=abc"))
    }

    async fn generate_summary(&self, id: FileId) -> ClientResult<()> {
        self.record(format!("generate_summary:{id}"));
        Ok(())
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub notices: Arc<NoticeBoard>,
    pub view: Arc<ViewController>,
}

/// Controller over a fake backend with instant polling and auto-confirm.
pub fn harness(confirm: bool) -> Harness {
    harness_with(confirm, |view| view)
}

pub fn harness_with(
    confirm: bool,
    customize: impl FnOnce(ViewController) -> ViewController,
) -> Harness {
    let api = FakeApi::new();
    let notices = Arc::new(NoticeBoard::new());
    let view = ViewController::new(api.clone(), notices.clone(), Arc::new(AutoConfirm(confirm)))
        .with_signal(Arc::new(FixedDelayPoll::immediate()))
        .with_summary_poll(RetryPolicy::new(0, 0), 10);
    Harness {
        api,
        notices,
        view: Arc::new(customize(view)),
    }
}

pub fn local(name: &str) -> LocalFile {
    LocalFile::new(name, format!("contents of {name}").into_bytes())
}
