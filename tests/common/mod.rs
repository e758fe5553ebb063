//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use debo::config::FolderConfig;
use debo::conversation::{Engine, Sender};
use debo::errors::UploadError;
use debo::registrant::{standard_header, ColumnMap, Registrant};
use debo::registry::Registry;
use debo::store::MemoryStore;
use debo::upload::{share_link, FileKind, FileSource, InboundFile, RemoteStorage, UploadRelay};

pub const MAX_UPLOAD: u64 = 1024 * 1024;

/// Serves a few bytes for every file id except the ones marked as failing
#[derive(Default)]
pub struct FakeSource {
    pub failing: HashSet<String>,
    pub downloads: AtomicUsize,
}

#[async_trait]
impl FileSource for FakeSource {
    async fn download(&self, file_id: &str, dest: &mut tokio::fs::File) -> Result<u64, UploadError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(file_id) {
            return Err(UploadError::Download(format!("{file_id} unavailable")));
        }
        let bytes = format!("contents of {file_id}");
        dest.write_all(bytes.as_bytes()).await?;
        Ok(bytes.len() as u64)
    }
}

/// Records every staged path and returns sequential Drive links
#[derive(Default)]
pub struct FakeStorage {
    pub fail: bool,
    pub staged: Mutex<Vec<PathBuf>>,
    pub stored: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl RemoteStorage for FakeStorage {
    async fn store(&self, path: &Path, folder_id: &str, name: &str) -> Result<String, UploadError> {
        assert!(path.exists(), "staged file must exist during upload");
        self.staged.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(UploadError::Upload("quota exceeded".to_string()));
        }
        let mut stored = self.stored.lock().unwrap();
        stored.push((folder_id.to_string(), name.to_string()));
        Ok(share_link(&format!("drive{}", stored.len())))
    }
}

pub fn folders() -> FolderConfig {
    FolderConfig {
        testimonials: "testimonial-folder".to_string(),
        education: "education-folder".to_string(),
    }
}

pub fn relay_with(source: Arc<FakeSource>, storage: Arc<FakeStorage>) -> Arc<UploadRelay> {
    Arc::new(UploadRelay::new(source, storage, folders(), MAX_UPLOAD))
}

pub fn document(file_id: &str) -> InboundFile {
    InboundFile {
        file_id: file_id.to_string(),
        file_name: Some(format!("{file_id}.pdf")),
        size: 64,
        kind: FileKind::Document,
    }
}

pub fn sender(user_id: u64) -> Sender {
    Sender {
        user_id,
        username: Some(format!("user{user_id}")),
    }
}

pub fn registrant(user_id: u64, full_name: &str) -> Registrant {
    Registrant {
        user_id,
        username: format!("user{user_id}"),
        full_name: full_name.to_string(),
        profession: "Electrician".to_string(),
        phone: "+251911000000".to_string(),
        location: "9.03, 38.74".to_string(),
        region_city_woreda: "Addis Ababa, Bole, 03".to_string(),
        comment: String::new(),
        testimonial_links: vec![share_link("old1")],
        education_links: Vec::new(),
    }
}

pub fn store_with(records: &[Registrant]) -> Arc<MemoryStore> {
    let columns = ColumnMap::standard();
    Arc::new(MemoryStore::with_rows(
        standard_header(),
        records.iter().map(|r| r.to_row(&columns)).collect(),
    ))
}

pub fn registry_over(store: Arc<MemoryStore>) -> Arc<Registry> {
    Arc::new(Registry::with_columns(store, ColumnMap::standard()))
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub source: Arc<FakeSource>,
    pub storage: Arc<FakeStorage>,
    pub engine: Engine,
}

pub fn harness(records: &[Registrant]) -> Harness {
    harness_with(records, FakeSource::default(), FakeStorage::default())
}

pub fn harness_with(records: &[Registrant], source: FakeSource, storage: FakeStorage) -> Harness {
    let store = store_with(records);
    let source = Arc::new(source);
    let storage = Arc::new(storage);
    let engine = Engine::new(
        registry_over(store.clone()),
        relay_with(source.clone(), storage.clone()),
    );
    Harness {
        store,
        source,
        storage,
        engine,
    }
}
