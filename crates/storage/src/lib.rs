use directories::ProjectDirs;
use doc_model::{DocumentId, DocumentRecord, Snapshot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod memory;

pub use memory::MemoryStore;

const DOCUMENTS_SCHEMA_VERSION: u32 = 1;
const SNAPSHOT_KEY_PREFIX: &str = "documentData_";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored data for {key} is malformed: {source}")]
    Malformed { key: String, source: serde_json::Error },
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Key a document's snapshot is stored under.
pub fn snapshot_key(id: &DocumentId) -> String {
    format!("{SNAPSHOT_KEY_PREFIX}{id}")
}

/// Per-document snapshot persistence. `put` overwrites the whole snapshot.
pub trait SnapshotStore {
    fn get(&self, id: &DocumentId) -> Result<Option<Snapshot>, StorageError>;

    fn put(&self, id: &DocumentId, snapshot: &Snapshot) -> Result<(), StorageError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &S {
    fn get(&self, id: &DocumentId) -> Result<Option<Snapshot>, StorageError> {
        (**self).get(id)
    }

    fn put(&self, id: &DocumentId, snapshot: &Snapshot) -> Result<(), StorageError> {
        (**self).put(id, snapshot)
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::rc::Rc<S> {
    fn get(&self, id: &DocumentId) -> Result<Option<Snapshot>, StorageError> {
        (**self).get(id)
    }

    fn put(&self, id: &DocumentId, snapshot: &Snapshot) -> Result<(), StorageError> {
        (**self).put(id, snapshot)
    }
}

pub(crate) fn parse_snapshot(key: &str, bytes: &[u8]) -> Result<Snapshot, StorageError> {
    serde_json::from_slice(bytes)
        .map_err(|source| StorageError::Malformed { key: key.to_owned(), source })
}

/// File-backed store. One JSON file per snapshot key under `snapshots/`, plus
/// the shell's `documents.json`.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsEnvelope {
    version: u32,
    documents: Vec<DocumentRecord>,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs =
            ProjectDirs::from("dev", "DocNote", "DocNote").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_documents(&self) -> Result<Vec<DocumentRecord>, StorageError> {
        let path = self.documents_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(path)?;
        let envelope: DocumentsEnvelope = serde_json::from_slice(&bytes)?;

        Ok(envelope.documents)
    }

    pub fn save_documents(&self, documents: &[DocumentRecord]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            DocumentsEnvelope { version: DOCUMENTS_SCHEMA_VERSION, documents: documents.to_vec() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_replacing(&self.documents_path(), &bytes)
    }

    fn documents_path(&self) -> PathBuf {
        self.root.join("documents.json")
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.root.join("snapshots").join(format!("{}.json", file_name_for_key(key)))
    }
}

impl SnapshotStore for Storage {
    fn get(&self, id: &DocumentId) -> Result<Option<Snapshot>, StorageError> {
        let key = snapshot_key(id);
        let path = self.snapshot_path(&key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        parse_snapshot(&key, &bytes).map(Some)
    }

    fn put(&self, id: &DocumentId, snapshot: &Snapshot) -> Result<(), StorageError> {
        let key = snapshot_key(id);
        let path = self.snapshot_path(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(snapshot)?;
        write_replacing(&path, &bytes)?;
        tracing::debug!(%key, bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

/// Write through a sibling temp file so readers never see a partial file.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}

/// Ids are opaque, so anything outside `[A-Za-z0-9_-]` is percent-encoded.
fn file_name_for_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name
}
