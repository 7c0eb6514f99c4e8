//! Datasource backend: the byte-oriented storage capability the engine
//! consumes. Remote backends (WebDAV, cloud storage, HTTP APIs) are out of
//! scope; this module ships the two reference adapters every embedder
//! needs to get started: an in-memory backend for tests, and a local
//! filesystem backend for local-first persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::IoError;

/// Byte-oriented storage the engine consumes for vault files and
/// attachments. Synchronous, like the teacher's storage-backend trait,
/// even though the engine's own orchestration methods are `async` — I/O
/// here is expected to be local and fast; a slow or remote backend should
/// wrap this trait rather than make it `async`.
pub trait DatasourceBackend: Send + Sync {
    fn get_file_contents(&self, path: &str) -> Result<Vec<u8>, IoError>;
    fn put_file_contents(&self, path: &str, bytes: &[u8]) -> Result<(), IoError>;
    /// `None` means unknown/unlimited.
    fn available_storage(&self) -> Option<u64>;
    fn get_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<Vec<u8>, IoError>;
    fn put_attachment(
        &self,
        vault_id: &str,
        attachment_id: &str,
        bytes: &[u8],
        details_json: &str,
    ) -> Result<(), IoError>;
    fn remove_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<(), IoError>;
    fn supports_attachments(&self) -> bool {
        true
    }
    fn supports_remote_bypass(&self) -> bool {
        false
    }
}

/// In-memory storage for tests and ephemeral use.
#[derive(Default)]
pub struct InMemoryBackend {
    files: RwLock<HashMap<String, Vec<u8>>>,
    attachments: RwLock<HashMap<(String, String), (Vec<u8>, String)>>,
    available_storage: RwLock<Option<u64>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value `available_storage()` will report, for exercising
    /// the attachment subsystem's quota check.
    pub fn set_available_storage(&self, bytes: Option<u64>) {
        *self.available_storage.write().unwrap() = bytes;
    }
}

impl DatasourceBackend for InMemoryBackend {
    fn get_file_contents(&self, path: &str) -> Result<Vec<u8>, IoError> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| IoError::NotFound(path.to_string()))
    }

    fn put_file_contents(&self, path: &str, bytes: &[u8]) -> Result<(), IoError> {
        self.files.write().unwrap().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn available_storage(&self) -> Option<u64> {
        *self.available_storage.read().unwrap()
    }

    fn get_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<Vec<u8>, IoError> {
        self.attachments
            .read()
            .unwrap()
            .get(&(vault_id.to_string(), attachment_id.to_string()))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| IoError::NotFound(attachment_id.to_string()))
    }

    fn put_attachment(
        &self,
        vault_id: &str,
        attachment_id: &str,
        bytes: &[u8],
        details_json: &str,
    ) -> Result<(), IoError> {
        self.attachments.write().unwrap().insert(
            (vault_id.to_string(), attachment_id.to_string()),
            (bytes.to_vec(), details_json.to_string()),
        );
        Ok(())
    }

    fn remove_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<(), IoError> {
        self.attachments
            .write()
            .unwrap()
            .remove(&(vault_id.to_string(), attachment_id.to_string()));
        Ok(())
    }
}

/// Local filesystem storage rooted at a directory:
/// ```text
/// {root}/{path}                                   vault files
/// {root}/attachments/{vaultID}/{attachmentID}.bin  attachment blobs
/// {root}/attachments/{vaultID}/{attachmentID}.json attachment details
/// ```
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, IoError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| IoError::Other(e.to_string()))?;
        Ok(Self { root })
    }

    fn attachment_dir(&self, vault_id: &str) -> PathBuf {
        self.root.join("attachments").join(vault_id)
    }

    fn io_err(path: &Path, e: std::io::Error) -> IoError {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(path.display().to_string())
        } else {
            IoError::Other(format!("{}: {e}", path.display()))
        }
    }
}

impl DatasourceBackend for FileBackend {
    fn get_file_contents(&self, path: &str) -> Result<Vec<u8>, IoError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| Self::io_err(&full, e))
    }

    fn put_file_contents(&self, path: &str, bytes: &[u8]) -> Result<(), IoError> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::io_err(parent, e))?;
        }
        let tmp = full.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| Self::io_err(&tmp, e))?;
        std::fs::rename(&tmp, &full).map_err(|e| Self::io_err(&full, e))
    }

    fn available_storage(&self) -> Option<u64> {
        None
    }

    fn get_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<Vec<u8>, IoError> {
        let path = self.attachment_dir(vault_id).join(format!("{attachment_id}.bin"));
        std::fs::read(&path).map_err(|e| Self::io_err(&path, e))
    }

    fn put_attachment(
        &self,
        vault_id: &str,
        attachment_id: &str,
        bytes: &[u8],
        details_json: &str,
    ) -> Result<(), IoError> {
        let dir = self.attachment_dir(vault_id);
        std::fs::create_dir_all(&dir).map_err(|e| Self::io_err(&dir, e))?;
        let blob_path = dir.join(format!("{attachment_id}.bin"));
        let details_path = dir.join(format!("{attachment_id}.json"));
        std::fs::write(&blob_path, bytes).map_err(|e| Self::io_err(&blob_path, e))?;
        std::fs::write(&details_path, details_json.as_bytes()).map_err(|e| Self::io_err(&details_path, e))
    }

    fn remove_attachment(&self, vault_id: &str, attachment_id: &str) -> Result<(), IoError> {
        let dir = self.attachment_dir(vault_id);
        let blob_path = dir.join(format!("{attachment_id}.bin"));
        let details_path = dir.join(format!("{attachment_id}.json"));
        if blob_path.exists() {
            std::fs::remove_file(&blob_path).map_err(|e| Self::io_err(&blob_path, e))?;
        }
        if details_path.exists() {
            std::fs::remove_file(&details_path).map_err(|e| Self::io_err(&details_path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trips_files_and_attachments() {
        let backend = InMemoryBackend::new();
        backend.put_file_contents("vault.bin", b"data").unwrap();
        assert_eq!(backend.get_file_contents("vault.bin").unwrap(), b"data");

        backend.put_attachment("v1", "a1", b"blob", "{}").unwrap();
        assert_eq!(backend.get_attachment("v1", "a1").unwrap(), b"blob");
        backend.remove_attachment("v1", "a1").unwrap();
        assert!(backend.get_attachment("v1", "a1").is_err());
    }

    #[test]
    fn in_memory_missing_file_is_not_found() {
        let backend = InMemoryBackend::new();
        assert!(matches!(backend.get_file_contents("nope"), Err(IoError::NotFound(_))));
    }

    #[test]
    fn file_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        backend.put_file_contents("vault.bin", b"hello").unwrap();
        assert_eq!(backend.get_file_contents("vault.bin").unwrap(), b"hello");

        backend.put_attachment("v1", "a1", b"blob", r#"{"id":"a1"}"#).unwrap();
        assert_eq!(backend.get_attachment("v1", "a1").unwrap(), b"blob");
        backend.remove_attachment("v1", "a1").unwrap();
        assert!(backend.get_attachment("v1", "a1").is_err());
    }
}
