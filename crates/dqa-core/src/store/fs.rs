use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{ensure_matching_id, SessionStore, StorageError, StorageResult};
use crate::domain::session::{SessionId, SessionRecord};

/// Filesystem-backed session store.
///
/// Layout: `<root>/sessions/<session_id>.json` plus `<session_id>.digest`
/// holding the SHA-256 hex of the JSON bytes. The digest is checked on load.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    sessions_dir: PathBuf,
}

impl FsSessionStore {
    /// Create a new `FsSessionStore` rooted at `root`. Creates `root/sessions/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let sessions_dir = root.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    /// Session ids become file names, so only `[A-Za-z0-9_-]` is accepted.
    fn checked_id(session_id: &SessionId) -> StorageResult<String> {
        let id = session_id.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidId {
                session_id: id.to_string(),
            });
        }
        Ok(id.to_string())
    }

    fn record_path(dir: &Path, session_id: &str) -> PathBuf {
        dir.join(format!("{session_id}.json"))
    }

    fn digest_path(dir: &Path, session_id: &str) -> PathBuf {
        dir.join(format!("{session_id}.digest"))
    }

    /// Write `data` to `path` through a temp file, refusing to replace an
    /// existing file. Losing a race for `path` maps to `AlreadyExists`.
    fn write_new(dir: &Path, path: &Path, session_id: &str, data: &[u8]) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists {
                    session_id: session_id.to_string(),
                }
            } else {
                StorageError::Io(e.error)
            }
        })?;
        Ok(())
    }

    fn save_blocking(dir: &Path, session_id: &str, json: &[u8]) -> StorageResult<()> {
        let digest = hex::encode(Sha256::digest(json));
        // The digest file claims the id. A record file never appears without
        // the digest of its own bytes next to it.
        Self::write_new(dir, &Self::digest_path(dir, session_id), session_id, digest.as_bytes())?;
        Self::write_new(dir, &Self::record_path(dir, session_id), session_id, json)
    }

    fn load_blocking(dir: &Path, session_id: &str) -> StorageResult<SessionRecord> {
        let json = fs::read(Self::record_path(dir, session_id)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound {
                    session_id: session_id.to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        let expected = fs::read_to_string(Self::digest_path(dir, session_id))?;
        let actual = hex::encode(Sha256::digest(&json));
        if expected.trim() != actual {
            return Err(StorageError::DigestMismatch {
                session_id: session_id.to_string(),
                expected: expected.trim().to_string(),
                actual,
            });
        }
        Ok(serde_json::from_slice(&json)?)
    }

    fn list_blocking(dir: &Path) -> StorageResult<Vec<SessionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(SessionId::from(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

async fn run_blocking<T, F>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Backend(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn save(&self, session_id: &SessionId, record: &SessionRecord) -> StorageResult<()> {
        ensure_matching_id(session_id, record)?;
        let json = serde_json::to_vec_pretty(record)?;
        let dir = self.sessions_dir.clone();
        let id = Self::checked_id(session_id)?;
        run_blocking(move || Self::save_blocking(&dir, &id, &json)).await
    }

    async fn load(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let dir = self.sessions_dir.clone();
        let id = Self::checked_id(session_id)?;
        run_blocking(move || Self::load_blocking(&dir, &id)).await
    }

    async fn list(&self) -> StorageResult<Vec<SessionId>> {
        let dir = self.sessions_dir.clone();
        run_blocking(move || Self::list_blocking(&dir)).await
    }
}
