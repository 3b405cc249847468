// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence backends: JSON file with atomic writes, or memory.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialPair;

/// On-disk form of the credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCredentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<&CredentialPair> for PersistedCredentials {
    fn from(pair: &CredentialPair) -> Self {
        Self { access_token: pair.access.clone(), refresh_token: pair.refresh.clone() }
    }
}

impl From<PersistedCredentials> for CredentialPair {
    fn from(p: PersistedCredentials) -> Self {
        Self { access: p.access_token, refresh: p.refresh_token }
    }
}

/// Persistent key-value storage for the credential pair. Survives restarts.
pub trait CredentialBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> anyhow::Result<Option<PersistedCredentials>>;
    fn save(&self, creds: &PersistedCredentials) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Credentials kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<PersistedCredentials>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(creds: PersistedCredentials) -> Self {
        Self { slot: Mutex::new(Some(creds)) }
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> anyhow::Result<Option<PersistedCredentials>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, creds: &PersistedCredentials) -> anyhow::Result<()> {
        *self.slot.lock() = Some(creds.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Credentials stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self) -> anyhow::Result<Option<PersistedCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load(&self.path).map(Some)
    }

    fn save(&self, creds: &PersistedCredentials) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        save(&self.path, creds)
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load persisted credentials from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<PersistedCredentials> {
    let contents = std::fs::read_to_string(path)?;
    let creds: PersistedCredentials = serde_json::from_str(&contents)?;
    Ok(creds)
}

/// Save credentials to a JSON file atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so concurrent saves never
/// share a `.tmp` file.
pub fn save(path: &Path, creds: &PersistedCredentials) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(creds)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    restrict_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
