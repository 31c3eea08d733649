//! Directory-backed [`ObjectStore`].
//!
//! Layout: `<root>/<namespace>/secrets/<name>.json` and
//! `<root>/<namespace>/accounts/<name>.json`.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

use super::ObjectStore;
use crate::{
    account::{Account, AccountStatus, CredentialKind},
    error::{ObjectKind, StoreError},
    secret::Secret,
};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write of account records within this process
    accounts_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            accounts_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, kind: ObjectKind, name: &str, namespace: &str) -> Result<PathBuf, StoreError> {
        for part in [name, namespace] {
            if part.is_empty() || part.contains(['/', '\\']) || part.starts_with('.') {
                return Err(StoreError::Backend(format!("Invalid object name: '{part}'")));
            }
        }
        let dir = match kind {
            ObjectKind::Secret => "secrets",
            ObjectKind::Account => "accounts",
        };
        Ok(self
            .root
            .join(namespace)
            .join(dir)
            .join(format!("{name}.json")))
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        kind: ObjectKind,
        name: &str,
        namespace: &str,
    ) -> Result<T, StoreError> {
        let path = self.path(kind, name, namespace)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::not_found(kind, name, namespace))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, content: &[u8], create_new: bool) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if create_new {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        if create_new {
            sync_parent(path).await?;
        }
        Ok(())
    }

    /// Write to a sibling temp file and rename over the target.
    async fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        self.write(&tmp, content, false).await?;
        fs::rename(&tmp, path).await?;
        sync_parent(path).await
    }
}

/// Flush the directory entry of `path` so a completed create or rename
/// survives a crash.
async fn sync_parent(path: &Path) -> Result<(), StoreError> {
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        fs::File::open(parent).await?.sync_all().await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get_secret(&self, name: &str, namespace: &str) -> Result<Secret, StoreError> {
        self.read(ObjectKind::Secret, name, namespace).await
    }

    async fn delete_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let path = self.path(ObjectKind::Secret, &secret.name, &secret.namespace)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(
                ObjectKind::Secret,
                &secret.name,
                &secret.namespace,
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let path = self.path(ObjectKind::Secret, &secret.name, &secret.namespace)?;
        let content = serde_json::to_vec_pretty(secret)?;
        match self.write(&path, &content, true).await {
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => Err(
                StoreError::conflict(ObjectKind::Secret, &secret.name, &secret.namespace),
            ),
            other => other,
        }
    }

    fn supports_atomic_put(&self) -> bool {
        true
    }

    async fn put_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let path = self.path(ObjectKind::Secret, &secret.name, &secret.namespace)?;
        let content = serde_json::to_vec_pretty(secret)?;
        self.write_atomic(&path, &content).await
    }

    async fn get_account(&self, name: &str, namespace: &str) -> Result<Account, StoreError> {
        self.read(ObjectKind::Account, name, namespace).await
    }

    async fn clear_rotation_flag(
        &self,
        name: &str,
        namespace: &str,
        kind: CredentialKind,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<AccountStatus, StoreError> {
        let _guard = self.accounts_lock.lock().await;

        let mut stored: Account = self.read(ObjectKind::Account, name, namespace).await?;
        stored.mark_rotated(kind, expiry);

        let path = self.path(ObjectKind::Account, name, namespace)?;
        let content = serde_json::to_vec_pretty(&stored)?;
        self.write_atomic(&path, &content).await?;
        Ok(stored.status)
    }
}

impl FileStore {
    /// Write a full account record. Used when seeding the store.
    pub async fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        let _guard = self.accounts_lock.lock().await;
        let path = self.path(ObjectKind::Account, &account.name, &account.namespace)?;
        let content = serde_json::to_vec_pretty(account)?;
        self.write_atomic(&path, &content).await
    }
}
