//! Object store holding account records and secrets.

use async_trait::async_trait;

use chrono::{DateTime, Utc};

use crate::{
    account::{Account, AccountStatus, CredentialKind},
    error::StoreError,
    secret::Secret,
};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fails with [`StoreError::NotFound`] when no such secret exists.
    async fn get_secret(&self, name: &str, namespace: &str) -> Result<Secret, StoreError>;

    async fn delete_secret(&self, secret: &Secret) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Conflict`] when the name is taken.
    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError>;

    /// Whether [`put_secret`](Self::put_secret) replaces a secret in one
    /// atomic step.
    fn supports_atomic_put(&self) -> bool {
        false
    }

    async fn put_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        Err(StoreError::Backend(format!(
            "atomic put of secret '{}' is not supported by this store",
            secret.name
        )))
    }

    async fn get_account(&self, name: &str, namespace: &str) -> Result<Account, StoreError>;

    /// Clear the stored rotation flag of `kind` and record `expiry`, as one
    /// update of the stored record. The other kind's flag and the `spec`
    /// keep whatever value is stored, even if they changed after the caller
    /// read the account. Returns the status as stored afterwards.
    async fn clear_rotation_flag(
        &self,
        name: &str,
        namespace: &str,
        kind: CredentialKind,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<AccountStatus, StoreError>;
}
