//! In-memory [`ObjectStore`] with an operation log and failure injection.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::ObjectStore;
use crate::{
    account::{Account, AccountStatus, CredentialKind},
    error::{ObjectKind, StoreError},
    secret::Secret,
};

/// A store call, recorded in order with the object name it targeted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    GetSecret(String),
    DeleteSecret(String),
    CreateSecret(String),
    PutSecret(String),
    GetAccount(String),
    ClearRotationFlag(String, CredentialKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOpKind {
    GetSecret,
    DeleteSecret,
    CreateSecret,
    PutSecret,
    GetAccount,
    ClearRotationFlag,
}

type Key = (String, String);

#[derive(Debug, Default)]
struct State {
    secrets: HashMap<Key, Secret>,
    accounts: HashMap<Key, Account>,
    ops: Vec<StoreOp>,
    failures: HashMap<StoreOpKind, String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    atomic_put: bool,
}

fn key(name: &str, namespace: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_atomic_put() -> Self {
        Self {
            atomic_put: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_secret(&self, secret: Secret) {
        self.lock()
            .secrets
            .insert(key(&secret.name, &secret.namespace), secret);
    }

    pub fn insert_account(&self, account: Account) {
        self.lock()
            .accounts
            .insert(key(&account.name, &account.namespace), account);
    }

    pub fn secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        self.lock().secrets.get(&key(name, namespace)).cloned()
    }

    pub fn account(&self, name: &str, namespace: &str) -> Option<Account> {
        self.lock().accounts.get(&key(name, namespace)).cloned()
    }

    /// Set the rotation flag of a stored account, as the expiry watcher does.
    pub fn mark_due(&self, name: &str, namespace: &str, kind: CredentialKind) -> bool {
        match self.lock().accounts.get_mut(&key(name, namespace)) {
            Some(account) => {
                account.mark_due(kind);
                true
            }
            None => false,
        }
    }

    pub fn secret_count(&self) -> usize {
        self.lock().secrets.len()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Make every later call of `kind` fail with a backend error.
    pub fn fail_on(&self, kind: StoreOpKind, message: &str) {
        self.lock().failures.insert(kind, message.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    fn record(state: &mut State, kind: StoreOpKind, op: StoreOp) -> Result<(), StoreError> {
        state.ops.push(op);
        match state.failures.get(&kind) {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_secret(&self, name: &str, namespace: &str) -> Result<Secret, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOpKind::GetSecret, StoreOp::GetSecret(name.to_string()))?;
        state
            .secrets
            .get(&key(name, namespace))
            .cloned()
            .ok_or_else(|| StoreError::not_found(ObjectKind::Secret, name, namespace))
    }

    async fn delete_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(
            &mut state,
            StoreOpKind::DeleteSecret,
            StoreOp::DeleteSecret(secret.name.clone()),
        )?;
        state
            .secrets
            .remove(&key(&secret.name, &secret.namespace))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(ObjectKind::Secret, &secret.name, &secret.namespace))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(
            &mut state,
            StoreOpKind::CreateSecret,
            StoreOp::CreateSecret(secret.name.clone()),
        )?;
        let k = key(&secret.name, &secret.namespace);
        if state.secrets.contains_key(&k) {
            return Err(StoreError::conflict(ObjectKind::Secret, &secret.name, &secret.namespace));
        }
        state.secrets.insert(k, secret.clone());
        Ok(())
    }

    fn supports_atomic_put(&self) -> bool {
        self.atomic_put
    }

    async fn put_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOpKind::PutSecret, StoreOp::PutSecret(secret.name.clone()))?;
        state
            .secrets
            .insert(key(&secret.name, &secret.namespace), secret.clone());
        Ok(())
    }

    async fn get_account(&self, name: &str, namespace: &str) -> Result<Account, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreOpKind::GetAccount, StoreOp::GetAccount(name.to_string()))?;
        state
            .accounts
            .get(&key(name, namespace))
            .cloned()
            .ok_or_else(|| StoreError::not_found(ObjectKind::Account, name, namespace))
    }

    async fn clear_rotation_flag(
        &self,
        name: &str,
        namespace: &str,
        kind: CredentialKind,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<AccountStatus, StoreError> {
        let mut state = self.lock();
        Self::record(
            &mut state,
            StoreOpKind::ClearRotationFlag,
            StoreOp::ClearRotationFlag(name.to_string(), kind),
        )?;
        let stored = state
            .accounts
            .get_mut(&key(name, namespace))
            .ok_or_else(|| StoreError::not_found(ObjectKind::Account, name, namespace))?;
        stored.mark_rotated(kind, expiry);
        Ok(stored.status.clone())
    }
}
