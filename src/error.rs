use std::fmt;

/// Errors surfaced by a single rotation attempt.
///
/// Nothing here is retried internally. The account's rotation flag stays
/// set on every variant, so the caller's next cycle re-runs the whole
/// workflow.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error(transparent)]
    CredentialRequest(#[from] CredentialRequestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize policy document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown partition '{0}' (expected 'global' or 'restricted')")]
    UnknownPartition(String),

    #[error("Secret '{secret}' is missing field '{field}'")]
    MissingSecretField { secret: String, field: String },
}

/// The provider rejected an assume-role or federation request.
///
/// `code` is the vendor error code when the adapter could extract one
/// (e.g. `AccessDenied`, `RegionDisabledException`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {}", detail(.code, .message))]
pub struct CredentialRequestError {
    pub operation: &'static str,
    pub code: Option<String>,
    pub message: String,
}

impl CredentialRequestError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

fn detail(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("AWS Error Code: {code}, AWS Error Message: {message}"),
        None => message.to_string(),
    }
}

/// Kind of object held by an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Secret,
    Account,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret => f.write_str("secret"),
            Self::Account => f.write_str("account"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{namespace}/{name}' not found")]
    NotFound {
        kind: ObjectKind,
        name: String,
        namespace: String,
    },

    #[error("{kind} '{namespace}/{name}' already exists")]
    Conflict {
        kind: ObjectKind,
        name: String,
        namespace: String,
    },

    #[error("Object store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: ObjectKind, name: &str, namespace: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn conflict(kind: ObjectKind, name: &str, namespace: &str) -> Self {
        Self::Conflict {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = RotationError> = std::result::Result<T, E>;
