use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ACCOUNT_OPERATOR_IAM_ROLE, BYOC_OPERATOR_IAM_ROLE};

/// A managed AWS account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub namespace: String,
    pub spec: AccountSpec,
    #[serde(default)]
    pub status: AccountStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
    #[serde(rename = "awsAccountID")]
    pub aws_account_id: String,
    #[serde(default, rename = "byoc")]
    pub byoc: bool,
    pub partition: String,
}

/// Rotation flags are independent: each kind rotates on its own cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    #[serde(default)]
    pub rotate_credentials: bool,
    #[serde(default)]
    pub rotate_console_credentials: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_credentials_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Programmatic,
    Console,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 2] = [CredentialKind::Programmatic, CredentialKind::Console];
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Programmatic => f.write_str("programmatic"),
            Self::Console => f.write_str("console"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Current,
    Due,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        aws_account_id: impl Into<String>,
        partition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            spec: AccountSpec {
                aws_account_id: aws_account_id.into(),
                byoc: false,
                partition: partition.into(),
            },
            status: AccountStatus::default(),
        }
    }

    /// Role assumed in this account to mint credentials
    pub fn role_to_assume(&self) -> &'static str {
        if self.spec.byoc {
            BYOC_OPERATOR_IAM_ROLE
        } else {
            ACCOUNT_OPERATOR_IAM_ROLE
        }
    }

    pub fn rotation_state(&self, kind: CredentialKind) -> RotationState {
        let due = match kind {
            CredentialKind::Programmatic => self.status.rotate_credentials,
            CredentialKind::Console => self.status.rotate_console_credentials,
        };
        if due {
            RotationState::Due
        } else {
            RotationState::Current
        }
    }

    pub fn mark_due(&mut self, kind: CredentialKind) {
        match kind {
            CredentialKind::Programmatic => self.status.rotate_credentials = true,
            CredentialKind::Console => self.status.rotate_console_credentials = true,
        }
    }

    /// Clear the flag for `kind` and record when the new artifact expires.
    ///
    /// Only call this once the replacement secret has been stored.
    pub fn mark_rotated(&mut self, kind: CredentialKind, expiry: Option<DateTime<Utc>>) {
        match kind {
            CredentialKind::Programmatic => {
                self.status.rotate_credentials = false;
                self.status.credentials_expiry = expiry;
            }
            CredentialKind::Console => {
                self.status.rotate_console_credentials = false;
                self.status.console_credentials_expiry = expiry;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_to_assume() {
        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        assert_eq!(account.role_to_assume(), "OrganizationAccountAccessRole");

        account.spec.byoc = true;
        assert_eq!(account.role_to_assume(), "BYOCAdminAccess");
    }

    #[test]
    fn test_flags_are_independent() {
        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        assert_eq!(account.rotation_state(CredentialKind::Programmatic), RotationState::Current);
        assert_eq!(account.rotation_state(CredentialKind::Console), RotationState::Current);

        account.mark_due(CredentialKind::Console);
        assert_eq!(account.rotation_state(CredentialKind::Programmatic), RotationState::Current);
        assert_eq!(account.rotation_state(CredentialKind::Console), RotationState::Due);

        account.mark_due(CredentialKind::Programmatic);
        account.mark_rotated(CredentialKind::Programmatic, None);
        assert_eq!(account.rotation_state(CredentialKind::Programmatic), RotationState::Current);
        assert_eq!(account.rotation_state(CredentialKind::Console), RotationState::Due);
    }

    #[test]
    fn test_mark_rotated_records_expiry() {
        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        account.mark_due(CredentialKind::Console);
        let expiry = DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        account.mark_rotated(CredentialKind::Console, Some(expiry));
        assert!(!account.status.rotate_console_credentials);
        assert_eq!(account.status.console_credentials_expiry, Some(expiry));
        assert_eq!(account.status.credentials_expiry, None);
    }

    #[test]
    fn test_account_json_shape() {
        let json = r#"{
            "name": "acct-1",
            "namespace": "aws-account-operator",
            "spec": {"awsAccountID": "123456789012", "byoc": true, "partition": "restricted"},
            "status": {"rotateCredentials": true}
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.spec.aws_account_id, "123456789012");
        assert!(account.spec.byoc);
        assert_eq!(account.spec.partition, "restricted");
        assert!(account.status.rotate_credentials);
        assert!(!account.status.rotate_console_credentials);
    }
}
