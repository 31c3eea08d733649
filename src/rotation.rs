//! Credential rotation for a single account.
//!
//! Each rotation runs to completion or stops at the first failing step.
//! The account's rotation flag is cleared only after the replacement
//! secret has been written, so any failure leaves the flag set and the
//! next scheduler cycle retries the whole workflow. A crash between the
//! secret write and the status update leaves a fresh secret with the
//! flag still set; the retry just publishes a newer one.
//!
//! Clearing a flag touches only the rotated kind on the stored record, so
//! a flag the watcher raises on the other kind mid-rotation survives.
//!
//! The scheduler must not run two rotations of the same (account, kind)
//! at once: secret replacement is delete-then-create on stores without
//! an atomic put.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    account::{Account, CredentialKind, RotationState},
    aws::{AssumeRoleRequest, AwsIdentity, CredentialProvider, Credentials, FederationRequest},
    constants::{
        DEFAULT_OPERATOR_NAMESPACE, IAM_USER_NAME_SRE, ROLE_SESSION_NAME, STS_CONSOLE_URL_SUFFIX,
        STS_CREDENTIALS_DURATION_SECS, STS_CREDENTIALS_SUFFIX, STS_CREDENTIALS_THRESHOLD_SECS,
    },
    error::Result,
    platform::{PlatformConfig, PlatformConfigRegistry},
    secret::{SecretReplacer, console_url_payload, sts_credentials_payload},
    store::ObjectStore,
};

/// Tunables shared by every rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSettings {
    /// Namespace of the operator's own identity secrets
    pub operator_namespace: String,
    pub sts_credentials_suffix: String,
    pub console_url_suffix: String,
    pub duration_secs: u32,
    /// Remaining lifetime at which the watcher flags credentials as due
    pub threshold_secs: u32,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            sts_credentials_suffix: STS_CREDENTIALS_SUFFIX.to_string(),
            console_url_suffix: STS_CONSOLE_URL_SUFFIX.to_string(),
            duration_secs: STS_CREDENTIALS_DURATION_SECS,
            threshold_secs: STS_CREDENTIALS_THRESHOLD_SECS,
        }
    }
}

impl RotationSettings {
    /// How long a rotated artifact is used before the watcher flags it again
    pub fn validity_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.threshold_secs)
    }
}

/// Secret holding the access keys of the account's SRE IAM user
pub fn sre_identity_secret_name(account: &Account) -> String {
    format!("{}-{}-secret", account.name, IAM_USER_NAME_SRE.to_lowercase())
}

/// Outcome of one successful rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub kind: CredentialKind,
    pub secret_name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct CredentialRotationWorkflow<'a, S: ?Sized, P: ?Sized> {
    store: &'a S,
    provider: &'a P,
    platforms: &'a PlatformConfigRegistry,
    settings: &'a RotationSettings,
}

impl<'a, S, P> CredentialRotationWorkflow<'a, S, P>
where
    S: ObjectStore + ?Sized,
    P: CredentialProvider + ?Sized,
{
    pub fn new(
        store: &'a S,
        provider: &'a P,
        platforms: &'a PlatformConfigRegistry,
        settings: &'a RotationSettings,
    ) -> Self {
        Self {
            store,
            provider,
            platforms,
            settings,
        }
    }

    pub fn secret_name(&self, account: &Account, kind: CredentialKind) -> String {
        let suffix = match kind {
            CredentialKind::Programmatic => &self.settings.sts_credentials_suffix,
            CredentialKind::Console => &self.settings.console_url_suffix,
        };
        format!("{}{suffix}", account.name)
    }

    /// Rotate whichever kinds are due, programmatic first.
    pub async fn rotate_due(&self, account: &mut Account) -> Result<Vec<Rotation>> {
        let mut rotated = Vec::new();
        for kind in CredentialKind::ALL {
            if account.rotation_state(kind) == RotationState::Due {
                rotated.push(self.rotate(account, kind).await?);
            }
        }
        Ok(rotated)
    }

    pub async fn rotate(&self, account: &mut Account, kind: CredentialKind) -> Result<Rotation> {
        match kind {
            CredentialKind::Programmatic => self.rotate_credentials(account).await,
            CredentialKind::Console => self.rotate_console_credentials(account).await,
        }
    }

    /// Replace the programmatic STS credentials secret.
    pub async fn rotate_credentials(&self, account: &mut Account) -> Result<Rotation> {
        let secret_name = self.secret_name(account, CredentialKind::Programmatic);
        info!(
            "Rotating credentials for account {} secret {}",
            account.name, secret_name
        );

        let pc = self.platforms.resolve(&account.spec.partition)?;
        let credentials = self.request_credentials(account, pc).await?;

        SecretReplacer::new(self.store)
            .replace(
                &secret_name,
                &account.namespace,
                sts_credentials_payload(&credentials),
            )
            .await
            .inspect_err(|e| {
                error!(
                    "Unable to replace secret {} for account {}: {}",
                    secret_name, account.name, e
                );
            })?;

        let expires_at = credentials.expires_at();
        self.clear_flag(account, CredentialKind::Programmatic, expires_at)
            .await?;

        info!(
            "AWS STS credentials rotated for account {} valid for {}",
            account.name,
            self.settings.validity_secs()
        );
        Ok(Rotation {
            kind: CredentialKind::Programmatic,
            secret_name,
            expires_at,
        })
    }

    /// Replace the console sign-in URL secret.
    pub async fn rotate_console_credentials(&self, account: &mut Account) -> Result<Rotation> {
        let secret_name = self.secret_name(account, CredentialKind::Console);
        info!(
            "Rotating console credentials for account {} secret {}",
            account.name, secret_name
        );

        let pc = self.platforms.resolve(&account.spec.partition)?;
        let credentials = self.request_credentials(account, pc).await?;

        let sre_identity = self.sre_identity(account, pc).await?;
        let request = FederationRequest {
            identity: &sre_identity,
            credentials: &credentials,
            federated_user: format!("{}-sts", account.name),
            policy_arns: vec![pc.administrator_policy_arn()],
            duration_secs: self.settings.duration_secs,
            federation: &pc.federation,
        };

        let login = self
            .provider
            .federation_signin_url(&request)
            .await
            .inspect_err(|e| {
                error!(
                    "Unable to create AWS signin token for account {}: {}",
                    account.name, e
                );
            })?;

        SecretReplacer::new(self.store)
            .replace(
                &secret_name,
                &account.namespace,
                console_url_payload(&login.url),
            )
            .await
            .inspect_err(|e| {
                error!(
                    "Unable to replace secret {} for account {}: {}",
                    secret_name, account.name, e
                );
            })?;

        let expires_at = login.expires_at();
        self.clear_flag(account, CredentialKind::Console, expires_at)
            .await?;

        info!(
            "AWS console URL rotated for account {} valid for {}",
            account.name,
            self.settings.validity_secs()
        );
        Ok(Rotation {
            kind: CredentialKind::Console,
            secret_name,
            expires_at,
        })
    }

    async fn request_credentials(
        &self,
        account: &Account,
        pc: &PlatformConfig,
    ) -> Result<Credentials> {
        let setup_identity = self.setup_identity(pc).await?;
        let request = AssumeRoleRequest {
            identity: &setup_identity,
            role_arn: pc.role_arn(&account.spec.aws_account_id, account.role_to_assume()),
            account_id: &account.spec.aws_account_id,
            session_name: ROLE_SESSION_NAME,
            duration_secs: self.settings.duration_secs,
        };

        self.provider.assume_role(&request).await.map_err(|e| {
            warn!(
                "Failed to get STS credentials for account {} role {}: {}",
                account.name, request.role_arn, e
            );
            e.into()
        })
    }

    async fn setup_identity(&self, pc: &PlatformConfig) -> Result<AwsIdentity> {
        let secret = self
            .store
            .get_secret(pc.setup_secret_name, &self.settings.operator_namespace)
            .await
            .inspect_err(|e| {
                error!(
                    "Unable to read setup credentials secret {}: {}",
                    pc.setup_secret_name, e
                );
            })?;
        AwsIdentity::from_secret(&secret, pc.default_region)
    }

    async fn sre_identity(&self, account: &Account, pc: &PlatformConfig) -> Result<AwsIdentity> {
        let name = sre_identity_secret_name(account);
        let secret = self
            .store
            .get_secret(&name, &self.settings.operator_namespace)
            .await
            .inspect_err(|e| {
                error!(
                    "Unable to read IAM user secret {} for account {}: {}",
                    name, account.name, e
                );
            })?;
        AwsIdentity::from_secret(&secret, pc.default_region)
    }

    /// Clear only `kind`'s flag, in the store and then on `account`.
    async fn clear_flag(
        &self,
        account: &mut Account,
        kind: CredentialKind,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.store
            .clear_rotation_flag(&account.name, &account.namespace, kind, expires_at)
            .await
            .inspect_err(|e| {
                error!(
                    "Error updating {} rotation status of account {}: {}",
                    kind, account.name, e
                );
            })?;

        account.mark_rotated(kind, expires_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aws::ConsoleLogin,
        error::{CredentialRequestError, RotationError},
        secret::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, Secret, SecretData},
        store::memory::MemoryStore,
    };
    use async_trait::async_trait;
    use aws_smithy_types::DateTime as SmithyDateTime;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubProvider {
        role_arns: Mutex<Vec<String>>,
        fail_assume: bool,
    }

    #[async_trait]
    impl CredentialProvider for StubProvider {
        async fn assume_role(
            &self,
            request: &AssumeRoleRequest<'_>,
        ) -> std::result::Result<Credentials, CredentialRequestError> {
            self.role_arns.lock().unwrap().push(request.role_arn.clone());
            if self.fail_assume {
                return Err(CredentialRequestError::new("AssumeRole", "denied").with_code("AccessDenied"));
            }
            Ok(Credentials {
                access_key_id: "ASIA1".to_string(),
                secret_access_key: "secret1".to_string(),
                session_token: "token1".to_string(),
                expiration: SmithyDateTime::from_secs(1_790_000_000),
            })
        }

        async fn federation_signin_url(
            &self,
            request: &FederationRequest<'_>,
        ) -> std::result::Result<ConsoleLogin, CredentialRequestError> {
            Ok(ConsoleLogin {
                url: format!("{}?SigninToken=t", request.federation.endpoint_url),
                expiration: SmithyDateTime::from_secs(1_789_999_000),
            })
        }
    }

    fn setup_store(partition: &PlatformConfig) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_secret(Secret::new(
            partition.setup_secret_name,
            DEFAULT_OPERATOR_NAMESPACE,
            SecretData::from([
                (AWS_ACCESS_KEY_ID.to_string(), b"AKIASETUP".to_vec()),
                (AWS_SECRET_ACCESS_KEY.to_string(), b"setup".to_vec()),
            ]),
        ));
        store
    }

    #[test]
    fn test_secret_names() {
        let store = MemoryStore::new();
        let provider = StubProvider::default();
        let registry = PlatformConfigRegistry::standard();
        let settings = RotationSettings::default();
        let workflow = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings);

        let account = Account::new("acct-1", "ns", "123456789012", "global");
        assert_eq!(
            workflow.secret_name(&account, CredentialKind::Programmatic),
            "acct-1-sre-cli-credentials"
        );
        assert_eq!(
            workflow.secret_name(&account, CredentialKind::Console),
            "acct-1-sre-console-url"
        );
        assert_eq!(
            sre_identity_secret_name(&account),
            "acct-1-osdmanagedadminsre-secret"
        );
    }

    #[test]
    fn test_validity_secs() {
        let settings = RotationSettings::default();
        assert_eq!(settings.validity_secs(), 3540);

        let odd = RotationSettings {
            threshold_secs: 5000,
            ..RotationSettings::default()
        };
        assert_eq!(odd.validity_secs(), 0);
    }

    #[tokio::test]
    async fn test_restricted_account_uses_restricted_arn() {
        let registry = PlatformConfigRegistry::standard();
        let store = setup_store(registry.resolve("restricted").unwrap());
        let provider = StubProvider::default();
        let settings = RotationSettings::default();

        let mut account = Account::new("acct-cn", "ns", "123456789012", "restricted");
        account.mark_due(CredentialKind::Programmatic);
        store.insert_account(account.clone());

        CredentialRotationWorkflow::new(&store, &provider, &registry, &settings)
            .rotate_credentials(&mut account)
            .await
            .unwrap();

        let arns = provider.role_arns.lock().unwrap().clone();
        assert_eq!(
            arns,
            vec!["arn:aws-cn:iam::123456789012:role/OrganizationAccountAccessRole"]
        );
    }

    #[tokio::test]
    async fn test_console_expiry_is_federated_session_expiry() {
        let registry = PlatformConfigRegistry::standard();
        let store = setup_store(registry.resolve("global").unwrap());
        store.insert_secret(Secret::new(
            "acct-1-osdmanagedadminsre-secret",
            DEFAULT_OPERATOR_NAMESPACE,
            SecretData::from([
                (AWS_ACCESS_KEY_ID.to_string(), b"AKIASRE".to_vec()),
                (AWS_SECRET_ACCESS_KEY.to_string(), b"sre".to_vec()),
            ]),
        ));
        let provider = StubProvider::default();
        let settings = RotationSettings::default();

        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        account.mark_due(CredentialKind::Console);
        store.insert_account(account.clone());

        let rotation = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings)
            .rotate_console_credentials(&mut account)
            .await
            .unwrap();

        let expected = DateTime::from_timestamp(1_789_999_000, 0);
        assert_eq!(rotation.expires_at, expected);
        assert_eq!(account.status.console_credentials_expiry, expected);
        assert_eq!(
            store.account("acct-1", "ns").unwrap().status.console_credentials_expiry,
            expected
        );
    }

    #[tokio::test]
    async fn test_unknown_partition_touches_nothing() {
        let registry = PlatformConfigRegistry::standard();
        let store = MemoryStore::new();
        let provider = StubProvider::default();
        let settings = RotationSettings::default();

        let mut account = Account::new("acct-1", "ns", "123456789012", "gov");
        account.mark_due(CredentialKind::Programmatic);

        let err = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings)
            .rotate_credentials(&mut account)
            .await
            .unwrap_err();

        assert!(matches!(err, RotationError::UnknownPartition(_)));
        assert!(account.status.rotate_credentials);
        assert!(store.ops().is_empty());
        assert!(provider.role_arns.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assume_role_failure_leaves_flag() {
        let registry = PlatformConfigRegistry::standard();
        let store = setup_store(registry.resolve("global").unwrap());
        let provider = StubProvider {
            fail_assume: true,
            ..StubProvider::default()
        };
        let settings = RotationSettings::default();

        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        account.mark_due(CredentialKind::Programmatic);
        store.insert_account(account.clone());

        let err = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings)
            .rotate_credentials(&mut account)
            .await
            .unwrap_err();

        match err {
            RotationError::CredentialRequest(e) => assert_eq!(e.code.as_deref(), Some("AccessDenied")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(account.status.rotate_credentials);
        assert!(store.secret("acct-1-sre-cli-credentials", "ns").is_none());
        assert!(store.account("acct-1", "ns").unwrap().status.rotate_credentials);
    }

    #[tokio::test]
    async fn test_missing_setup_secret_is_store_error() {
        let registry = PlatformConfigRegistry::standard();
        let store = MemoryStore::new();
        let provider = StubProvider::default();
        let settings = RotationSettings::default();

        let mut account = Account::new("acct-1", "ns", "123456789012", "global");
        account.mark_due(CredentialKind::Programmatic);

        let err = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings)
            .rotate_credentials(&mut account)
            .await
            .unwrap_err();

        assert!(matches!(err, RotationError::Store(ref e) if e.is_not_found()));
        assert!(provider.role_arns.lock().unwrap().is_empty());
    }
}
