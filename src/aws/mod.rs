use std::fmt;

use async_trait::async_trait;
use aws_smithy_types::DateTime;

use crate::{
    error::{CredentialRequestError, Result, RotationError},
    platform::FederationConfig,
    secret::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, Secret},
};

pub mod console;
pub mod sts;

pub use sts::StsCredentialProvider;

/// AWS temporary credentials structure
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}

impl Credentials {
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.expiration.secs(), self.expiration.subsec_nanos())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Console sign-in URL and the expiry of the federated session behind it
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLogin {
    pub url: String,
    pub expiration: DateTime,
}

impl ConsoleLogin {
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.expiration.secs(), self.expiration.subsec_nanos())
    }
}

/// Long-lived IAM access keys used to sign STS calls
#[derive(Clone, PartialEq, Eq)]
pub struct AwsIdentity {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl AwsIdentity {
    /// Read access keys from a secret holding `aws_access_key_id` and
    /// `aws_secret_access_key`.
    pub fn from_secret(secret: &Secret, region: &str) -> Result<Self> {
        let field = |name: &str| {
            secret
                .get_str(name)
                .map(str::to_string)
                .ok_or_else(|| RotationError::MissingSecretField {
                    secret: secret.name.clone(),
                    field: name.to_string(),
                })
        };

        Ok(Self {
            access_key_id: field(AWS_ACCESS_KEY_ID)?,
            secret_access_key: field(AWS_SECRET_ACCESS_KEY)?,
            region: region.to_string(),
        })
    }
}

impl fmt::Debug for AwsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsIdentity")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AssumeRoleRequest<'a> {
    pub identity: &'a AwsIdentity,
    pub role_arn: String,
    pub account_id: &'a str,
    pub session_name: &'a str,
    pub duration_secs: u32,
}

#[derive(Debug, Clone)]
pub struct FederationRequest<'a> {
    /// Principal allowed to call GetFederationToken
    pub identity: &'a AwsIdentity,
    /// Credentials of the assumed role the console session stands in for
    pub credentials: &'a Credentials,
    pub federated_user: String,
    pub policy_arns: Vec<String>,
    pub duration_secs: u32,
    pub federation: &'a FederationConfig,
}

/// Issues temporary credentials and console sign-in URLs
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest<'_>,
    ) -> std::result::Result<Credentials, CredentialRequestError>;

    async fn federation_signin_url(
        &self,
        request: &FederationRequest<'_>,
    ) -> std::result::Result<ConsoleLogin, CredentialRequestError>;
}
