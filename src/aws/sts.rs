use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::{
    Client as StsClient,
    config::{Config as StsConfig, Credentials as StaticCredentials},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::PolicyDescriptorType,
};
use aws_smithy_types::DateTime;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info};

use super::{
    AssumeRoleRequest, ConsoleLogin, CredentialProvider, Credentials, FederationRequest, console,
};
use crate::{constants::MIN_STS_DURATION_SECS, error::CredentialRequestError};

/// GetFederationToken rejects names longer than this
const MAX_FEDERATED_USER_NAME_LEN: usize = 32;

/// [`CredentialProvider`] backed by AWS STS and the sign-in federation endpoint
#[derive(Debug, Clone)]
pub struct StsCredentialProvider {
    http: Client,
}

impl StsCredentialProvider {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self { http })
    }

    fn client(identity: &super::AwsIdentity) -> StsClient {
        let credentials = StaticCredentials::new(
            identity.access_key_id.clone(),
            identity.secret_access_key.clone(),
            None,
            None,
            "sts-rotator",
        );

        let config = StsConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(identity.region.clone()))
            .credentials_provider(credentials)
            .build();

        StsClient::from_conf(config)
    }
}

#[async_trait]
impl CredentialProvider for StsCredentialProvider {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest<'_>,
    ) -> Result<Credentials, CredentialRequestError> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Account ID: {}", request.account_id);
        debug!("Duration: {} seconds", request.duration_secs);

        let response = Self::client(request.identity)
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(request.session_name)
            .duration_seconds(request.duration_secs as i32)
            .send()
            .await
            .map_err(|e| request_error("AssumeRole", e))?;

        let sts_creds = response
            .credentials()
            .ok_or_else(|| CredentialRequestError::new("AssumeRole", "AWS STS returned no credentials"))?;

        info!("Successfully obtained AWS credentials for {}", request.role_arn);
        Ok(Credentials {
            access_key_id: sts_creds.access_key_id().to_string(),
            secret_access_key: sts_creds.secret_access_key().to_string(),
            session_token: sts_creds.session_token().to_string(),
            expiration: *sts_creds.expiration(),
        })
    }

    async fn federation_signin_url(
        &self,
        request: &FederationRequest<'_>,
    ) -> Result<ConsoleLogin, CredentialRequestError> {
        let duration = federation_duration(
            request.duration_secs,
            &request.credentials.expiration,
            Utc::now().timestamp(),
        );
        let name = federated_user_name(&request.federated_user);

        info!("Calling AWS STS GetFederationToken for {}", name);
        debug!(
            "Source session: {}, policies: {:?}, duration: {} seconds",
            request.credentials.access_key_id, request.policy_arns, duration
        );

        let mut call = Self::client(request.identity)
            .get_federation_token()
            .name(name)
            .duration_seconds(duration as i32);
        for arn in &request.policy_arns {
            call = call.policy_arns(PolicyDescriptorType::builder().arn(arn).build());
        }

        let response = call
            .send()
            .await
            .map_err(|e| request_error("GetFederationToken", e))?;

        let fed_creds = response.credentials().ok_or_else(|| {
            CredentialRequestError::new("GetFederationToken", "AWS STS returned no credentials")
        })?;

        let federated = Credentials {
            access_key_id: fed_creds.access_key_id().to_string(),
            secret_access_key: fed_creds.secret_access_key().to_string(),
            session_token: fed_creds.session_token().to_string(),
            expiration: *fed_creds.expiration(),
        };

        let url = console::generate_console_url(&self.http, &federated, request.federation).await?;
        Ok(ConsoleLogin {
            url,
            expiration: federated.expiration,
        })
    }
}

fn request_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> CredentialRequestError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    match err.code() {
        Some(code) => CredentialRequestError::new(operation, message).with_code(code),
        None => CredentialRequestError::new(operation, message),
    }
}

/// The console session may not outlive the assumed-role credentials,
/// but STS refuses anything below its minimum.
fn federation_duration(requested: u32, source_expiry: &DateTime, now: i64) -> u32 {
    let remaining = (source_expiry.secs() - now).clamp(0, i64::from(u32::MAX)) as u32;
    requested.min(remaining).max(MIN_STS_DURATION_SECS)
}

fn federated_user_name(name: &str) -> &str {
    match name.char_indices().nth(MAX_FEDERATED_USER_NAME_LEN) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}
