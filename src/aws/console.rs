use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use super::Credentials;
use crate::{error::CredentialRequestError, platform::FederationConfig};

/// Issuer reported to the federation endpoint on login
const SIGNIN_ISSUER: &str = "sts-rotator";

// AWS Federation API types (internal use only)
// These types match the exact JSON format expected by AWS federation endpoint

/// Session credentials format for AWS federation getSigninToken API
#[derive(Debug, Serialize)]
struct SessionCredentials<'a> {
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    #[serde(rename = "sessionKey")]
    session_key: &'a str,
    #[serde(rename = "sessionToken")]
    session_token: &'a str,
}

/// Response from AWS federation getSigninToken API
#[derive(Debug, Deserialize)]
struct SigninTokenResponse {
    #[serde(rename = "SigninToken")]
    signin_token: String,
}

/// Exchange federated credentials for a console login URL.
pub async fn generate_console_url(
    client: &Client,
    creds: &Credentials,
    federation: &FederationConfig,
) -> Result<String, CredentialRequestError> {
    let signin_token = get_signin_token(client, creds, federation.endpoint_url).await?;
    let url = build_login_url(federation, &signin_token)?;

    info!("Generated AWS console sign-in URL via {}", federation.endpoint_url);
    Ok(url)
}

fn signin_token_url(creds: &Credentials, endpoint_url: &str) -> Result<Url, CredentialRequestError> {
    let session_creds = SessionCredentials {
        session_id: &creds.access_key_id,
        session_key: &creds.secret_access_key,
        session_token: &creds.session_token,
    };

    let session_json = serde_json::to_string(&session_creds)
        .map_err(|e| CredentialRequestError::new("GetSigninToken", e.to_string()))?;

    let mut url = parse_endpoint(endpoint_url)?;
    url.query_pairs_mut()
        .append_pair("Action", "getSigninToken")
        .append_pair("Session", &session_json);
    Ok(url)
}

/// Get signin token from AWS federation endpoint
async fn get_signin_token(
    client: &Client,
    creds: &Credentials,
    endpoint_url: &str,
) -> Result<String, CredentialRequestError> {
    let url = signin_token_url(creds, endpoint_url)?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| CredentialRequestError::new("GetSigninToken", e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(
            CredentialRequestError::new("GetSigninToken", format!("federation endpoint returned {status}"))
                .with_code(status.as_u16().to_string()),
        );
    }

    let token_response: SigninTokenResponse = response.json().await.map_err(|e| {
        CredentialRequestError::new(
            "GetSigninToken",
            format!("Failed to parse signin token response: {e}"),
        )
    })?;

    Ok(token_response.signin_token)
}

fn build_login_url(
    federation: &FederationConfig,
    signin_token: &str,
) -> Result<String, CredentialRequestError> {
    let mut url = parse_endpoint(federation.endpoint_url)?;
    url.query_pairs_mut()
        .append_pair("Action", "login")
        .append_pair("Issuer", SIGNIN_ISSUER)
        .append_pair("Destination", federation.console_url)
        .append_pair("SigninToken", signin_token);

    Ok(url.to_string())
}

fn parse_endpoint(endpoint_url: &str) -> Result<Url, CredentialRequestError> {
    Url::parse(endpoint_url).map_err(|e| {
        CredentialRequestError::new(
            "GetSigninToken",
            format!("Invalid federation endpoint '{endpoint_url}': {e}"),
        )
    })
}
