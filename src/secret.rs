use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error, info};

use crate::{
    aws::Credentials,
    error::StoreError,
    store::ObjectStore,
};

/// Field names read by downstream consumers of the credentials secrets.
pub const AWS_CREDS_SECRET_ID_KEY: &str = "awsCredsSecretIDKey";
pub const AWS_CREDS_SECRET_ACCESS_KEY: &str = "awsCredsSecretAccessKey";
pub const AWS_CREDS_SESSION_TOKEN: &str = "awsCredsSessionToken";
pub const AWS_CONSOLE_LOGIN_URL: &str = "aws_console_login_url";

/// Field names of IAM user access-key secrets
pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

pub type SecretData = BTreeMap<String, Vec<u8>>;

/// A named, namespaced key-value blob. Values are base64 encoded at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub namespace: String,
    #[serde(serialize_with = "encode_data", deserialize_with = "decode_data")]
    pub data: SecretData,
}

impl Secret {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, data: SecretData) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            data,
        }
    }

    pub fn get(&self, field: &str) -> Option<&[u8]> {
        self.data.get(field).map(Vec::as_slice)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| std::str::from_utf8(v).ok())
    }
}

fn encode_data<S: Serializer>(data: &SecretData, serializer: S) -> Result<S::Ok, S::Error> {
    let encoded: BTreeMap<&str, String> = data
        .iter()
        .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
        .collect();
    encoded.serialize(serializer)
}

fn decode_data<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretData, D::Error> {
    let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
    encoded
        .into_iter()
        .map(|(k, v)| {
            STANDARD
                .decode(v)
                .map(|bytes| (k, bytes))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Payload of the programmatic credentials secret
pub fn sts_credentials_payload(creds: &Credentials) -> SecretData {
    SecretData::from([
        (
            AWS_CREDS_SECRET_ID_KEY.to_string(),
            creds.access_key_id.clone().into_bytes(),
        ),
        (
            AWS_CREDS_SECRET_ACCESS_KEY.to_string(),
            creds.secret_access_key.clone().into_bytes(),
        ),
        (
            AWS_CREDS_SESSION_TOKEN.to_string(),
            creds.session_token.clone().into_bytes(),
        ),
    ])
}

/// Payload of the console sign-in URL secret
pub fn console_url_payload(url: &str) -> SecretData {
    SecretData::from([(AWS_CONSOLE_LOGIN_URL.to_string(), url.as_bytes().to_vec())])
}

/// Replace-or-create over an [`ObjectStore`].
///
/// Stores with an atomic put get a single write. Otherwise the existing
/// secret is deleted and a fresh one created, so the field set may change
/// shape between rotations. That sequence is not atomic: callers must not
/// run two replacements of the same secret concurrently.
pub struct SecretReplacer<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> SecretReplacer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn replace(
        &self,
        name: &str,
        namespace: &str,
        payload: SecretData,
    ) -> Result<(), StoreError> {
        let secret = Secret::new(name, namespace, payload);

        if self.store.supports_atomic_put() {
            debug!("Writing secret {}/{} with atomic put", namespace, name);
            return self.store.put_secret(&secret).await.inspect_err(|e| {
                error!("Unable to write secret {}/{}: {}", namespace, name, e);
            });
        }

        match self.store.get_secret(name, namespace).await {
            Ok(existing) => {
                self.store.delete_secret(&existing).await.inspect_err(|e| {
                    error!("Error deleting secret {}/{}: {}", namespace, name, e);
                })?;
                debug!("Deleted previous secret {}/{}", namespace, name);
            }
            Err(e) if e.is_not_found() => {
                debug!("Secret {}/{} does not exist yet, creating", namespace, name);
            }
            Err(e) => {
                error!("Error retrieving secret {}/{}: {}", namespace, name, e);
                return Err(e);
            }
        }

        self.store.create_secret(&secret).await.inspect_err(|e| {
            error!("Unable to create secret {}/{}: {}", namespace, name, e);
        })?;

        info!("Secret {}/{} replaced", namespace, name);
        Ok(())
    }
}
