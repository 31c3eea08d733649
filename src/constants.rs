use std::{env, path::PathBuf};

use dirs;

/// Default configuration directory name under the user's config directory
pub const CONFIG_DIR_NAME: &str = "sts-rotator";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config";

/// Object store directory name under the configuration directory
pub const STORE_DIR_NAME: &str = "store";

/// Environment variable overriding the configuration file location
pub const CONFIG_FILE_ENV: &str = "STS_ROTATOR_CONFIG_FILE";

/// Namespace holding account records and operator credential secrets
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "aws-account-operator";

/// Suffix of the programmatic credentials secret (`<account><suffix>`)
pub const STS_CREDENTIALS_SUFFIX: &str = "-sre-cli-credentials";

/// Suffix of the console sign-in URL secret (`<account><suffix>`)
pub const STS_CONSOLE_URL_SUFFIX: &str = "-sre-console-url";

/// Lifetime requested for STS credentials, in seconds
pub const STS_CREDENTIALS_DURATION_SECS: u32 = 3600;

/// Age before expiry at which the watcher marks credentials for rotation
pub const STS_CREDENTIALS_THRESHOLD_SECS: u32 = 60;

/// STS accepts durations between 15 minutes and 12 hours
pub const MIN_STS_DURATION_SECS: u32 = 900;
pub const MAX_STS_DURATION_SECS: u32 = 43200;

/// Role assumed in accounts provisioned by the operator
pub const ACCOUNT_OPERATOR_IAM_ROLE: &str = "OrganizationAccountAccessRole";

/// Role assumed in customer-supplied (BYOC) accounts
pub const BYOC_OPERATOR_IAM_ROLE: &str = "BYOCAdminAccess";

/// Session name attached to assumed-role credentials
pub const ROLE_SESSION_NAME: &str = "awsAccountOperator";

/// IAM user whose access keys sign federation requests
pub const IAM_USER_NAME_SRE: &str = "osdManagedAdminSRE";

/// Managed policy granted to console sessions (appended to the ARN prefix)
pub const IAM_POLICY_ADMINISTRATOR: &str = "iam::aws:policy/AdministratorAccess";

/// Get the configuration file path
/// Respects STS_ROTATOR_CONFIG_FILE environment variable if set
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

/// Default object store directory: ~/.config/sts-rotator/store
pub fn default_store_dir() -> PathBuf {
    dirs::home_dir()
        .or_else(|| {
            env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .ok()
                .map(PathBuf::from)
        })
        .unwrap_or_else(env::temp_dir)
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(STORE_DIR_NAME)
}
