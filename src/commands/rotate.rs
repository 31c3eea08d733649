use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use crate::{
    account::CredentialKind,
    aws::StsCredentialProvider,
    config,
    platform::PlatformConfigRegistry,
    rotation::{CredentialRotationWorkflow, Rotation},
    store::{FileStore, ObjectStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RotateKind {
    /// STS access key, secret key and session token
    Programmatic,
    /// Console sign-in URL
    Console,
    /// Whichever kinds the account has flagged for rotation
    Due,
}

#[derive(Debug, Clone, Args)]
pub struct RotateCommand {
    #[arg(help = "Account name")]
    pub account: String,

    #[arg(
        short = 'n',
        long,
        help = "Account namespace (defaults to the operator namespace)"
    )]
    pub namespace: Option<String>,

    #[arg(short = 'k', long, value_enum, default_value_t = RotateKind::Due, help = "Credentials to rotate")]
    pub kind: RotateKind,
}

impl RotateCommand {
    pub async fn execute(self, profile: &str) -> Result<()> {
        let config = config::load_or_default(profile)
            .await
            .with_context(|| format!("Failed to load configuration for profile '{profile}'"))?;
        let settings = config.rotation_settings();
        let namespace = self
            .namespace
            .unwrap_or_else(|| settings.operator_namespace.clone());

        info!(
            "Using object store at {} for account {}/{}",
            config.store_dir.display(),
            namespace,
            self.account
        );
        let store = FileStore::new(&config.store_dir);
        let mut account = store
            .get_account(&self.account, &namespace)
            .await
            .with_context(|| format!("Failed to load account '{}'", self.account))?;

        let provider = StsCredentialProvider::new().context("Failed to create HTTP client")?;
        let registry = PlatformConfigRegistry::standard();
        let workflow = CredentialRotationWorkflow::new(&store, &provider, &registry, &settings);

        let rotations = match self.kind {
            RotateKind::Programmatic => vec![workflow.rotate(&mut account, CredentialKind::Programmatic).await?],
            RotateKind::Console => vec![workflow.rotate(&mut account, CredentialKind::Console).await?],
            RotateKind::Due => workflow.rotate_due(&mut account).await?,
        };

        if rotations.is_empty() {
            println!("No rotation due for account {}.", account.name);
        }
        for rotation in &rotations {
            println!("{}", describe(rotation));
        }

        Ok(())
    }
}

fn describe(rotation: &Rotation) -> String {
    let expiry = rotation
        .expires_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "Rotated {} credentials into secret {} (expires at {expiry})",
        rotation.kind, rotation.secret_name
    )
}
