use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

use crate::policy::{FederatedRole, Statement, build_policy};

/// Either a full role definition or a bare list of statements
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolicyInput {
    Role(FederatedRole),
    Statements(Vec<Statement>),
}

#[derive(Debug, Clone, Args)]
pub struct PolicyCommand {
    #[arg(help = "JSON file with a federated role definition or a statement list")]
    pub file: PathBuf,
}

impl PolicyCommand {
    pub async fn execute(self) -> Result<()> {
        let content = fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        println!("{}", render(&content)?);
        Ok(())
    }
}

fn render(content: &str) -> Result<String> {
    let input: PolicyInput =
        serde_json::from_str(content).context("Failed to parse policy definition")?;
    let document = match input {
        PolicyInput::Role(role) => role.policy_document()?,
        PolicyInput::Statements(statements) => build_policy(&statements)?,
    };
    Ok(document)
}
