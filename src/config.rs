use crate::{
    constants::{
        self, DEFAULT_OPERATOR_NAMESPACE, MAX_STS_DURATION_SECS, MIN_STS_DURATION_SECS,
        STS_CONSOLE_URL_SUFFIX, STS_CREDENTIALS_DURATION_SECS, STS_CREDENTIALS_SUFFIX,
        STS_CREDENTIALS_THRESHOLD_SECS,
    },
    rotation::RotationSettings,
};
use anyhow::{Context, Result, bail};
use dialoguer::{Input, theme::ColorfulTheme};
use ini::{Ini, Properties};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub operator_namespace: String,
    pub store_dir: PathBuf,
    pub sts_credentials_suffix: String,
    pub console_url_suffix: String,
    pub credentials_duration_secs: u32,
    pub credentials_threshold_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            store_dir: constants::default_store_dir(),
            sts_credentials_suffix: STS_CREDENTIALS_SUFFIX.to_string(),
            console_url_suffix: STS_CONSOLE_URL_SUFFIX.to_string(),
            credentials_duration_secs: STS_CREDENTIALS_DURATION_SECS,
            credentials_threshold_secs: STS_CREDENTIALS_THRESHOLD_SECS,
        }
    }
}

impl Config {
    fn from_ini_section(section: &Properties) -> Self {
        let defaults = Self::default();
        Self {
            operator_namespace: section
                .get("operator_namespace")
                .map_or(defaults.operator_namespace, str::to_string),
            store_dir: section
                .get("store_dir")
                .map_or(defaults.store_dir, PathBuf::from),
            sts_credentials_suffix: section
                .get("sts_credentials_suffix")
                .map_or(defaults.sts_credentials_suffix, str::to_string),
            console_url_suffix: section
                .get("console_url_suffix")
                .map_or(defaults.console_url_suffix, str::to_string),
            credentials_duration_secs: section
                .get("credentials_duration_secs")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.credentials_duration_secs),
            credentials_threshold_secs: section
                .get("credentials_threshold_secs")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.credentials_threshold_secs),
        }
    }

    fn save_to_ini(&self, ini: &mut Ini, profile: &str) {
        ini.with_section(Some(section_name(profile)))
            .set("operator_namespace", &self.operator_namespace)
            .set("store_dir", self.store_dir.to_string_lossy())
            .set("sts_credentials_suffix", &self.sts_credentials_suffix)
            .set("console_url_suffix", &self.console_url_suffix)
            .set(
                "credentials_duration_secs",
                self.credentials_duration_secs.to_string(),
            )
            .set(
                "credentials_threshold_secs",
                self.credentials_threshold_secs.to_string(),
            );
    }

    pub fn validate(&self) -> Result<()> {
        validate_duration(self.credentials_duration_secs).map_err(anyhow::Error::msg)?;
        validate_threshold(self.credentials_threshold_secs, self.credentials_duration_secs)
            .map_err(anyhow::Error::msg)?;
        if self.sts_credentials_suffix == self.console_url_suffix {
            bail!("Credentials and console URL secrets must use different suffixes");
        }
        Ok(())
    }

    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            operator_namespace: self.operator_namespace.clone(),
            sts_credentials_suffix: self.sts_credentials_suffix.clone(),
            console_url_suffix: self.console_url_suffix.clone(),
            duration_secs: self.credentials_duration_secs,
            threshold_secs: self.credentials_threshold_secs,
        }
    }
}

fn section_name(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

fn validate_duration(duration: u32) -> Result<(), &'static str> {
    if (MIN_STS_DURATION_SECS..=MAX_STS_DURATION_SECS).contains(&duration) {
        Ok(())
    } else {
        Err("Duration must be between 900 and 43200 seconds")
    }
}

fn validate_threshold(threshold: u32, duration: u32) -> Result<(), &'static str> {
    if threshold < duration {
        Ok(())
    } else {
        Err("Threshold must be shorter than the credentials duration")
    }
}

pub async fn load(profile: &str) -> Result<Config> {
    let path = get_config_path()?;
    let ini = Ini::load_from_file(&path)
        .context("Failed to load config file. Please run `sts-rotator configure` first")?;

    let section = ini
        .section(Some(section_name(profile)))
        .with_context(|| format!("Profile '{profile}' not found in config"))?;

    let config = Config::from_ini_section(section);
    config.validate()?;
    Ok(config)
}

/// Load the profile, or fall back to built-in defaults when no config file exists.
pub async fn load_or_default(profile: &str) -> Result<Config> {
    let path = get_config_path()?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load(profile).await
}

pub async fn save(profile: &str, config: &Config) -> Result<()> {
    let path = get_config_path()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut ini = if path.exists() {
        Ini::load_from_file(&path).unwrap_or_else(|_| Ini::new())
    } else {
        Ini::new()
    };

    config.save_to_ini(&mut ini, profile);

    ini.write_to_file(&path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub async fn configure_interactive(profile: &str) -> Result<()> {
    println!("Configuring sts-rotator for profile: {profile}");

    let existing_config = load(profile).await.ok();

    if existing_config.is_some() {
        println!("Press Enter to keep current values, or type new values.");
    }
    println!();

    let theme = ColorfulTheme::default();
    let default_config = existing_config.unwrap_or_default();

    let operator_namespace = Input::<String>::with_theme(&theme)
        .with_prompt("Operator namespace")
        .default(default_config.operator_namespace)
        .interact_text()
        .context("Failed to read operator namespace")?;

    let store_dir = Input::<String>::with_theme(&theme)
        .with_prompt("Object store directory")
        .default(default_config.store_dir.to_string_lossy().to_string())
        .interact_text()
        .context("Failed to read object store directory")?;

    let sts_credentials_suffix = Input::<String>::with_theme(&theme)
        .with_prompt("Credentials secret suffix")
        .default(default_config.sts_credentials_suffix)
        .interact_text()
        .context("Failed to read credentials secret suffix")?;

    let console_url_suffix = Input::<String>::with_theme(&theme)
        .with_prompt("Console URL secret suffix")
        .default(default_config.console_url_suffix)
        .interact_text()
        .context("Failed to read console URL secret suffix")?;

    let credentials_duration_secs = Input::<u32>::with_theme(&theme)
        .with_prompt("Credentials duration in seconds (900-43200)")
        .default(default_config.credentials_duration_secs)
        .validate_with(|input: &u32| validate_duration(*input))
        .interact_text()
        .context("Failed to read credentials duration")?;

    let credentials_threshold_secs = Input::<u32>::with_theme(&theme)
        .with_prompt("Rotation threshold in seconds")
        .default(default_config.credentials_threshold_secs)
        .validate_with(|input: &u32| validate_threshold(*input, credentials_duration_secs))
        .interact_text()
        .context("Failed to read rotation threshold")?;

    let config = Config {
        operator_namespace,
        store_dir: PathBuf::from(store_dir),
        sts_credentials_suffix,
        console_url_suffix,
        credentials_duration_secs,
        credentials_threshold_secs,
    };
    config.validate()?;

    save(profile, &config).await?;

    println!("\nConfiguration saved successfully.");
    Ok(())
}

fn get_config_path() -> Result<PathBuf> {
    constants::get_config_path().context("Failed to determine config path")
}
