/// `load_config` module: loads the YAML credentials file and overlays `FLICKR_*` environment variables.
///
/// This module is the only place where the config file is parsed or written.
///
/// # Responsibilities
/// - Parse the user's `config.yml` into [`FlickrConfig`]
/// - Let `FLICKR_CONSUMER_KEY`, `FLICKR_CONSUMER_SECRET`, `FLICKR_ACCESS_KEY` and
///   `FLICKR_ACCESS_SECRET` override the file values
/// - Refuse to continue when the consumer credentials are missing, before any network activity
/// - Save the file back with owner-only permissions after `auth`
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::flickr::oauth::{ConsumerCredentials, TokenCredentials};

pub const ENV_CONSUMER_KEY: &str = "FLICKR_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "FLICKR_CONSUMER_SECRET";
pub const ENV_ACCESS_KEY: &str = "FLICKR_ACCESS_KEY";
pub const ENV_ACCESS_SECRET: &str = "FLICKR_ACCESS_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlickrConfig {
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,
}

impl FlickrConfig {
    pub fn consumer(&self) -> ConsumerCredentials {
        ConsumerCredentials {
            key: self.consumer_key.clone(),
            secret: self.consumer_secret.clone(),
        }
    }

    /// The stored access token, if both halves are present.
    pub fn token(&self) -> Option<TokenCredentials> {
        match (&self.access_key, &self.access_secret) {
            (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
                Some(TokenCredentials {
                    token: token.clone(),
                    secret: secret.clone(),
                })
            }
            _ => None,
        }
    }

    /// Like [`FlickrConfig::token`], but an error telling the user to run `auth`.
    pub fn access_token(&self) -> Result<TokenCredentials> {
        self.token().ok_or_else(|| {
            anyhow!("no access token in config; run `flickr-cli auth` to authorize this application")
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value(ENV_CONSUMER_KEY) {
            self.consumer_key = v;
        }
        if let Some(v) = env_value(ENV_CONSUMER_SECRET) {
            self.consumer_secret = v;
        }
        if let Some(v) = env_value(ENV_ACCESS_KEY) {
            self.access_key = Some(v);
        }
        if let Some(v) = env_value(ENV_ACCESS_SECRET) {
            self.access_secret = Some(v);
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.consumer_key.trim().is_empty() {
            error!(config_path = ?path, "consumer_key missing from config");
            bail!("consumer_key is missing from config {path:?} (or set {ENV_CONSUMER_KEY})");
        }
        if self.consumer_secret.trim().is_empty() {
            error!(config_path = ?path, "consumer_secret missing from config");
            bail!("consumer_secret is missing from config {path:?} (or set {ENV_CONSUMER_SECRET})");
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse the YAML file as-is: no environment overrides, no validation.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> Result<FlickrConfig> {
    let path_ref = path.as_ref();
    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    // An empty file deserializes to null.
    if config_content.trim().is_empty() {
        warn!(config_path = ?path_ref, "Config file is empty");
        return Ok(FlickrConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML {:?}: {e}", path_ref))
        }
    }
}

/// Load the config file, apply environment overrides and require consumer credentials.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FlickrConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let mut config = read_config_file(path_ref)?;
    config.apply_env_overrides();
    config.validate(path_ref)?;

    info!(
        config_path = ?path_ref,
        has_access_token = config.token().is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Write the config as YAML, readable by the owner only.
pub fn save_config<P: AsRef<Path>>(path: P, config: &FlickrConfig) -> Result<()> {
    let path_ref = path.as_ref();
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path_ref)
        .with_context(|| format!("Failed to open config file {path_ref:?} for writing"))?;
    std::io::Write::write_all(&mut file, yaml.as_bytes())
        .with_context(|| format!("Failed to write config file {path_ref:?}"))?;

    // `mode` only applies on creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path_ref, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions of {path_ref:?}"))?;
    }

    info!(config_path = ?path_ref, "Saved configuration");
    Ok(())
}
