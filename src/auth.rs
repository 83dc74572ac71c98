//! The interactive `auth` command: three-legged OAuth against Flickr, saving the access token
//! into the config file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use console::style;
use dialoguer::{Input, Select};
use tracing::{info, warn};

use crate::flickr::oauth::{self, Permission};
use crate::flickr::FlickrClient;
use crate::load_config::{read_config_file, save_config, FlickrConfig};

fn prompt_text(prompt: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .interact_text()
        .with_context(|| format!("Failed to read {prompt}"))?;
    Ok(value.trim().to_string())
}

/// Read the existing config, or ask for consumer credentials and create it.
fn config_for_auth(config_path: &Path) -> Result<FlickrConfig> {
    if config_path.exists() {
        // A file that fails to parse is left untouched.
        let mut config = read_config_file(config_path)?;
        if config.consumer_key.is_empty() || config.consumer_secret.is_empty() {
            println!("Config {config_path:?} has no consumer credentials.");
            config.consumer_key = prompt_text("Consumer key")?;
            config.consumer_secret = prompt_text("Consumer secret")?;
            save_config(config_path, &config)?;
        }
        return Ok(config);
    }

    println!(
        "Creating {config_path:?}. Get an API key at {}",
        style("https://www.flickr.com/services/apps/create/").cyan()
    );
    let config = FlickrConfig {
        consumer_key: prompt_text("Consumer key")?,
        consumer_secret: prompt_text("Consumer secret")?,
        ..Default::default()
    };
    save_config(config_path, &config)?;
    Ok(config)
}

pub async fn authorize(config_path: &Path, force: bool) -> Result<()> {
    if !console::user_attended() {
        bail!("auth needs an interactive terminal");
    }
    let mut config = config_for_auth(config_path)?;

    let app = FlickrClient::new(config.consumer(), None)?;
    app.test_echo()
        .await
        .context("Flickr rejected the consumer key; check consumer_key and consumer_secret")?;

    if let (Some(token), false) = (config.token(), force) {
        let client = FlickrClient::new(config.consumer(), Some(token))?;
        match client.test_login().await {
            Ok((id, username)) => {
                println!(
                    "{} Already logged in as {username} (ID: {id}). Use --force to re-authorize.",
                    style("[OK]").green().bold()
                );
                return Ok(());
            }
            Err(e) => warn!(error = %e, "Stored access token no longer works, re-authorizing"),
        }
    }

    let labels: Vec<String> = Permission::ALL
        .iter()
        .map(|p| format!("{:<6} {}", p.as_str(), p.description()))
        .collect();
    let choice = Select::new()
        .with_prompt("Permission to request")
        .items(&labels)
        .default(1)
        .interact()
        .context("Failed to read permission choice")?;
    let permission = Permission::ALL[choice];

    let request_token = oauth::request_token(app.http(), &config.consumer()).await?;
    println!("Open this URL in your browser and authorize the application:");
    println!("  {}", style(oauth::authorize_url(&request_token, permission)).cyan());

    let verifier = oauth::clean_verifier(&prompt_text("Verifier code")?);
    if verifier.is_empty() {
        bail!("verifier code must contain digits");
    }
    let grant =
        oauth::access_token(app.http(), &config.consumer(), &request_token, &verifier).await?;

    config.access_key = Some(grant.token.token.clone());
    config.access_secret = Some(grant.token.secret.clone());
    save_config(config_path, &config)?;
    info!(config_path = ?config_path, user_nsid = ?grant.user_nsid, "Stored access token");

    let client = FlickrClient::new(config.consumer(), Some(grant.token))?;
    let (id, username) = client
        .test_login()
        .await
        .context("Authorization succeeded but flickr.test.login failed")?;
    println!(
        "{} Logged in as {username} (ID: {id})",
        style("[OK]").green().bold()
    );
    Ok(())
}
