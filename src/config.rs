use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const DEFAULT_IDENTITY_URL: &str = "https://auth.emergentagent.com/";
pub const DEFAULT_CALLBACK_URL: &str = "http://127.0.0.1:8765/auth";
pub const BASE_URL_ENV: &str = "STARTUPMAIL_BACKEND_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// `session.json` next to the config file
    #[default]
    File,
    /// OS keyring
    Keyring,
    /// nothing survives the process
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub identity_url: Option<String>,
    pub callback_url: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    #[serde(default)]
    pub desktop_notifications: bool,
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("startupmail"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            api_base_url: Some(DEFAULT_BASE_URL.to_string()),
            identity_url: Some(DEFAULT_IDENTITY_URL.to_string()),
            callback_url: Some(DEFAULT_CALLBACK_URL.to_string()),
            credential_backend: CredentialBackend::File,
            desktop_notifications: false,
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

/// Backend URL: environment override, then config, then the local default.
pub fn resolve_base_url(cfg: &Config) -> Result<Url> {
    base_url_from(cfg, std::env::var(BASE_URL_ENV).ok())
}

fn base_url_from(cfg: &Config, env_override: Option<String>) -> Result<Url> {
    let raw = env_override
        .filter(|s| !s.trim().is_empty())
        .or_else(|| cfg.api_base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    Url::parse(&raw).map_err(|e| anyhow!("Invalid api_base_url '{raw}': {e}"))
}

pub fn resolve_identity_url(cfg: &Config) -> Result<Url> {
    let raw = cfg.identity_url.as_deref().unwrap_or(DEFAULT_IDENTITY_URL);
    Url::parse(raw).map_err(|e| anyhow!("Invalid identity_url '{raw}': {e}"))
}

pub fn resolve_callback_url(cfg: &Config) -> Result<Url> {
    let raw = cfg.callback_url.as_deref().unwrap_or(DEFAULT_CALLBACK_URL);
    Url::parse(raw).map_err(|e| anyhow!("Invalid callback_url '{raw}': {e}"))
}
