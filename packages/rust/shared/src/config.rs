//! Application configuration for docbot.
//!
//! User config lives at `~/.docbot/docbot.toml`.
//! Secrets are never stored in the file: it only names the environment
//! variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocbotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docbot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docbot";

/// API version prefix shared by every endpoint.
const API_VERSION_PREFIX: &str = "1";

// ---------------------------------------------------------------------------
// Config structs (matching docbot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote API endpoint selection.
    #[serde(default)]
    pub api: ApiSection,

    /// Credential sources.
    #[serde(default)]
    pub auth: AuthSection,
}

/// Which deployment of the remote API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiEnvironment {
    #[default]
    Production,
    Development,
}

/// `[api]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSection {
    /// Environment preset for scheme/host/port.
    #[serde(default)]
    pub environment: ApiEnvironment,

    /// Scheme override (`http` or `https`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    /// Host override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// Name of the env var holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// OAuth client id (public, safe to store).
    #[serde(default)]
    pub client_id: String,

    /// Name of the env var holding the OAuth client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            client_id: String::new(),
            client_secret_env: default_client_secret_env(),
        }
    }
}

fn default_token_env() -> String {
    "DOCBOT_ACCESS_TOKEN".into()
}
fn default_client_secret_env() -> String {
    "DOCBOT_CLIENT_SECRET".into()
}

// ---------------------------------------------------------------------------
// API endpoint config (runtime, injected into the client)
// ---------------------------------------------------------------------------

/// Scheme, host and port of the remote API.
///
/// Every request goes to `<scheme>://<host>:<port>/1/<path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ApiConfig {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// The public production deployment.
    pub fn production() -> Self {
        Self::new("https", "platform.quip.com", 443)
    }

    /// The local development deployment.
    pub fn development() -> Self {
        Self::new("http", "platform.docker.qa", 10000)
    }

    pub fn for_environment(env: ApiEnvironment) -> Self {
        match env {
            ApiEnvironment::Production => Self::production(),
            ApiEnvironment::Development => Self::development(),
        }
    }

    /// Build from an absolute URL, e.g. a mock server's `uri()`.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| DocbotError::validation(format!("invalid API URL '{url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| DocbotError::validation(format!("API URL has no host: {url}")))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| DocbotError::validation(format!("API URL has no port: {url}")))?;
        Ok(Self::new(parsed.scheme(), host, port))
    }

    /// Base URL including the version prefix and a trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{API_VERSION_PREFIX}/",
            self.scheme, self.host, self.port
        )
    }
}

impl From<&AppConfig> for ApiConfig {
    fn from(config: &AppConfig) -> Self {
        let preset = Self::for_environment(config.api.environment);
        Self {
            scheme: config.api.scheme.clone().unwrap_or(preset.scheme),
            host: config.api.host.clone().unwrap_or(preset.host),
            port: config.api.port.unwrap_or(preset.port),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docbot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocbotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docbot/docbot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocbotError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocbotError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocbotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocbotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocbotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Read the bearer token from the env var named by `auth.token_env`.
///
/// The token is not checked locally; a bad token surfaces as a 401 from the API.
pub fn resolve_access_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.auth.token_env;
    non_empty(std::env::var(var_name).ok()).ok_or_else(|| {
        DocbotError::config(format!(
            "access token not found. Set the {var_name} environment variable."
        ))
    })
}

/// Resolve the OAuth client id and secret.
pub fn resolve_oauth(config: &AppConfig) -> Result<(String, String)> {
    let client_id = non_empty(Some(config.auth.client_id.clone()))
        .ok_or_else(|| DocbotError::config("auth.client_id is not set"))?;

    let var_name = &config.auth.client_secret_env;
    let secret = non_empty(std::env::var(var_name).ok()).ok_or_else(|| {
        DocbotError::config(format!(
            "OAuth client secret not found. Set the {var_name} environment variable."
        ))
    })?;

    Ok((client_id, secret))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
