//! Service configuration, read from the environment.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::cloudflare::CLOUDFLARE_API_BASE;
use crate::db::default_database_path;
use crate::secrets::{resolve_secret_optional, SecretError, SecretCipher};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_PATH: &str = "/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("Could not determine home directory; set MAILROUTE_DATABASE_PATH")]
    NoHomeDir,

    #[error(transparent)]
    Secret(#[from] SecretError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Runtime settings for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub database_path: PathBuf,
    pub cloudflare_api_base: String,
    /// Prefix every route is mounted under, e.g. `/api`. Empty mounts at root.
    pub base_path: String,
    /// Key for encrypting stored credentials. `None` stores them as-is.
    pub token_key: Option<SecretString>,
    /// Whether the config read includes the `_full` plain-value object.
    /// Off unless `MAILROUTE_REVEAL_SECRETS` enables it.
    pub reveal_secrets: bool,
}

impl AppConfig {
    /// Loads configuration from `MAILROUTE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let bind = match var("MAILROUTE_BIND") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                var: "MAILROUTE_BIND",
                reason: format!("{}", e),
            })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = match var("MAILROUTE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                var: "MAILROUTE_PORT",
                reason: format!("{}", e),
            })?,
            None => DEFAULT_PORT,
        };

        let database_path = match var("MAILROUTE_DATABASE_PATH") {
            Some(raw) => PathBuf::from(raw),
            None => default_database_path().ok_or(ConfigError::NoHomeDir)?,
        };

        let cloudflare_api_base = var("MAILROUTE_CLOUDFLARE_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string());
        if !cloudflare_api_base.starts_with("http://") && !cloudflare_api_base.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                var: "MAILROUTE_CLOUDFLARE_API_BASE",
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let base_path = normalize_base_path(
            get("MAILROUTE_BASE_PATH")
                .as_deref()
                .unwrap_or(DEFAULT_BASE_PATH),
        );

        let token_key = resolve_secret_optional(
            var("MAILROUTE_TOKEN_KEY").as_deref(),
            var("MAILROUTE_TOKEN_KEY_FILE").as_deref(),
        )?;

        let reveal_secrets = match var("MAILROUTE_REVEAL_SECRETS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "MAILROUTE_REVEAL_SECRETS",
                reason: format!("expected true or false, got '{}'", raw),
            })?,
            None => false,
        };

        Ok(Self {
            bind,
            port,
            database_path,
            cloudflare_api_base,
            base_path,
            token_key,
            reveal_secrets,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Builds the at-rest cipher, if a key is configured.
    pub fn secret_cipher(&self) -> std::result::Result<Option<Arc<SecretCipher>>, SecretError> {
        self.token_key
            .as_ref()
            .map(|key| SecretCipher::from_hex_key(key.expose_secret()).map(Arc::new))
            .transpose()
    }
}

/// `/api/` and `api` both become `/api`; `/` and empty become empty.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
