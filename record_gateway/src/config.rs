//! `[record_system]` section of the coverage configuration.
//!
//! ```toml
//! [record_system]
//! base_url = "https://records.example/api"
//! token_env = "RECORD_SYSTEM_TOKEN"
//! timeout_secs = 30
//! ```
//!
//! `RECORD_SYSTEM_URL` and `RECORD_SYSTEM_TIMEOUT_SECS` override the file.
//! The token itself never lives in the file; `token_env` names the variable
//! holding it.

use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_parsed, get_env_var_opt};

/// Overrides `base_url`.
pub const URL_ENV: &str = "RECORD_SYSTEM_URL";
/// Overrides `timeout_secs`.
pub const TIMEOUT_ENV: &str = "RECORD_SYSTEM_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Root of the system-of-record API; endpoints are joined onto it.
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_token_env() -> String {
    "RECORD_SYSTEM_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize)]
struct Document {
    record_system: Option<GatewayConfig>,
}

/// Apply environment overrides, then trim and check the values.
pub fn normalize_gateway_config(cfg: &mut GatewayConfig) -> anyhow::Result<()> {
    if let Some(url) = get_env_var_opt(URL_ENV) {
        cfg.base_url = url;
    }
    if let Some(secs) = get_env_parsed::<u64>(TIMEOUT_ENV)? {
        cfg.timeout_secs = secs;
    }

    cfg.base_url = cfg.base_url.trim().trim_end_matches('/').to_string();
    if !(cfg.base_url.starts_with("http://") || cfg.base_url.starts_with("https://")) {
        bail!("record_system.base_url must be an http(s) URL, got {:?}", cfg.base_url);
    }
    cfg.token_env = cfg.token_env.trim().to_string();
    if cfg.token_env.is_empty() {
        bail!("record_system.token_env cannot be empty after trimming");
    }
    if cfg.timeout_secs == 0 {
        bail!("record_system.timeout_secs must be greater than zero");
    }
    Ok(())
}

/// Read the `[record_system]` table out of a full configuration document.
///
/// Other sections are ignored.
pub fn load_gateway_config_str(toml_str: &str) -> anyhow::Result<GatewayConfig> {
    let doc: Document = toml::from_str(toml_str).context("failed to parse gateway TOML")?;
    let mut cfg = doc
        .record_system
        .context("missing [record_system] section")?;
    normalize_gateway_config(&mut cfg)?;
    Ok(cfg)
}

pub fn load_gateway_config_path(
    path: impl AsRef<std::path::Path>,
) -> anyhow::Result<GatewayConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_gateway_config_str(&text)
}
