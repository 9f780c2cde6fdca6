use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

// ── Defaults ─────────────────────────────────────────────────────────────────

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro-vision";
const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not a valid socket address: {value}")]
    InvalidAddr { key: &'static str, value: String },
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be an http(s) URL, got {value:?}")]
    InvalidUrl { key: &'static str, value: String },
}

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` when the secret is missing; requests then fail upstream.
    pub api_key: Option<String>,
    pub api_base: Url,
    pub model: String,
    pub max_upload_bytes: usize,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("IMAGE_DESCRIBER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidAddr {
            key: "IMAGE_DESCRIBER_BIND",
            value: bind_raw.clone(),
        })?;

        let base_raw = get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = parse_base_url(&base_raw)?;

        let max_upload_bytes = parse_positive(
            "IMAGE_DESCRIBER_MAX_UPLOAD_BYTES",
            get("IMAGE_DESCRIBER_MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES as u64,
        )? as usize;

        let timeout_secs = parse_positive(
            "IMAGE_DESCRIBER_UPSTREAM_TIMEOUT_SECS",
            get("IMAGE_DESCRIBER_UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;

        Ok(Config {
            bind_addr,
            api_key: get("GEMINI_API_KEY"),
            api_base,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_upload_bytes,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Full `generateContent` endpoint for the configured model.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.as_str().trim_end_matches('/'),
            self.model
        )
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        key: "GEMINI_API_BASE",
        value: raw.to_string(),
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_positive(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}
