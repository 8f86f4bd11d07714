use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_HELP_URL: &str = "https://aistudio.google.com/app/apikey";

const DEFAULT_TIMEOUT_SECONDS: f64 = 120.0;
const MIN_TIMEOUT_SECONDS: f64 = 15.0;
const MAX_TIMEOUT_SECONDS: f64 = 600.0;

/// Provider settings resolved once at startup.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

// Keeps the credential out of debug output.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let Some(api_key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY"))
        else {
            bail!(
                "GOOGLE_API_KEY not set; create a key at {API_KEY_HELP_URL} and export it as GOOGLE_API_KEY"
            );
        };
        let api_base = non_empty("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty("GEMSTUDIO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_s = match non_empty("GEMSTUDIO_REQUEST_TIMEOUT") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .with_context(|| format!("GEMSTUDIO_REQUEST_TIMEOUT is not a number ({raw})"))?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            api_key,
            api_base,
            model,
            request_timeout: Duration::from_secs_f64(
                timeout_s.clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS),
            ),
        })
    }
}
