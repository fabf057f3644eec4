use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{LlmSettings, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::throttle::ThrottleConfig;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub throttle_max_calls: usize,
    pub throttle_window_secs: u64,
    pub inference_timeout_secs: u64,
    pub pdftoppm_path: String,
    pub raster_dpi: u32,
    pub jpeg_quality: u8,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            google_api_key: lookup("GOOGLE_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .context("Required environment variable 'GOOGLE_API_KEY' is not set")?,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_base: lookup("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            throttle_max_calls: parse_or(&lookup, "THROTTLE_MAX_CALLS", 15)?,
            throttle_window_secs: parse_or(&lookup, "THROTTLE_WINDOW_SECS", 60)?,
            inference_timeout_secs: parse_or(&lookup, "INFERENCE_TIMEOUT_SECS", 120)?,
            pdftoppm_path: lookup("PDFTOPPM_PATH").unwrap_or_else(|| "pdftoppm".to_string()),
            raster_dpi: parse_or(&lookup, "RASTER_DPI", 150)?,
            jpeg_quality: parse_or(&lookup, "JPEG_QUALITY", 85)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        // Surface an invalid quota at startup rather than on first use.
        config.throttle_config()?;
        Ok(config)
    }

    pub fn throttle_config(&self) -> Result<ThrottleConfig> {
        ThrottleConfig::new(
            self.throttle_max_calls,
            Duration::from_secs(self.throttle_window_secs),
        )
        .context("Invalid THROTTLE_MAX_CALLS / THROTTLE_WINDOW_SECS")
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.google_api_key.clone(),
            api_base: self.gemini_api_base.clone(),
            model: self.gemini_model.clone(),
            timeout: Duration::from_secs(self.inference_timeout_secs),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
