//! Configuration types for note generation.
//!
//! Everything the run needs to reach the LLM endpoint and price its usage
//! lives in [`NotesConfig`], loaded from a JSON file with [`NotesConfig::load`]
//! or built in code via [`NotesConfig::builder`]. Both paths end in
//! [`NotesConfig::validate`], so a config that reaches the processor is
//! always usable.
//!
//! # Example
//! ```json
//! {
//!   "api_base": "https://api.deepseek.com/v1",
//!   "api_key": "sk-...",
//!   "model": "deepseek-chat",
//!   "max_tokens": 4096,
//!   "context_window": 32768,
//!   "temperature": 0.7,
//!   "price_per_1m_tokens": 2.0,
//!   "log_level": "info"
//! }
//! ```

use crate::error::NotesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Connection, sampling and pricing settings for a run.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    /// `/chat/completions` is appended.
    pub api_base: String,

    /// Bearer credential sent with every request.
    pub api_key: String,

    /// Model identifier passed through to the endpoint.
    pub model: String,

    /// Maximum tokens the model may generate per page. Default: 4096.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Model context window in tokens. Default: 32768.
    ///
    /// Only used to warn when a page prompt plus `max_tokens` will not fit.
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.7.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Price per one million tokens (prompt + completion), in the user's
    /// currency. Default: 0.0.
    #[serde(default)]
    pub price_per_1m_tokens: f64,

    /// Log level used when the CLI does not override it. Default: info.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Per-request timeout in seconds. Default: 60.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_context_window() -> u32 {
    32_768
}

fn default_temperature() -> f32 {
    0.7
}

fn default_api_timeout_secs() -> u64 {
    60
}

impl fmt::Debug for NotesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotesConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("context_window", &self.context_window)
            .field("temperature", &self.temperature)
            .field("price_per_1m_tokens", &self.price_per_1m_tokens)
            .field("log_level", &self.log_level)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl NotesConfig {
    /// Create a builder. The three connection fields have no sensible default.
    pub fn builder(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> NotesConfigBuilder {
        NotesConfigBuilder {
            config: Self {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                max_tokens: default_max_tokens(),
                context_window: default_context_window(),
                temperature: default_temperature(),
                price_per_1m_tokens: 0.0,
                log_level: LogLevel::default(),
                api_timeout_secs: default_api_timeout_secs(),
            },
        }
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NotesError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NotesError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                NotesError::ConfigUnreadable {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                }
            }
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            NotesError::InvalidConfig(detail) => NotesError::ConfigUnreadable {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, NotesError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| NotesError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), NotesError> {
        for (name, value) in [
            ("api_base", &self.api_base),
            ("api_key", &self.api_key),
            ("model", &self.model),
        ] {
            if value.trim().is_empty() {
                return Err(NotesError::InvalidConfig(format!(
                    "`{name}` must not be empty"
                )));
            }
        }
        if self.max_tokens == 0 {
            return Err(NotesError::InvalidConfig("`max_tokens` must be ≥ 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(NotesError::InvalidConfig(format!(
                "`temperature` must be 0.0–2.0, got {}",
                self.temperature
            )));
        }
        if !self.price_per_1m_tokens.is_finite() || self.price_per_1m_tokens < 0.0 {
            return Err(NotesError::InvalidConfig(format!(
                "`price_per_1m_tokens` must be ≥ 0, got {}",
                self.price_per_1m_tokens
            )));
        }
        if self.api_timeout_secs == 0 {
            return Err(NotesError::InvalidConfig(
                "`api_timeout_secs` must be ≥ 1".into(),
            ));
        }
        if self.context_window <= self.max_tokens {
            return Err(NotesError::InvalidConfig(format!(
                "`context_window` ({}) must exceed `max_tokens` ({})",
                self.context_window, self.max_tokens
            )));
        }
        Ok(())
    }

    /// Cost of `tokens` at the configured price.
    pub fn cost_of(&self, tokens: u64) -> f64 {
        tokens as f64 / 1_000_000.0 * self.price_per_1m_tokens
    }
}

/// Builder for [`NotesConfig`].
#[derive(Debug)]
pub struct NotesConfigBuilder {
    config: NotesConfig,
}

impl NotesConfigBuilder {
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn context_window(mut self, n: u32) -> Self {
        self.config.context_window = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn price_per_1m_tokens(mut self, price: f64) -> Self {
        self.config.price_per_1m_tokens = price;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NotesConfig, NotesError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What to do when a page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Record the page as skipped and continue. (default)
    #[default]
    Skip,
    /// Stop at the first failure, keeping pages already completed.
    Abort,
}

impl FromStr for ErrorStrategy {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(ErrorStrategy::Skip),
            "abort" => Ok(ErrorStrategy::Abort),
            other => Err(NotesError::InvalidConfig(format!(
                "unknown error strategy '{other}' (expected skip or abort)"
            ))),
        }
    }
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorStrategy::Skip => "skip",
            ErrorStrategy::Abort => "abort",
        })
    }
}

/// Verbosity of the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Request details, token counts and per-call cost.
    Debug,
    /// Page milestones only. (default)
    #[default]
    Info,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl FromStr for LogLevel {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            other => Err(NotesError::InvalidConfig(format!(
                "unknown log level '{other}' (expected debug or info)"
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "api_base": "https://api.example.com/v1",
        "api_key": "sk-test",
        "model": "deepseek-chat",
        "max_tokens": 2048,
        "context_window": 16000,
        "temperature": 0.3,
        "price_per_1m_tokens": 2.0,
        "log_level": "debug"
    }"#;

    #[test]
    fn parses_all_recognised_keys() {
        let c = NotesConfig::from_json(FULL).unwrap();
        assert_eq!(c.api_base, "https://api.example.com/v1");
        assert_eq!(c.model, "deepseek-chat");
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.context_window, 16000);
        assert_eq!(c.price_per_1m_tokens, 2.0);
        assert_eq!(c.log_level, LogLevel::Debug);
        assert_eq!(c.api_timeout_secs, 60);
    }

    #[test]
    fn optional_keys_fall_back_to_defaults() {
        let c = NotesConfig::from_json(
            r#"{"api_base": "http://localhost:8000/v1", "api_key": "k", "model": "m"}"#,
        )
        .unwrap();
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.context_window, 32_768);
        assert_eq!(c.price_per_1m_tokens, 0.0);
        assert_eq!(c.log_level, LogLevel::Info);
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = NotesConfig::from_json(r#"{"api_base": "http://x/v1", "model": "m"}"#)
            .unwrap_err();
        assert!(matches!(err, NotesError::InvalidConfig(_)));
        assert!(err.to_string().contains("api_key"), "got: {err}");
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let err = NotesConfig::builder("http://x/v1", "  ", "m").build().unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn context_window_must_exceed_max_tokens() {
        let err = NotesConfig::builder("http://x/v1", "k", "m")
            .max_tokens(8000)
            .context_window(4000)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("context_window"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = NotesConfig::builder("http://x/v1", "k", "m")
            .price_per_1m_tokens(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("price_per_1m_tokens"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = NotesConfig::load("/definitely/not/here/config.json").unwrap_err();
        assert!(matches!(err, NotesError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, FULL).unwrap();
        let c = NotesConfig::load(&path).unwrap();
        assert_eq!(c.temperature, 0.3);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = NotesConfig::from_json(FULL).unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-test"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn cost_is_linear_in_tokens() {
        let c = NotesConfig::builder("http://x/v1", "k", "m")
            .price_per_1m_tokens(4.0)
            .build()
            .unwrap();
        assert_eq!(c.cost_of(1_000_000), 4.0);
        assert_eq!(c.cost_of(250_000), 1.0);
        assert_eq!(c.cost_of(0), 0.0);
    }

    #[test]
    fn error_strategy_parses_case_insensitively() {
        assert_eq!("SKIP".parse::<ErrorStrategy>().unwrap(), ErrorStrategy::Skip);
        assert_eq!("abort".parse::<ErrorStrategy>().unwrap(), ErrorStrategy::Abort);
        assert!("retry".parse::<ErrorStrategy>().is_err());
        assert_eq!(ErrorStrategy::default().to_string(), "skip");
    }

    #[test]
    fn log_level_parses() {
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("trace".parse::<LogLevel>().is_err());
    }
}
