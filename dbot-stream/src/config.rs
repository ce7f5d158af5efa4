//! Streaming config: edit pacing, placeholder text and history bound. Loaded from env.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_EDIT_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_MIN_CHARS_PER_EDIT: usize = 10;
pub const DEFAULT_THINKING_MESSAGE: &str = "Thinking...";
pub const DEFAULT_HISTORY_MAX_LENGTH: usize = 10;

/// Knobs consumed by [`crate::StreamSession`]. The per-unit length limit is not here: it comes from
/// the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// STREAM_EDIT_INTERVAL_MS: minimum time between two commits to the sink
    pub min_edit_interval: Duration,
    /// STREAM_MIN_CHARS_PER_EDIT: buffered characters needed before a non-first flush is worth an edit
    pub min_chars_per_edit: usize,
    /// STREAM_THINKING_MESSAGE: placeholder content of the first unit, replaced by the first flush
    pub thinking_message: String,
    /// HISTORY_MAX_LENGTH: entries kept per conversation in the history registry
    pub history_max_length: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_edit_interval: Duration::from_millis(DEFAULT_EDIT_INTERVAL_MS),
            min_chars_per_edit: DEFAULT_MIN_CHARS_PER_EDIT,
            thinking_message: DEFAULT_THINKING_MESSAGE.to_string(),
            history_max_length: DEFAULT_HISTORY_MAX_LENGTH,
        }
    }
}

/// Reads `key` and parses it; unset falls back to `default`, a set but unparsable value is an error.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is set but not a valid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl StreamConfig {
    /// Load from environment variables, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        let min_edit_interval_ms = parse_env("STREAM_EDIT_INTERVAL_MS", DEFAULT_EDIT_INTERVAL_MS)?;
        let min_chars_per_edit =
            parse_env("STREAM_MIN_CHARS_PER_EDIT", DEFAULT_MIN_CHARS_PER_EDIT)?;
        let thinking_message = env::var("STREAM_THINKING_MESSAGE")
            .unwrap_or_else(|_| DEFAULT_THINKING_MESSAGE.to_string());
        let history_max_length = parse_env("HISTORY_MAX_LENGTH", DEFAULT_HISTORY_MAX_LENGTH)?;

        Ok(Self {
            min_edit_interval: Duration::from_millis(min_edit_interval_ms),
            min_chars_per_edit,
            thinking_message,
            history_max_length,
        })
    }

    /// Validate config. Call after from_env() to fail fast.
    pub fn validate(&self) -> Result<()> {
        if self.thinking_message.trim().is_empty() {
            anyhow::bail!("STREAM_THINKING_MESSAGE must not be empty");
        }
        if self.history_max_length == 0 {
            anyhow::bail!("HISTORY_MAX_LENGTH must be at least 1");
        }
        Ok(())
    }

    pub fn with_min_edit_interval(mut self, interval: Duration) -> Self {
        self.min_edit_interval = interval;
        self
    }

    pub fn with_min_chars_per_edit(mut self, chars: usize) -> Self {
        self.min_chars_per_edit = chars;
        self
    }

    pub fn with_thinking_message(mut self, message: impl Into<String>) -> Self {
        self.thinking_message = message.into();
        self
    }
}
