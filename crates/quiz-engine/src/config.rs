use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;

pub const AUTOSAVE_ENV: &str = "QUIZ_AUTOSAVE_MS";

/// Engine tuning knobs, usually read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before a pending draft is written.
    pub autosave_debounce_ms: u64,
    /// Locale used for labels when the session does not pick one.
    pub default_locale: Option<String>,
    /// Root segment of every per-user document path.
    pub storage_prefix: String,
    /// Emit `question_answered` for questions carrying an analytics key.
    pub emit_answer_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 800,
            default_locale: None,
            storage_prefix: "users".into(),
            emit_answer_events: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|err| EngineError::Settings(err.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<(), EngineError> {
        let prefix = self.storage_prefix.trim_matches('/');
        if prefix.is_empty() || prefix.split('/').any(str::is_empty) {
            return Err(EngineError::Settings(format!(
                "storage_prefix '{}' is not a valid path",
                self.storage_prefix
            )));
        }
        Ok(())
    }

    /// Applies `QUIZ_AUTOSAVE_MS` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(AUTOSAVE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.autosave_debounce_ms = ms,
                Err(err) => warn!(%raw, error = %err, "ignoring {AUTOSAVE_ENV}"),
            }
        }
        self
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn prefix(&self) -> &str {
        self.storage_prefix.trim_matches('/')
    }
}
