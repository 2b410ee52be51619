use std::collections::BTreeSet;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::expr::Expr;
use crate::i18n::LocalizedText;
use crate::spec::question::Question;

/// Display grouping for questions. Questions point at sections, not the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub title: LocalizedText,
}

/// Root quiz definition, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuizConfig {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub questions: Vec<Question>,
}

/// Structural problems that make a config unusable.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("failed to parse quiz config: {0}")]
    Parse(String),
    #[error("quiz config is missing '{0}'")]
    MissingField(&'static str),
    #[error("quiz config '{0}' has no questions")]
    NoQuestions(String),
    #[error("duplicate question id '{0}'")]
    DuplicateQuestion(String),
    #[error("duplicate section id '{0}'")]
    DuplicateSection(String),
    #[error("question '{question}' references unknown section '{section}'")]
    UnknownSection { question: String, section: String },
}

/// Non-fatal findings reported by [`QuizConfig::lint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub question_id: String,
    pub code: &'static str,
    pub message: String,
}

impl QuizConfig {
    /// Parses, normalizes and checks a config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let mut config: QuizConfig =
            serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.normalize();
        config.check()?;
        Ok(config)
    }

    /// Sorts sections and questions by `order`; ties keep document order.
    pub fn normalize(&mut self) {
        self.sections.sort_by_key(|section| section.order);
        self.questions.sort_by_key(|question| question.order);
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingField("id"));
        }
        if self.version.trim().is_empty() {
            return Err(ConfigError::MissingField("version"));
        }
        if self.questions.is_empty() {
            return Err(ConfigError::NoQuestions(self.id.clone()));
        }

        let mut section_ids = BTreeSet::new();
        for section in &self.sections {
            if !section_ids.insert(section.id.as_str()) {
                return Err(ConfigError::DuplicateSection(section.id.clone()));
            }
        }

        let mut question_ids = BTreeSet::new();
        for question in &self.questions {
            if question.id.trim().is_empty() {
                return Err(ConfigError::MissingField("questions[].id"));
            }
            if !question_ids.insert(question.id.as_str()) {
                return Err(ConfigError::DuplicateQuestion(question.id.clone()));
            }
            if !section_ids.contains(question.section.as_str()) {
                return Err(ConfigError::UnknownSection {
                    question: question.id.clone(),
                    section: question.section.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn lint(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        for question in &self.questions {
            let mut warn = |code: &'static str, message: String| {
                warnings.push(ConfigWarning {
                    question_id: question.id.clone(),
                    code,
                    message,
                })
            };

            if let Some(rule) = &question.branching
                && !rule.is_empty()
                && let Err(err) = Expr::parse(&rule.show_if)
            {
                warn("show_if_syntax", format!("show_if does not parse: {err}"));
            }
            if let Some(compute) = &question.compute
                && let Err(err) = Expr::parse(compute)
            {
                warn("compute_syntax", format!("compute does not parse: {err}"));
            }
            if question.kind.has_options() && question.options.is_empty() {
                warn("no_options", "choice question declares no options".into());
            }

            let Some(rules) = &question.validation else {
                continue;
            };
            if rules.required && question.kind.is_presentational() {
                warn(
                    "required_ignored",
                    "required has no effect on a display-only question".into(),
                );
            }
            if let Some(pattern) = &rules.pattern
                && let Err(err) = Regex::new(pattern)
            {
                warn("pattern_syntax", format!("pattern is not a valid regex: {err}"));
            }
            if let (Some(min), Some(max)) = (rules.min, rules.max)
                && min > max
            {
                warn("min_above_max", format!("min {min} is greater than max {max}"));
            }
            if let Some(step) = rules.step
                && step <= 0.0
            {
                warn("step_not_positive", format!("step {step} must be positive"));
            }
        }
        warnings
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn question_index(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == id)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn section_index(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|section| section.id == id)
    }
}
