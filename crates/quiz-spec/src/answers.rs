use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Question id -> answer value.
pub type AnswerMap = Map<String, Value>;

/// Whether a value counts as an answer. `0` and `false` do; null, empty
/// strings, empty lists and empty objects do not.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty() && map.values().any(is_present),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Canonicalize incoming answers into an object payload.
pub fn normalize_answers(answers: &Value) -> AnswerMap {
    answers.as_object().cloned().unwrap_or_default()
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

/// Outcome of validating a single answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOutcome {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
            code: None,
        }
    }

    pub fn fail(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            code: Some(code.into()),
        }
    }
}

/// Persisted, partially completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Draft {
    pub quiz_id: String,
    pub quiz_version: String,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_id: Option<String>,
    #[serde(default)]
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One denormalized answer inside an intake record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeAnswer {
    pub question_id: String,
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_key: Option<String>,
    pub label: String,
    pub value: Value,
}

/// Finalized submission produced from a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeRecord {
    pub quiz_id: String,
    pub quiz_version: String,
    pub user_id: String,
    pub submitted_at: String,
    pub answers: Vec<IntakeAnswer>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub computed: AnswerMap,
}
