use serde::Serialize;
use serde_json::Value;

use crate::answers::{AnswerMap, is_present};
use crate::spec::{AnswerShape, Question, QuizConfig};
use crate::validate::boolean;
use crate::visibility::question_visible;

/// A row on the review screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryItem {
    pub question_id: String,
    pub section_id: String,
    pub label: String,
    pub display: String,
    pub value: Value,
}

/// Lists visible, answered questions in traversal order.
///
/// Presence is judged per answer shape: `0` and `false` are real answers and
/// are listed; null, empty strings, empty lists and empty objects are not.
pub fn summary_items(
    config: &QuizConfig,
    answers: &AnswerMap,
    locale: Option<&str>,
) -> Vec<SummaryItem> {
    let default_locale = config.default_locale.as_deref();
    config
        .questions
        .iter()
        .filter(|question| !question.kind.is_presentational())
        .filter(|question| question_visible(question, answers))
        .filter_map(|question| {
            let value = answers.get(&question.id).filter(|value| is_present(value))?;
            Some(SummaryItem {
                question_id: question.id.clone(),
                section_id: question.section.clone(),
                label: question.label.resolve(locale, default_locale).to_string(),
                display: display_value(question, value, locale, default_locale),
                value: value.clone(),
            })
        })
        .collect()
}

/// Human-readable rendering of an answer, resolving option labels.
pub fn display_value(
    question: &Question,
    value: &Value,
    locale: Option<&str>,
    default_locale: Option<&str>,
) -> String {
    let option_label = |choice: &str| {
        question
            .option(choice)
            .map(|option| option.label.resolve(locale, default_locale))
            .filter(|label| !label.is_empty())
            .unwrap_or(choice)
            .to_string()
    };

    match (question.kind.answer_shape(), value) {
        (AnswerShape::Choice | AnswerShape::Unit, Value::String(choice)) => option_label(choice),
        (AnswerShape::Choices, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(choice) => option_label(choice),
                other => plain(other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        (AnswerShape::Boolean, other) => match boolean(other) {
            Some(true) => "Yes".into(),
            Some(false) => "No".into(),
            None => plain(other),
        },
        (AnswerShape::Measurements, Value::Object(fields)) => fields
            .iter()
            .filter(|(_, field)| is_present(field))
            .map(|(name, field)| format!("{}: {}", name.replace('_', " "), plain(field)))
            .collect::<Vec<_>>()
            .join(", "),
        (_, other) => plain(other),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
