use regex::Regex;
use serde_json::Value;
use time::Date;
use time::macros::format_description;
use tracing::warn;

use crate::answers::{ValidationOutcome, is_present};
use crate::spec::{AnswerShape, Question, ValidationRules};

const STEP_TOLERANCE: f64 = 1e-9;

/// Checks a single answer against its question's rules.
///
/// `required` rejects missing values, null, `""` and `[]`; zero and `false`
/// are accepted. Shape, option, range, step and pattern checks only run
/// once a value is present.
pub fn validate(question: &Question, value: Option<&Value>) -> ValidationOutcome {
    validate_with_label(question, value, &label_of(question))
}

/// Same as [`validate`] with an already-resolved label for messages.
pub fn validate_with_label(
    question: &Question,
    value: Option<&Value>,
    label: &str,
) -> ValidationOutcome {
    let shape = question.kind.answer_shape();
    if matches!(shape, AnswerShape::None) {
        return ValidationOutcome::ok();
    }
    let Some(rules) = &question.validation else {
        return ValidationOutcome::ok();
    };

    let Some(value) = value.filter(|value| is_present(value)) else {
        if rules.required {
            return ValidationOutcome::fail("required", format!("{label} is required"));
        }
        return ValidationOutcome::ok();
    };

    if let Some(outcome) = check_shape(shape, value, label) {
        return outcome;
    }
    if let Some(outcome) = check_options(question, shape, value, label) {
        return outcome;
    }
    if let Some(outcome) = check_range(rules, shape, value, label) {
        return outcome;
    }
    if let Some(outcome) = check_pattern(question, rules, value, label) {
        return outcome;
    }
    ValidationOutcome::ok()
}

fn label_of(question: &Question) -> String {
    let label = question.label.resolve(None, None).trim();
    if label.is_empty() {
        question.id.clone()
    } else {
        label.to_string()
    }
}

fn check_shape(
    shape: AnswerShape,
    value: &Value,
    label: &str,
) -> Option<ValidationOutcome> {
    let matches = match shape {
        AnswerShape::Choice | AnswerShape::Unit | AnswerShape::Text => value.is_string(),
        AnswerShape::Choices => value.is_array(),
        AnswerShape::Number => numeric(value).is_some(),
        AnswerShape::Boolean => boolean(value).is_some(),
        AnswerShape::Measurements => value.is_object(),
        AnswerShape::Date => value.as_str().is_some_and(is_iso_date),
        AnswerShape::None => true,
    };
    if matches {
        return None;
    }
    let expected = match shape {
        AnswerShape::Choice | AnswerShape::Unit => "one of the listed options",
        AnswerShape::Choices => "a list of options",
        AnswerShape::Number => "a number",
        AnswerShape::Text => "text",
        AnswerShape::Boolean => "yes or no",
        AnswerShape::Measurements => "height and weight",
        AnswerShape::Date => "a date (YYYY-MM-DD)",
        AnswerShape::None => "nothing",
    };
    Some(ValidationOutcome::fail(
        "type_mismatch",
        format!("{label} must be {expected}"),
    ))
}

fn check_options(
    question: &Question,
    shape: AnswerShape,
    value: &Value,
    label: &str,
) -> Option<ValidationOutcome> {
    if question.options.is_empty() {
        return None;
    }
    let unknown = match shape {
        AnswerShape::Choice | AnswerShape::Unit => value
            .as_str()
            .filter(|choice| question.option(choice).is_none())
            .map(str::to_string),
        AnswerShape::Choices => value.as_array().and_then(|items| {
            items
                .iter()
                .find(|item| item.as_str().is_none_or(|choice| question.option(choice).is_none()))
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
        }),
        _ => None,
    }?;
    Some(ValidationOutcome::fail(
        "invalid_option",
        format!("'{unknown}' is not a valid option for {label}"),
    ))
}

fn check_range(
    rules: &ValidationRules,
    shape: AnswerShape,
    value: &Value,
    label: &str,
) -> Option<ValidationOutcome> {
    if matches!(shape, AnswerShape::Choices) {
        let count = value.as_array().map(Vec::len).unwrap_or_default() as f64;
        if let Some(min) = rules.min
            && count < min
        {
            return Some(ValidationOutcome::fail(
                "min_selections",
                format!("{label}: choose at least {min}"),
            ));
        }
        if let Some(max) = rules.max
            && count > max
        {
            return Some(ValidationOutcome::fail(
                "max_selections",
                format!("{label}: choose at most {max}"),
            ));
        }
        return None;
    }

    if !matches!(shape, AnswerShape::Number) {
        return None;
    }
    let number = numeric(value)?;
    if let Some(min) = rules.min
        && number < min
    {
        return Some(ValidationOutcome::fail(
            "min",
            format!("{label} must be at least {min}"),
        ));
    }
    if let Some(max) = rules.max
        && number > max
    {
        return Some(ValidationOutcome::fail(
            "max",
            format!("{label} must be at most {max}"),
        ));
    }
    if let Some(step) = rules.step
        && step > 0.0
    {
        let steps = (number - rules.min.unwrap_or(0.0)) / step;
        if (steps - steps.round()).abs() > STEP_TOLERANCE {
            return Some(ValidationOutcome::fail(
                "step",
                format!("{label} must be in steps of {step}"),
            ));
        }
    }
    None
}

fn check_pattern(
    question: &Question,
    rules: &ValidationRules,
    value: &Value,
    label: &str,
) -> Option<ValidationOutcome> {
    let pattern = rules.pattern.as_ref()?;
    let text = value.as_str()?;
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            warn!(question_id = %question.id, %pattern, error = %err, "ignoring invalid pattern");
            return None;
        }
    };
    if regex.is_match(text) {
        None
    } else {
        Some(ValidationOutcome::fail(
            "pattern",
            format!("{label} is not in the expected format"),
        ))
    }
}

/// Numbers, or strings holding a number as typed into a text input.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Booleans, or the yes/no strings a toggle may submit.
pub fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.to_lowercase().as_str() {
            "yes" | "y" | "true" => Some(true),
            "no" | "n" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn is_iso_date(text: &str) -> bool {
    Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok()
}
