use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::i18n::LocalizedText;

/// Question type tags understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[serde(alias = "single_choice", alias = "radio")]
    SingleChoice,
    #[serde(alias = "multi_choice", alias = "checkbox")]
    MultiChoice,
    #[serde(alias = "numeric")]
    Number,
    #[serde(alias = "textarea")]
    Text,
    Date,
    #[serde(alias = "yes_no", alias = "boolean")]
    YesNo,
    #[serde(alias = "height_weight")]
    HeightWeight,
    #[serde(alias = "unit_toggle")]
    UnitToggle,
    Computed,
    Message,
    Testimonial,
}

/// Shape of the value a question collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerShape {
    Choice,
    Choices,
    Number,
    Text,
    Date,
    Boolean,
    Measurements,
    Unit,
    /// Display-only; never holds an answer.
    None,
}

impl QuestionType {
    pub fn answer_shape(self) -> AnswerShape {
        match self {
            QuestionType::SingleChoice => AnswerShape::Choice,
            QuestionType::MultiChoice => AnswerShape::Choices,
            QuestionType::Number => AnswerShape::Number,
            QuestionType::Text => AnswerShape::Text,
            QuestionType::Date => AnswerShape::Date,
            QuestionType::YesNo => AnswerShape::Boolean,
            QuestionType::HeightWeight => AnswerShape::Measurements,
            QuestionType::UnitToggle => AnswerShape::Unit,
            QuestionType::Computed | QuestionType::Message | QuestionType::Testimonial => {
                AnswerShape::None
            }
        }
    }

    pub fn is_presentational(self) -> bool {
        matches!(self.answer_shape(), AnswerShape::None)
    }

    pub fn has_options(self) -> bool {
        matches!(
            self.answer_shape(),
            AnswerShape::Choice | AnswerShape::Choices | AnswerShape::Unit
        )
    }
}

/// Declarative validation rules for a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationRules {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Visibility rule; `show_if` is an expression over `answers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BranchingRule {
    #[serde(default)]
    pub show_if: String,
}

impl BranchingRule {
    pub fn new(show_if: impl Into<String>) -> Self {
        Self {
            show_if: show_if.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.show_if.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    #[serde(default)]
    pub label: LocalizedText,
}

/// Definition of a single quiz step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub id: String,
    pub section: String,
    #[serde(default)]
    pub order: i64,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching: Option<BranchingRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_key: Option<String>,
    /// Arithmetic expression producing a derived value (e.g. BMI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<String>,
}

impl Question {
    pub fn is_required(&self) -> bool {
        !self.kind.is_presentational()
            && self
                .validation
                .as_ref()
                .is_some_and(|rules| rules.required)
    }

    pub fn option(&self, value: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.value == value)
    }
}
