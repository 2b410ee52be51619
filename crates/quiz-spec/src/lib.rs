#![allow(missing_docs)]

pub mod answers;
pub mod computed;
pub mod expr;
pub mod i18n;
pub mod spec;
pub mod summary;
pub mod validate;
pub mod visibility;

pub use answers::{
    AnswerMap, Draft, IntakeAnswer, IntakeRecord, ValidationOutcome, is_present,
    normalize_answers, now_rfc3339,
};
pub use computed::computed_values;
pub use expr::{EvalError, Expr, ParseError};
pub use i18n::LocalizedText;
pub use spec::{
    AnswerShape, BranchingRule, ChoiceOption, ConfigError, ConfigWarning, Question,
    QuestionType, QuizConfig, Section, ValidationRules,
};
pub use summary::{SummaryItem, display_value, summary_items};
pub use validate::{validate, validate_with_label};
pub use visibility::{
    VisibilityMap, is_visible, question_visible, resolve_visibility, visible_indices,
};
