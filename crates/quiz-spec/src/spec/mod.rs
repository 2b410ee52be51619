pub mod question;
pub mod quiz;

pub use question::{
    AnswerShape, BranchingRule, ChoiceOption, Question, QuestionType, ValidationRules,
};
pub use quiz::{ConfigError, ConfigWarning, QuizConfig, Section};
