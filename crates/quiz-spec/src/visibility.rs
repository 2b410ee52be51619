use std::collections::BTreeMap;

use tracing::warn;

use crate::answers::AnswerMap;
use crate::expr::Expr;
use crate::spec::{BranchingRule, Question, QuizConfig};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Decides whether a rule admits its question given the answers so far.
///
/// No rule, or an empty `show_if`, means always visible. Parse and evaluation
/// errors are logged and treated as hidden.
pub fn is_visible(rule: Option<&BranchingRule>, answers: &AnswerMap) -> bool {
    evaluate_rule(None, rule, answers)
}

/// Same as [`is_visible`], attributing any logged failure to the question.
pub fn question_visible(question: &Question, answers: &AnswerMap) -> bool {
    evaluate_rule(Some(&question.id), question.branching.as_ref(), answers)
}

fn evaluate_rule(
    question_id: Option<&str>,
    rule: Option<&BranchingRule>,
    answers: &AnswerMap,
) -> bool {
    let Some(rule) = rule.filter(|rule| !rule.is_empty()) else {
        return true;
    };
    let question_id = question_id.unwrap_or("<unknown>");
    let expr = match Expr::parse(&rule.show_if) {
        Ok(expr) => expr,
        Err(err) => {
            warn!(question_id, show_if = %rule.show_if, error = %err, "show_if does not parse; hiding question");
            return false;
        }
    };
    match expr.evaluate_bool(answers) {
        Ok(visible) => visible,
        Err(err) => {
            warn!(question_id, show_if = %rule.show_if, error = %err, "show_if failed to evaluate; hiding question");
            false
        }
    }
}

pub fn resolve_visibility(config: &QuizConfig, answers: &AnswerMap) -> VisibilityMap {
    config
        .questions
        .iter()
        .map(|question| (question.id.clone(), question_visible(question, answers)))
        .collect()
}

/// Indices (into `config.questions`) of the visible-question subsequence.
pub fn visible_indices(config: &QuizConfig, answers: &AnswerMap) -> Vec<usize> {
    config
        .questions
        .iter()
        .enumerate()
        .filter(|(_, question)| question_visible(question, answers))
        .map(|(idx, _)| idx)
        .collect()
}
