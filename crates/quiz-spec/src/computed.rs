use tracing::debug;

use crate::answers::AnswerMap;
use crate::expr::Expr;
use crate::spec::QuizConfig;

/// Evaluates every question's `compute` expression against the answers.
///
/// Expressions that fail (missing inputs, division by zero, bad syntax) are
/// left out of the result rather than reported.
pub fn computed_values(config: &QuizConfig, answers: &AnswerMap) -> AnswerMap {
    let mut values = AnswerMap::new();
    for question in &config.questions {
        let Some(source) = &question.compute else {
            continue;
        };
        let result = Expr::parse(source)
            .map_err(|err| err.to_string())
            .and_then(|expr| expr.evaluate(answers).map_err(|err| err.to_string()));
        match result {
            Ok(value) if !value.is_null() => {
                values.insert(question.id.clone(), value);
            }
            Ok(_) => {}
            Err(error) => {
                debug!(question_id = %question.id, %error, "computed value unavailable");
            }
        }
    }
    values
}
