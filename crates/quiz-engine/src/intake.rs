use quiz_spec::{AnswerMap, IntakeAnswer, IntakeRecord, computed_values, is_present};

use crate::state::QuizState;

/// Denormalizes the visible, answered questions of a session into a record.
///
/// Answers to questions hidden by branching are left out of both the answer
/// list and the computed values.
pub fn build_intake_record(
    state: &QuizState,
    user_id: &str,
    submitted_at: String,
    locale: Option<&str>,
) -> IntakeRecord {
    let config = state.config();
    let default_locale = config.default_locale.as_deref();
    let answers = state
        .visible_questions()
        .filter(|question| !question.kind.is_presentational())
        .filter_map(|question| {
            let value = state.answer(&question.id).filter(|value| is_present(value))?;
            Some(IntakeAnswer {
                question_id: question.id.clone(),
                section_id: question.section.clone(),
                analytics_key: question.analytics_key.clone(),
                label: question.label.resolve(locale, default_locale).to_string(),
                value: value.clone(),
            })
        })
        .collect();
    let visible_answers: AnswerMap = state
        .answers()
        .iter()
        .filter(|(id, _)| state.is_visible(id))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    IntakeRecord {
        quiz_id: config.id.clone(),
        quiz_version: config.version.clone(),
        user_id: user_id.to_string(),
        submitted_at,
        answers,
        computed: computed_values(config, &visible_answers),
    }
}
