use quiz_spec::AnswerMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::state::{QuizState, QuizStatus};

/// Every way a session can change.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Starts the session with fresh or resumed answers.
    Initialize {
        answers: AnswerMap,
        start: Option<String>,
    },
    SetAnswer {
        question_id: String,
        value: Value,
    },
    /// Moves to the next visible question. Validation happens before dispatch.
    Advance { skip_validation: bool },
    Retreat,
    JumpTo { question_id: String },
    Complete,
    /// A persistence write finished. With a revision, `dirty` is only cleared
    /// when nothing changed since that revision was saved.
    SaveAcknowledged { revision: Option<u64> },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Initialize { .. } => "initialize",
            Action::SetAnswer { .. } => "set_answer",
            Action::Advance { .. } => "advance",
            Action::Retreat => "retreat",
            Action::JumpTo { .. } => "jump_to",
            Action::Complete => "complete",
            Action::SaveAcknowledged { .. } => "save_acknowledged",
        }
    }
}

/// Applies one action and returns the next state. Pure apart from logging.
pub fn reduce(state: &QuizState, action: Action) -> QuizState {
    let mut next = state.clone();
    let name = action.name();

    if next.status == QuizStatus::Loading && !matches!(action, Action::Initialize { .. }) {
        debug!(action = name, "ignoring action while loading");
        return next;
    }

    match action {
        Action::Initialize { answers, start } => initialize(&mut next, answers, start),
        Action::SetAnswer { question_id, value } => set_answer(&mut next, question_id, value),
        Action::Advance { .. } => advance(&mut next),
        Action::Retreat => retreat(&mut next),
        Action::JumpTo { question_id } => jump_to(&mut next, &question_id),
        Action::Complete => finish(&mut next),
        Action::SaveAcknowledged { revision } => {
            if revision.is_none_or(|saved| saved == next.revision) {
                next.dirty = false;
            }
        }
    }

    next.recompute();
    debug!(
        action = name,
        status = ?next.status,
        current = ?next.current_question_id(),
        dirty = next.dirty,
        "quiz transition"
    );
    next
}

fn initialize(state: &mut QuizState, answers: AnswerMap, start: Option<String>) {
    state.answers = answers;
    state.dirty = false;
    state.revision = 0;
    state.recompute();

    let requested = start.as_deref().and_then(|id| {
        let idx = state.config.question_index(id)?;
        state.derived.visible.contains(&idx).then_some(idx)
    });
    if let Some(id) = start.as_deref()
        && requested.is_none()
    {
        debug!(question_id = id, "start question unavailable; using first visible");
    }

    match requested.or_else(|| state.derived.visible.first().copied()) {
        Some(idx) => {
            state.current = Some(idx);
            state.status = QuizStatus::InProgress;
        }
        None => finish(state),
    }
}

fn set_answer(state: &mut QuizState, question_id: String, value: Value) {
    let answered = state.config.question_index(&question_id);
    state.answers.insert(question_id, value);
    state.dirty = true;
    state.revision += 1;
    state.recompute();

    let visible = &state.derived.visible;
    match state.status {
        QuizStatus::InProgress => {
            let Some(current) = state.current else {
                return;
            };
            if visible.contains(&current) {
                return;
            }
            // The new answer hid the question on screen.
            match next_visible(visible, current).or_else(|| prev_visible(visible, current)) {
                Some(idx) => state.current = Some(idx),
                None => finish(state),
            }
        }
        QuizStatus::Completed => {
            let target = answered
                .filter(|idx| visible.contains(idx))
                .or_else(|| visible.last().copied());
            if let Some(idx) = target {
                state.current = Some(idx);
                state.status = QuizStatus::InProgress;
            }
        }
        QuizStatus::Loading => {}
    }
}

fn advance(state: &mut QuizState) {
    if state.status != QuizStatus::InProgress {
        return;
    }
    let Some(current) = state.current else {
        return;
    };
    match next_visible(&state.derived.visible, current) {
        Some(idx) => state.current = Some(idx),
        None => finish(state),
    }
}

fn retreat(state: &mut QuizState) {
    let visible = &state.derived.visible;
    match state.status {
        QuizStatus::InProgress => {
            if let Some(current) = state.current
                && let Some(idx) = prev_visible(visible, current)
            {
                state.current = Some(idx);
            }
        }
        QuizStatus::Completed => {
            if let Some(idx) = visible.last().copied() {
                state.current = Some(idx);
                state.status = QuizStatus::InProgress;
            }
        }
        QuizStatus::Loading => {}
    }
}

fn jump_to(state: &mut QuizState, question_id: &str) {
    let Some(idx) = state.config.question_index(question_id) else {
        warn!(question_id, "jump to unknown question ignored");
        return;
    };
    let allowed = state.derived.visible.contains(&idx) || state.current == Some(idx);
    if !allowed {
        debug!(question_id, "jump to hidden question ignored");
        return;
    }
    state.current = Some(idx);
    state.status = QuizStatus::InProgress;
}

fn finish(state: &mut QuizState) {
    state.current = None;
    state.status = QuizStatus::Completed;
}

fn next_visible(visible: &[usize], after: usize) -> Option<usize> {
    visible.iter().copied().find(|idx| *idx > after)
}

fn prev_visible(visible: &[usize], before: usize) -> Option<usize> {
    visible.iter().rev().copied().find(|idx| *idx < before)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quiz_spec::QuizConfig;
    use serde_json::json;

    use super::*;

    fn state() -> QuizState {
        let config = QuizConfig::from_value(json!({
            "id": "abc",
            "version": "1",
            "sections": [{ "id": "one", "order": 1 }, { "id": "two", "order": 2 }],
            "questions": [
                { "id": "a", "section": "one", "order": 1, "type": "text" },
                {
                    "id": "b", "section": "one", "order": 2, "type": "text",
                    "branching": { "show_if": "answers.a == 'x'" }
                },
                { "id": "c", "section": "two", "order": 3, "type": "text" }
            ]
        }))
        .expect("config");
        QuizState::new(Arc::new(config))
    }

    fn init(state: &QuizState) -> QuizState {
        reduce(
            state,
            Action::Initialize {
                answers: AnswerMap::new(),
                start: None,
            },
        )
    }

    fn set_a(state: &QuizState, value: &str) -> QuizState {
        let action = Action::SetAnswer {
            question_id: "a".into(),
            value: json!(value),
        };
        reduce(state, action)
    }

    fn advance_from(state: &QuizState) -> QuizState {
        let action = Action::Advance {
            skip_validation: false,
        };
        reduce(state, action)
    }

    fn acknowledge(state: &QuizState, revision: u64) -> QuizState {
        let action = Action::SaveAcknowledged {
            revision: Some(revision),
        };
        reduce(state, action)
    }

    #[test]
    fn actions_before_initialize_are_ignored() {
        let loading = state();
        let next = advance_from(&loading);
        assert_eq!(next.status(), QuizStatus::Loading);
        assert_eq!(next.current_index(), None);
        let next = set_a(&loading, "x");
        assert!(next.answers().is_empty());
    }

    #[test]
    fn hiding_the_current_question_moves_forward() {
        let mut s = init(&state());
        s = set_a(&s, "x");
        s = advance_from(&s);
        assert_eq!(s.current_question_id(), Some("b"));

        s = set_a(&s, "y");
        assert_eq!(s.current_question_id(), Some("c"));
        assert_eq!(s.current_section().map(|section| section.id.as_str()), Some("two"));
        assert!(s.is_last_question());
    }

    #[test]
    fn stale_save_ack_keeps_dirty() {
        let mut s = init(&state());
        s = set_a(&s, "x");
        let saved = s.revision();
        s = set_a(&s, "y");
        s = acknowledge(&s, saved);
        assert!(s.is_dirty());
        s = acknowledge(&s, s.revision());
        assert!(!s.is_dirty());
    }

    #[test]
    fn completed_session_has_no_current_question() {
        let mut s = init(&state());
        s = reduce(&s, Action::Complete);
        assert_eq!(s.status(), QuizStatus::Completed);
        assert_eq!(s.current_question_id(), None);
        assert_eq!(s.current_section().map(|section| section.id.as_str()), Some("two"));
        s = reduce(&s, Action::Retreat);
        assert_eq!(s.current_question_id(), Some("c"));
        assert_eq!(s.status(), QuizStatus::InProgress);
    }
}
