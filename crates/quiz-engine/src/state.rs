use std::sync::Arc;

use quiz_spec::{AnswerMap, Draft, Question, QuizConfig, Section, is_present, visible_indices};
use serde::Serialize;
use serde_json::Value;

/// Session lifecycle: loading -> in-progress <-> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizStatus {
    Loading,
    InProgress,
    Completed,
}

/// Answered vs. answerable questions in the visible subsequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Derived {
    pub(crate) visible: Vec<usize>,
    pub(crate) section: Option<usize>,
    pub(crate) is_first: bool,
    pub(crate) is_last: bool,
}

/// Snapshot of one quiz session. Only the reducer produces new states.
#[derive(Debug, Clone)]
pub struct QuizState {
    pub(crate) config: Arc<QuizConfig>,
    pub(crate) answers: AnswerMap,
    pub(crate) current: Option<usize>,
    pub(crate) status: QuizStatus,
    pub(crate) dirty: bool,
    pub(crate) revision: u64,
    pub(crate) derived: Derived,
}

impl QuizState {
    /// Fresh session waiting for `Initialize`.
    pub fn new(config: Arc<QuizConfig>) -> Self {
        let mut state = Self {
            config,
            answers: AnswerMap::new(),
            current: None,
            status: QuizStatus::Loading,
            dirty: false,
            revision: 0,
            derived: Derived::default(),
        };
        state.recompute();
        state
    }

    /// Rebuilds every derived field from config, answers and the current index.
    pub(crate) fn recompute(&mut self) {
        let visible = visible_indices(&self.config, &self.answers);
        let section = match self.current_question() {
            Some(question) => self.config.section_index(&question.section),
            None => self.config.sections.len().checked_sub(1),
        };
        let (is_first, is_last) = match self.current {
            Some(idx) => (
                visible.first() == Some(&idx),
                visible.last() == Some(&idx),
            ),
            None => (false, false),
        };
        self.derived = Derived {
            visible,
            section,
            is_first,
            is_last,
        };
    }

    pub fn config(&self) -> &Arc<QuizConfig> {
        &self.config
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&Value> {
        self.answers.get(question_id)
    }

    pub fn status(&self) -> QuizStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bumped on every answer change; drafts and save acknowledgements carry it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.and_then(|idx| self.config.questions.get(idx))
    }

    pub fn current_question_id(&self) -> Option<&str> {
        self.current_question().map(|question| question.id.as_str())
    }

    /// Section owning the current question, or the last section when there is none.
    pub fn current_section(&self) -> Option<&Section> {
        self.derived
            .section
            .and_then(|idx| self.config.sections.get(idx))
    }

    pub fn sections(&self) -> &[Section] {
        &self.config.sections
    }

    pub fn is_first_question(&self) -> bool {
        self.derived.is_first
    }

    pub fn is_last_question(&self) -> bool {
        self.derived.is_last
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.derived.visible
    }

    pub fn visible_questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.derived
            .visible
            .iter()
            .filter_map(|idx| self.config.questions.get(*idx))
    }

    pub fn is_visible(&self, question_id: &str) -> bool {
        self.config
            .question_index(question_id)
            .is_some_and(|idx| self.derived.visible.contains(&idx))
    }

    pub fn progress(&self) -> Progress {
        let answerable: Vec<_> = self
            .visible_questions()
            .filter(|question| !question.kind.is_presentational())
            .collect();
        let answered = answerable
            .iter()
            .filter(|question| self.answers.get(&question.id).is_some_and(is_present))
            .count();
        Progress {
            answered,
            total: answerable.len(),
        }
    }

    /// Persistable snapshot for resuming this session later.
    pub fn draft(&self) -> Draft {
        Draft {
            quiz_id: self.config.id.clone(),
            quiz_version: self.config.version.clone(),
            answers: self.answers.clone(),
            current_question_id: self.current_question_id().map(str::to_string),
            revision: self.revision,
            updated_at: Some(quiz_spec::now_rfc3339()),
        }
    }
}
