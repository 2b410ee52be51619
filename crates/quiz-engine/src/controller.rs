use std::sync::Arc;

use quiz_spec::{AnswerMap, Draft, IntakeRecord, QuizConfig, ValidationOutcome, validate_with_label};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::autosave::{Autosaver, SaveAck};
use crate::collab::analytics::{AnalyticsSink, TracingAnalytics};
use crate::collab::store::{DocumentStore, MemoryDocumentStore, WriteMode, draft_path, intake_path};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::intake::build_intake_record;
use crate::reducer::{Action, reduce};
use crate::state::{QuizState, QuizStatus};

/// Collaborators a session reports to. Built once and shared.
#[derive(Clone)]
pub struct EngineServices {
    pub analytics: Arc<dyn AnalyticsSink>,
    pub store: Arc<dyn DocumentStore>,
}

impl EngineServices {
    pub fn new(analytics: Arc<dyn AnalyticsSink>, store: Arc<dyn DocumentStore>) -> Self {
        Self { analytics, store }
    }

    /// Tracing analytics and an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(TracingAnalytics),
            Arc::new(MemoryDocumentStore::new()),
        )
    }
}

/// Outcome of a `next` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub completed: bool,
}

impl StepResult {
    fn moved(completed: bool) -> Self {
        Self {
            ok: true,
            message: None,
            code: None,
            completed,
        }
    }

    fn rejected(outcome: ValidationOutcome) -> Self {
        Self {
            ok: false,
            message: outcome.message,
            code: outcome.code,
            completed: false,
        }
    }
}

/// Entry point for a presentation layer: owns one session's state and
/// turns user intents into reducer actions.
pub struct QuizController {
    state: QuizState,
    services: EngineServices,
    settings: EngineConfig,
    locale: Option<String>,
    initialized: bool,
    completion_reported: bool,
    autosave: Option<Autosaver>,
}

impl QuizController {
    pub fn new(config: Arc<QuizConfig>, services: EngineServices, settings: EngineConfig) -> Self {
        Self {
            state: QuizState::new(config),
            services,
            settings,
            locale: None,
            initialized: false,
            completion_reported: false,
            autosave: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale
            .as_deref()
            .or(self.settings.default_locale.as_deref())
    }

    /// Starts the session. Allowed once. Fails with [`EngineError::Config`]
    /// when the config does not pass its structural checks.
    pub fn initialize(
        &mut self,
        answers: AnswerMap,
        start: Option<&str>,
    ) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        self.prepare_config()?;
        let resumed = !answers.is_empty();
        self.dispatch(Action::Initialize {
            answers,
            start: start.map(str::to_string),
        });
        self.initialized = true;

        let config = self.state.config();
        self.services.analytics.track(
            "quiz_started",
            json!({ "quiz_id": config.id, "quiz_version": config.version, "resumed": resumed }),
        );
        self.report_completion();
        Ok(())
    }

    /// Loads the user's saved draft, if any, and initializes from it.
    ///
    /// The session stays in `loading` until the read resolves; on error it
    /// stays there and the caller decides whether to retry or start fresh.
    pub async fn resume(&mut self, user_id: &str, start: Option<&str>) -> Result<bool, EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        self.prepare_config()?;
        let path = self.draft_path(user_id);
        let stored = self.services.store.read(&path).await?;
        let draft = match stored {
            Some(value) => Some(
                serde_json::from_value::<Draft>(value)
                    .map_err(|source| EngineError::Draft { path: path.clone(), source })?,
            ),
            None => None,
        };

        let config = Arc::clone(self.state.config());
        match draft {
            Some(draft) if draft.quiz_id == config.id => {
                if draft.quiz_version != config.version {
                    warn!(
                        saved = %draft.quiz_version,
                        current = %config.version,
                        "resuming draft saved against another quiz version"
                    );
                }
                let start = start.map(str::to_string).or(draft.current_question_id);
                self.initialize(draft.answers, start.as_deref())?;
                Ok(true)
            }
            Some(draft) => {
                warn!(%path, saved = %draft.quiz_id, "ignoring draft for another quiz");
                self.initialize(AnswerMap::new(), start)?;
                Ok(false)
            }
            None => {
                self.initialize(AnswerMap::new(), start)?;
                Ok(false)
            }
        }
    }

    pub fn answer(&mut self, question_id: &str, value: Value) -> Result<(), EngineError> {
        self.ready()?;
        let question = self
            .state
            .config()
            .question(question_id)
            .ok_or_else(|| EngineError::UnknownQuestion(question_id.to_string()))?;
        let analytics_key = question.analytics_key.clone();

        self.dispatch(Action::SetAnswer {
            question_id: question_id.to_string(),
            value: value.clone(),
        });

        if self.settings.emit_answer_events
            && let Some(key) = analytics_key
        {
            self.services.analytics.track(
                "question_answered",
                json!({ "question_id": question_id, "analytics_key": key, "value": value }),
            );
        }
        self.schedule_autosave();
        self.report_completion();
        Ok(())
    }

    /// Validates the current answer unless skipping, then advances.
    pub fn next(&mut self, skip_validation: bool) -> Result<StepResult, EngineError> {
        self.ready()?;
        if self.state.status() == QuizStatus::Completed {
            return Ok(StepResult::moved(true));
        }
        if !skip_validation {
            let outcome = self.validate_current();
            if !outcome.ok {
                debug!(question = ?self.state.current_question_id(), code = ?outcome.code, "advance blocked");
                return Ok(StepResult::rejected(outcome));
            }
        }
        self.dispatch(Action::Advance { skip_validation });
        self.report_completion();
        Ok(StepResult::moved(
            self.state.status() == QuizStatus::Completed,
        ))
    }

    pub fn previous(&mut self) -> Result<(), EngineError> {
        self.ready()?;
        self.dispatch(Action::Retreat);
        Ok(())
    }

    /// Returns whether the jump happened; hidden questions cannot be jumped to.
    pub fn jump_to(&mut self, question_id: &str) -> Result<bool, EngineError> {
        self.ready()?;
        if self.state.config().question(question_id).is_none() {
            return Err(EngineError::UnknownQuestion(question_id.to_string()));
        }
        self.dispatch(Action::JumpTo {
            question_id: question_id.to_string(),
        });
        Ok(self.state.current_question_id() == Some(question_id))
    }

    pub fn complete(&mut self) -> Result<(), EngineError> {
        self.ready()?;
        self.dispatch(Action::Complete);
        self.report_completion();
        Ok(())
    }

    /// True when the current question may be left unanswered.
    pub fn can_skip(&self) -> bool {
        self.state
            .current_question()
            .is_none_or(|question| !question.is_required())
    }

    /// Validates the current question's answer with a localized label.
    pub fn validate_current(&self) -> ValidationOutcome {
        let Some(question) = self.state.current_question() else {
            return ValidationOutcome::ok();
        };
        let default_locale = self.state.config().default_locale.as_deref();
        let label = question.label.resolve(self.locale(), default_locale).trim();
        let label = if label.is_empty() { question.id.as_str() } else { label };
        validate_with_label(question, self.state.answer(&question.id), label)
    }

    /// Writes the current draft immediately and acknowledges it.
    pub async fn save_draft(&mut self, user_id: &str) -> Result<(), EngineError> {
        self.ready()?;
        let draft = self.state.draft();
        let revision = draft.revision;
        let value = serde_json::to_value(&draft)
            .map_err(|source| EngineError::Encode { what: "draft", source })?;
        self.services
            .store
            .write(&self.draft_path(user_id), value, WriteMode::Replace)
            .await?;
        self.acknowledge_save(revision);
        Ok(())
    }

    /// Marks `revision` as persisted. Stale revisions leave the session dirty.
    pub fn acknowledge_save(&mut self, revision: u64) {
        self.dispatch(Action::SaveAcknowledged {
            revision: Some(revision),
        });
    }

    /// Persists drafts in the background after every answer change.
    pub fn enable_autosave(&mut self, user_id: &str) {
        if self.autosave.is_some() {
            return;
        }
        let saver = Autosaver::spawn(
            Arc::clone(&self.services.store),
            self.draft_path(user_id),
            self.settings.autosave_debounce(),
        );
        self.autosave = Some(saver);
        if self.initialized && self.state.is_dirty() {
            self.schedule_autosave();
        }
    }

    /// Applies acknowledgements from the autosaver. Returns how many arrived.
    pub fn poll_autosave(&mut self) -> usize {
        let acks = match self.autosave.as_mut() {
            Some(saver) => saver.take_acks(),
            None => return 0,
        };
        let count = acks.len();
        self.apply_acks(acks);
        count
    }

    /// Writes the intake record for a completed session.
    pub async fn submit(&mut self, user_id: &str) -> Result<IntakeRecord, EngineError> {
        self.ready()?;
        if self.state.status() != QuizStatus::Completed {
            return Err(EngineError::NotCompleted);
        }
        let record = build_intake_record(
            &self.state,
            user_id,
            quiz_spec::now_rfc3339(),
            self.locale(),
        );
        let value = serde_json::to_value(&record)
            .map_err(|source| EngineError::Encode { what: "intake record", source })?;
        let path = intake_path(self.settings.prefix(), user_id, &record.quiz_id);
        self.services
            .store
            .write(&path, value, WriteMode::Replace)
            .await?;

        info!(%path, answers = record.answers.len(), "intake submitted");
        self.services.analytics.track(
            "intake_submitted",
            json!({
                "quiz_id": record.quiz_id,
                "quiz_version": record.quiz_version,
                "answers": record.answers.len(),
            }),
        );
        Ok(record)
    }

    /// Stops autosave after writing any pending draft.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        let Some(saver) = self.autosave.take() else {
            return Ok(());
        };
        let acks = saver.shutdown().await?;
        self.apply_acks(acks);
        Ok(())
    }

    /// Sorts and checks the config; a config that was deserialized directly
    /// has skipped both.
    fn prepare_config(&mut self) -> Result<(), EngineError> {
        let config = self.state.config();
        let mut prepared = QuizConfig::clone(config);
        prepared.normalize();
        prepared.check()?;
        if prepared != **config {
            debug!(quiz_id = %prepared.id, "reordered questions by their order field");
            self.state = QuizState::new(Arc::new(prepared));
        }
        Ok(())
    }

    fn ready(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotReady)
        }
    }

    fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    fn draft_path(&self, user_id: &str) -> String {
        draft_path(self.settings.prefix(), user_id, &self.state.config().id)
    }

    fn schedule_autosave(&self) {
        let Some(saver) = &self.autosave else {
            return;
        };
        if let Err(err) = saver.schedule(self.state.draft()) {
            warn!(error = %err, "autosave unavailable; draft not scheduled");
        }
    }

    fn apply_acks(&mut self, acks: Vec<SaveAck>) {
        for ack in acks {
            match ack.result {
                Ok(()) => self.acknowledge_save(ack.revision),
                Err(err) => warn!(revision = ack.revision, error = %err, "autosave write failed"),
            }
        }
    }

    fn report_completion(&mut self) {
        if self.completion_reported || self.state.status() != QuizStatus::Completed {
            return;
        }
        self.completion_reported = true;
        let config = self.state.config();
        let progress = self.state.progress();
        info!(quiz_id = %config.id, answered = progress.answered, "quiz completed");
        self.services.analytics.track(
            "quiz_completed",
            json!({
                "quiz_id": config.id,
                "quiz_version": config.version,
                "answered": progress.answered,
            }),
        );
    }
}
