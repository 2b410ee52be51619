mod support;

use std::sync::Arc;

use quiz_engine::{EngineError, QuizStatus};
use quiz_spec::{AnswerMap, ConfigError, QuizConfig};
use serde_json::json;

use support::{abc_config, harness, wellness_config};

#[test]
fn branching_scenario_skips_hidden_question() {
    let mut h = harness(abc_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    assert_eq!(quiz.state().current_question_id(), Some("A"));
    assert!(quiz.state().is_first_question());

    quiz.answer("A", json!("x")).expect("answer");
    assert!(quiz.next(false).expect("next").ok);
    assert_eq!(quiz.state().current_question_id(), Some("B"));

    quiz.previous().expect("previous");
    assert_eq!(quiz.state().current_question_id(), Some("A"));
    quiz.answer("A", json!("y")).expect("answer");
    assert!(quiz.next(false).expect("next").ok);
    assert_eq!(quiz.state().current_question_id(), Some("C"));
    assert!(quiz.state().is_last_question());
}

#[test]
fn required_question_blocks_next() {
    let mut h = harness(wellness_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    assert_eq!(quiz.state().current_question_id(), Some("name"));
    assert!(!quiz.can_skip());

    let step = quiz.next(false).expect("next");
    assert!(!step.ok);
    assert_eq!(step.code.as_deref(), Some("required"));
    assert_eq!(step.message.as_deref(), Some("First name is required"));
    assert_eq!(quiz.state().current_question_id(), Some("name"));
    assert_eq!(quiz.state().status(), QuizStatus::InProgress);
}

#[test]
fn validation_messages_follow_locale() {
    let mut h = harness(wellness_config());
    h.controller = h.controller.with_locale("es");
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    let step = quiz.next(false).expect("next");
    assert_eq!(step.message.as_deref(), Some("Nombre is required"));
}

#[test]
fn completion_fires_exactly_once() {
    let mut h = harness(abc_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), Some("C")).expect("initialize");
    assert_eq!(quiz.state().current_question_id(), Some("C"));

    let step = quiz.next(false).expect("next");
    assert!(step.ok && step.completed);
    assert_eq!(quiz.state().status(), QuizStatus::Completed);
    assert_eq!(quiz.state().current_index(), None);

    for _ in 0..3 {
        let again = quiz.next(true).expect("next");
        assert!(again.completed);
    }
    quiz.complete().expect("complete");
    assert_eq!(h.analytics.count("quiz_completed"), 1);
    assert_eq!(h.analytics.count("quiz_started"), 1);
}

#[test]
fn jump_after_completion_reopens_session() {
    let mut h = harness(abc_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    quiz.answer("A", json!("x")).expect("answer");
    quiz.next(false).expect("next");
    quiz.answer("B", json!("b")).expect("answer");
    quiz.next(false).expect("next");
    quiz.answer("C", json!("c")).expect("answer");
    quiz.next(false).expect("next");
    assert_eq!(quiz.state().status(), QuizStatus::Completed);
    let before = quiz.state().answers().clone();

    assert!(quiz.jump_to("B").expect("jump"));
    assert_eq!(quiz.state().status(), QuizStatus::InProgress);
    assert_eq!(quiz.state().current_question_id(), Some("B"));
    assert_eq!(quiz.state().answers(), &before);
}

#[test]
fn jump_to_hidden_or_unknown_question_is_refused() {
    let mut h = harness(abc_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    assert!(!quiz.jump_to("B").expect("jump"));
    assert_eq!(quiz.state().current_question_id(), Some("A"));
    assert!(matches!(
        quiz.jump_to("Z"),
        Err(EngineError::UnknownQuestion(id)) if id == "Z"
    ));
}

#[test]
fn operations_before_initialize_fail_fast() {
    let mut h = harness(abc_config());
    let quiz = &mut h.controller;
    assert_eq!(quiz.state().status(), QuizStatus::Loading);
    assert!(matches!(quiz.next(true), Err(EngineError::NotReady)));
    assert!(matches!(quiz.answer("A", json!("x")), Err(EngineError::NotReady)));
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    assert!(matches!(
        quiz.initialize(AnswerMap::new(), None),
        Err(EngineError::AlreadyInitialized)
    ));
}

#[test]
fn retreat_from_completed_lands_on_last_visible() {
    let mut h = harness(wellness_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    quiz.complete().expect("complete");
    quiz.previous().expect("previous");
    assert_eq!(quiz.state().status(), QuizStatus::InProgress);
    assert_eq!(quiz.state().current_question_id(), Some("notes"));
    assert_eq!(
        quiz.state().current_section().map(|section| section.id.as_str()),
        Some("habits")
    );
}

#[test]
fn answer_events_only_for_tagged_questions() {
    let mut h = harness(wellness_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");
    quiz.answer("name", json!("Ada")).expect("answer");
    quiz.answer("birth_date", json!("1990-01-01")).expect("answer");
    quiz.answer("smoker", json!(false)).expect("answer");

    let answered: Vec<_> = h
        .analytics
        .events()
        .into_iter()
        .filter(|event| event.name == "question_answered")
        .map(|event| event.payload["analytics_key"].clone())
        .collect();
    assert_eq!(answered, [json!("name_entered"), json!("smoker")]);
}

#[test]
fn walk_through_wellness_quiz() {
    let mut h = harness(wellness_config());
    let quiz = &mut h.controller;
    quiz.initialize(AnswerMap::new(), None).expect("initialize");

    let script = [
        ("name", json!("Ada")),
        ("birth_date", json!("1990-02-28")),
        ("body", json!({ "height_cm": 180, "weight_kg": 81 })),
    ];
    for (id, value) in script {
        assert_eq!(quiz.state().current_question_id(), Some(id));
        quiz.answer(id, value).expect("answer");
        assert!(quiz.next(false).expect("next").ok, "{id} should validate");
    }

    assert_eq!(quiz.state().current_question_id(), Some("bmi"));
    assert!(quiz.can_skip());
    quiz.next(false).expect("next");

    quiz.answer("primary_goal", json!("sleep")).expect("answer");
    quiz.next(false).expect("next");
    assert_eq!(quiz.state().current_question_id(), Some("sleep_hours"));
    quiz.answer("sleep_hours", json!(7.25)).expect("answer");
    assert_eq!(quiz.next(false).expect("next").code.as_deref(), Some("step"));
    quiz.answer("sleep_hours", json!(7.5)).expect("answer");
    quiz.next(false).expect("next");

    quiz.answer("smoker", json!(false)).expect("answer");
    quiz.next(false).expect("next");
    assert_eq!(quiz.state().current_question_id(), Some("testimonial"));
    quiz.next(false).expect("next");
    assert_eq!(quiz.state().current_question_id(), Some("notes"));
    let step = quiz.next(false).expect("next");
    assert!(step.completed);

    let progress = quiz.state().progress();
    assert_eq!(progress.answered, progress.total - 1);
}

fn raw_config(value: serde_json::Value) -> Arc<QuizConfig> {
    Arc::new(serde_json::from_value(value).expect("config shape"))
}

#[test]
fn traversal_follows_order_even_for_unsorted_configs() {
    let config = raw_config(json!({
        "id": "unsorted",
        "version": "1",
        "sections": [{ "id": "main", "order": 1 }],
        "questions": [
            { "id": "C", "section": "main", "order": 3, "type": "text" },
            { "id": "A", "section": "main", "order": 1, "type": "text" },
            { "id": "B", "section": "main", "order": 2, "type": "text" }
        ]
    }));
    let mut h = harness(config);
    h.controller.initialize(AnswerMap::new(), None).expect("initialize");
    assert_eq!(h.controller.state().current_question_id(), Some("A"));
    assert!(h.controller.state().is_first_question());

    h.controller.next(false).expect("next");
    assert_eq!(h.controller.state().current_question_id(), Some("B"));
    h.controller.next(false).expect("next");
    assert_eq!(h.controller.state().current_question_id(), Some("C"));
    assert!(h.controller.state().is_last_question());
}

#[test]
fn structurally_broken_config_fails_initialize() {
    let duplicate = raw_config(json!({
        "id": "dup",
        "version": "1",
        "sections": [{ "id": "main" }],
        "questions": [
            { "id": "A", "section": "main", "type": "text" },
            { "id": "A", "section": "main", "type": "number" }
        ]
    }));
    let mut h = harness(duplicate);
    let err = h
        .controller
        .initialize(AnswerMap::new(), None)
        .expect_err("duplicate ids");
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::DuplicateQuestion(ref id)) if id == "A"
    ));
    assert_eq!(h.controller.state().status(), QuizStatus::Loading);
    assert!(matches!(h.controller.next(false), Err(EngineError::NotReady)));

    let orphan = raw_config(json!({
        "id": "orphan",
        "version": "1",
        "sections": [],
        "questions": [{ "id": "A", "section": "missing", "type": "text" }]
    }));
    let err = harness(orphan)
        .controller
        .initialize(AnswerMap::new(), None)
        .expect_err("unknown section");
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::UnknownSection { .. })
    ));

    let unnamed = raw_config(json!({
        "id": "",
        "version": "",
        "sections": [{ "id": "main" }],
        "questions": [{ "id": "A", "section": "main", "type": "text" }]
    }));
    let err = harness(unnamed)
        .controller
        .initialize(AnswerMap::new(), None)
        .expect_err("empty id");
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::MissingField("id"))
    ));
}

#[tokio::test]
async fn resume_rejects_broken_config_before_reading_drafts() {
    let config = raw_config(json!({
        "id": "dup",
        "version": "1",
        "sections": [{ "id": "main" }],
        "questions": [
            { "id": "A", "section": "main", "type": "text" },
            { "id": "A", "section": "main", "type": "text" }
        ]
    }));
    let mut h = harness(config);
    let err = h.controller.resume("u1", None).await.expect_err("duplicate ids");
    assert!(matches!(err, EngineError::Config(_)));
    assert_eq!(h.controller.state().status(), QuizStatus::Loading);
}
