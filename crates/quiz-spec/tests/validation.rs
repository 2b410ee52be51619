use serde_json::{Value, json};

use quiz_spec::{
    AnswerMap, QuizConfig, computed_values, resolve_visibility, summary_items, validate,
    visible_indices,
};

fn config() -> QuizConfig {
    QuizConfig::from_json_str(include_str!("fixtures/wellness_intake.json"))
        .expect("fixture should load")
}

fn answers(value: Value) -> AnswerMap {
    value.as_object().cloned().expect("answers must be an object")
}

#[test]
fn required_rejects_missing_and_empty_values() {
    let config = config();
    let name = config.question("name").expect("name question");
    for empty in [None, Some(json!(null)), Some(json!("")), Some(json!([]))] {
        let outcome = validate(name, empty.as_ref());
        assert!(!outcome.ok, "{empty:?} should be rejected");
        assert_eq!(outcome.code.as_deref(), Some("required"));
        assert_eq!(outcome.message.as_deref(), Some("First name is required"));
    }
    assert!(validate(name, Some(&json!("Ada"))).ok);
}

#[test]
fn required_accepts_zero_and_false() {
    let config = config();
    let smoker = config.question("smoker").expect("smoker question");
    assert!(validate(smoker, Some(&json!(false))).ok);

    let sleep = config.question("sleep_hours").expect("sleep question");
    assert!(validate(sleep, Some(&json!(0))).ok);
    assert_eq!(
        validate(sleep, Some(&json!(7.25))).code.as_deref(),
        Some("step")
    );
    assert!(validate(sleep, Some(&json!(7.5))).ok);
}

#[test]
fn optional_and_presentational_questions_always_pass() {
    let config = config();
    for id in ["notes", "testimonial", "bmi"] {
        let question = config.question(id).expect("question exists");
        assert!(validate(question, None).ok, "{id} should pass without a value");
    }
}

#[test]
fn pattern_and_option_failures_carry_codes() {
    let config = config();
    let name = config.question("name").expect("name question");
    assert_eq!(
        validate(name, Some(&json!("R2D2"))).code.as_deref(),
        Some("pattern")
    );

    let goal = config.question("primary_goal").expect("goal question");
    assert_eq!(
        validate(goal, Some(&json!("flexibility"))).code.as_deref(),
        Some("invalid_option")
    );
}

#[test]
fn branching_follows_answers() {
    let config = config();
    let visible = |value: Value| -> Vec<String> {
        visible_indices(&config, &answers(value))
            .into_iter()
            .map(|idx| config.questions[idx].id.clone())
            .collect()
    };

    let nothing = visible(json!({}));
    assert!(!nothing.contains(&"target_weight".to_string()));
    assert!(!nothing.contains(&"sleep_hours".to_string()));
    assert!(!nothing.contains(&"cigarettes".to_string()));

    let weight = visible(json!({ "primary_goal": "weight", "smoker": true }));
    assert!(weight.contains(&"target_weight".to_string()));
    assert!(!weight.contains(&"sleep_hours".to_string()));
    assert!(weight.contains(&"cigarettes".to_string()));

    let map = resolve_visibility(&config, &answers(json!({ "primary_goal": "sleep" })));
    assert_eq!(map.get("sleep_hours"), Some(&true));
    assert_eq!(map.get("target_weight"), Some(&false));
    assert_eq!(map.len(), config.questions.len());
}

#[test]
fn summary_lists_visible_answers_with_labels() {
    let config = config();
    let answers = answers(json!({
        "name": "Ada",
        "primary_goal": "sleep",
        "target_weight": 60,
        "sleep_hours": 7.5,
        "smoker": false,
        "notes": ""
    }));
    let items = summary_items(&config, &answers, Some("es"));
    insta::assert_json_snapshot!("summary_es", items);
}

#[test]
fn computed_bmi_uses_measurements() {
    let config = config();
    let values = computed_values(
        &config,
        &answers(json!({ "body": { "height_cm": 180, "weight_kg": 81 } })),
    );
    let bmi = values.get("bmi").and_then(Value::as_f64).expect("bmi computed");
    assert!((bmi - 25.0).abs() < 1e-9);
}
