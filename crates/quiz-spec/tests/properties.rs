use proptest::prelude::*;
use serde_json::{Value, json};

use quiz_spec::{AnswerMap, Expr, Question, is_visible, validate};

fn text_question(rules: Value) -> Question {
    let mut question = json!({ "id": "q", "section": "s", "type": "text", "label": "Q" });
    if !rules.is_null() {
        question["validation"] = rules;
    }
    serde_json::from_value(question).expect("question fixture")
}

fn answer_maps() -> impl Strategy<Value = AnswerMap> {
    prop::collection::btree_map(
        "[a-z]{1,6}",
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z ]{0,8}".prop_map(Value::String),
        ],
        0..6,
    )
    .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn no_rule_is_always_visible(answers in answer_maps()) {
        prop_assert!(is_visible(None, &answers));
    }

    #[test]
    fn no_rules_always_validate(text in ".{0,16}") {
        let question = text_question(Value::Null);
        prop_assert!(validate(&question, Some(&Value::String(text))).ok);
        prop_assert!(validate(&question, None).ok);
    }

    #[test]
    fn required_accepts_any_non_empty_text(text in "[a-zA-Z0-9 ]{0,7}[a-zA-Z]") {
        let question = text_question(json!({ "required": true }));
        prop_assert!(validate(&question, Some(&Value::String(text))).ok);
    }

    #[test]
    fn parser_never_panics(source in ".{0,40}") {
        let _ = Expr::parse(&source);
    }

    #[test]
    fn strict_equality_matches_answer(value in "[a-z]{1,8}") {
        let expr = Expr::parse(&format!("answers.goal === '{value}'")).expect("parses");
        let answers: AnswerMap = [("goal".to_string(), Value::String(value))].into_iter().collect();
        prop_assert_eq!(expr.evaluate_bool(&answers), Ok(true));
    }
}

#[test]
fn required_rejects_empty_forms() {
    let question = text_question(json!({ "required": true }));
    for value in [None, Some(Value::Null), Some(json!("")), Some(json!([]))] {
        assert!(!validate(&question, value.as_ref()).ok);
    }
}
