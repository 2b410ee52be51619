//! Restricted expression language used by `show_if` rules and computed values.
//!
//! Expressions read from a single binding, `answers`, and can never write to it.
//! Supported syntax: string/number/boolean/null literals, `answers.a.b`,
//! `answers['key']`, `answers.list[0]`, `.length`, `.includes(x)`, `!`, unary `-`,
//! `&&`, `||`, `==`/`===`, `!=`/`!==`, `<`, `<=`, `>`, `>=`, `+`, `-`, `*`, `/`
//! and parentheses.

mod parser;

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::answers::AnswerMap;

pub use parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Value,
    },
    Answer {
        path: Vec<String>,
    },
    Length {
        target: Box<Expr>,
    },
    Includes {
        target: Box<Expr>,
        needle: Box<Expr>,
    },
    Not {
        expression: Box<Expr>,
    },
    Neg {
        expression: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("cannot read '{path}': a parent value is missing")]
    MissingReference { path: String },
    #[error("'{op}' is not defined for {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("'{op}' is not defined for {operand}")]
    UnsupportedOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("arithmetic produced a non-finite number")]
    NonFinite,
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr, ParseError> {
        parser::parse(source)
    }

    pub fn evaluate(&self, answers: &AnswerMap) -> Result<Value, EvalError> {
        match self {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Answer { path } => lookup(answers, path),
            Expr::Length { target } => match target.evaluate(answers)? {
                Value::Array(items) => Ok(Value::from(items.len())),
                Value::String(text) => Ok(Value::from(text.chars().count())),
                other => Err(EvalError::UnsupportedOperand {
                    op: "length",
                    operand: type_name(&other),
                }),
            },
            Expr::Includes { target, needle } => {
                let haystack = target.evaluate(answers)?;
                let needle = needle.evaluate(answers)?;
                match (&haystack, &needle) {
                    (Value::Array(items), _) => Ok(Value::Bool(
                        items.iter().any(|item| strict_eq(item, &needle)),
                    )),
                    (Value::String(text), Value::String(part)) => {
                        Ok(Value::Bool(text.contains(part.as_str())))
                    }
                    // Unanswered multi-choice: nothing is included.
                    (Value::Null, _) => Ok(Value::Bool(false)),
                    _ => Err(EvalError::TypeMismatch {
                        op: "includes",
                        left: type_name(&haystack),
                        right: type_name(&needle),
                    }),
                }
            }
            Expr::Not { expression } => Ok(Value::Bool(!expression.evaluate_bool(answers)?)),
            Expr::Neg { expression } => match expression.evaluate(answers)? {
                Value::Number(number) => number_value(-as_f64(&number)),
                other => Err(EvalError::UnsupportedOperand {
                    op: "-",
                    operand: type_name(&other),
                }),
            },
            Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, answers),
        }
    }

    pub fn evaluate_bool(&self, answers: &AnswerMap) -> Result<bool, EvalError> {
        self.evaluate(answers).map(|value| truthy(&value))
    }
}

fn evaluate_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    answers: &AnswerMap,
) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            if !left.evaluate_bool(answers)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(right.evaluate_bool(answers)?))
        }
        BinaryOp::Or => {
            if left.evaluate_bool(answers)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(right.evaluate_bool(answers)?))
        }
        _ => {
            let left = left.evaluate(answers)?;
            let right = right.evaluate(answers)?;
            match op {
                BinaryOp::Eq => Ok(Value::Bool(loose_eq(&left, &right))),
                BinaryOp::Ne => Ok(Value::Bool(!loose_eq(&left, &right))),
                BinaryOp::StrictEq => Ok(Value::Bool(strict_eq(&left, &right))),
                BinaryOp::StrictNe => Ok(Value::Bool(!strict_eq(&left, &right))),
                BinaryOp::Lt => compare(&left, &right, "<", Ordering::is_lt),
                BinaryOp::Lte => compare(&left, &right, "<=", Ordering::is_le),
                BinaryOp::Gt => compare(&left, &right, ">", Ordering::is_gt),
                BinaryOp::Gte => compare(&left, &right, ">=", Ordering::is_ge),
                BinaryOp::Add => add(&left, &right),
                BinaryOp::Sub => arithmetic(&left, &right, "-", |a, b| a - b),
                BinaryOp::Mul => arithmetic(&left, &right, "*", |a, b| a * b),
                BinaryOp::Div => arithmetic(&left, &right, "/", |a, b| a / b),
                BinaryOp::And => Ok(Value::Bool(truthy(&left) && truthy(&right))),
                BinaryOp::Or => Ok(Value::Bool(truthy(&left) || truthy(&right))),
            }
        }
    }
}

/// JS-style truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => {
            let value = as_f64(number);
            value != 0.0 && !value.is_nan()
        }
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => as_f64(left) == as_f64(right),
        _ => left == right,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    if strict_eq(left, right) {
        return true;
    }
    match (left, right) {
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => text
            .trim()
            .parse::<f64>()
            .is_ok_and(|parsed| parsed == as_f64(number)),
        (Value::Bool(flag), Value::Number(number))
        | (Value::Number(number), Value::Bool(flag)) => {
            as_f64(number) == if *flag { 1.0 } else { 0.0 }
        }
        _ => false,
    }
}

fn compare(
    left: &Value,
    right: &Value,
    op: &'static str,
    predicate: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    // Comparisons against an unanswered field are simply false.
    if left.is_null() || right.is_null() {
        return Ok(Value::Bool(false));
    }
    let ordering = match (left, right) {
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => match (numeric(left), numeric(right)) {
            (Some(left), Some(right)) => left.partial_cmp(&right),
            _ => {
                return Err(EvalError::TypeMismatch {
                    op,
                    left: type_name(left),
                    right: type_name(right),
                });
            }
        },
    };
    Ok(Value::Bool(ordering.is_some_and(predicate)))
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(left), Value::String(right)) => Ok(Value::String(format!("{left}{right}"))),
        _ => arithmetic(left, right, "+", |a, b| a + b),
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    op: &'static str,
    apply: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (numeric(left), numeric(right)) {
        (Some(left), Some(right)) => number_value(apply(left, right)),
        _ => Err(EvalError::TypeMismatch {
            op,
            left: type_name(left),
            right: type_name(right),
        }),
    }
}

/// Numbers, and strings holding a number (free-text numeric inputs).
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => Some(as_f64(number)),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

fn number_value(value: f64) -> Result<Value, EvalError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or(EvalError::NonFinite)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lookup(answers: &AnswerMap, path: &[String]) -> Result<Value, EvalError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(Value::Object(answers.clone()));
    };
    let missing = |depth: usize| EvalError::MissingReference {
        path: format!("answers.{}", path[..depth].join(".")),
    };

    let mut current = match answers.get(first) {
        Some(value) => value,
        None if rest.is_empty() => return Ok(Value::Null),
        None => return Err(missing(2)),
    };

    for (idx, segment) in rest.iter().enumerate() {
        let depth = idx + 2;
        let is_last = idx + 1 == rest.len();
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) if segment == "length" => {
                return if is_last {
                    Ok(Value::from(items.len()))
                } else {
                    Err(missing(depth + 1))
                };
            }
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            Value::String(text) if segment == "length" => {
                return if is_last {
                    Ok(Value::from(text.chars().count()))
                } else {
                    Err(missing(depth + 1))
                };
            }
            Value::Null => return Err(missing(depth)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None if is_last => return Ok(Value::Null),
            None => return Err(missing(depth + 1)),
        }
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> AnswerMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn eval(source: &str, value: Value) -> Result<bool, EvalError> {
        Expr::parse(source)
            .expect("expression should parse")
            .evaluate_bool(&answers(value))
    }

    #[test]
    fn equality_against_string_answer() {
        assert_eq!(eval("answers.A == 'x'", json!({ "A": "x" })), Ok(true));
        assert_eq!(eval("answers.A === \"x\"", json!({ "A": "y" })), Ok(false));
        assert_eq!(eval("answers.A != 'x'", json!({})), Ok(true));
    }

    #[test]
    fn missing_leaf_is_null_but_missing_parent_is_an_error() {
        assert_eq!(eval("answers.body == null", json!({})), Ok(true));
        let err = eval("answers.body.height > 100", json!({})).unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingReference {
                path: "answers.body.height".into()
            }
        );
    }

    #[test]
    fn short_circuit_guards_missing_parents() {
        let source = "answers.body && answers.body.height >= 170";
        assert_eq!(eval(source, json!({})), Ok(false));
        assert_eq!(eval(source, json!({ "body": { "height": 180 } })), Ok(true));
    }

    #[test]
    fn includes_and_length_on_multi_choice() {
        let value = json!({ "goals": ["sleep", "stress"] });
        assert_eq!(eval("answers.goals.includes('sleep')", value.clone()), Ok(true));
        assert_eq!(eval("answers.goals.length > 2", value.clone()), Ok(false));
        assert_eq!(eval("answers['goals'][1] === 'stress'", value), Ok(true));
        assert_eq!(eval("answers.goals.includes('sleep')", json!({})), Ok(false));
    }

    #[test]
    fn numeric_strings_compare_numerically() {
        assert_eq!(eval("answers.age >= 18", json!({ "age": "21" })), Ok(true));
        assert_eq!(eval("answers.age == 21", json!({ "age": "21" })), Ok(true));
        assert_eq!(eval("answers.age === 21", json!({ "age": "21" })), Ok(false));
        assert_eq!(eval("answers.age < 18", json!({})), Ok(false));
    }

    #[test]
    fn arithmetic_computes_values() {
        let expr = Expr::parse(
            "answers.body.weight_kg / ((answers.body.height_cm / 100) * (answers.body.height_cm / 100))",
        )
        .unwrap();
        let value = expr
            .evaluate(&answers(json!({ "body": { "weight_kg": 81, "height_cm": 180 } })))
            .unwrap();
        let bmi = value.as_f64().unwrap();
        assert!((bmi - 25.0).abs() < 0.01);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = Expr::parse("answers.a / answers.b").unwrap();
        let err = expr
            .evaluate(&answers(json!({ "a": 1, "b": 0 })))
            .unwrap_err();
        assert_eq!(err, EvalError::NonFinite);
    }

    #[test]
    fn parsed_tree_serializes_with_kind_tags() {
        let expr = Expr::parse("answers.A === 'x'").unwrap();
        let tree = serde_json::to_value(&expr).unwrap();
        assert_eq!(
            tree,
            json!({
                "kind": "binary",
                "op": "strict_eq",
                "left": { "kind": "answer", "path": ["A"] },
                "right": { "kind": "literal", "value": "x" }
            })
        );
    }

    #[test]
    fn truthiness_follows_js_rules() {
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!("no")));
        assert_eq!(eval("!answers.smoker", json!({ "smoker": false })), Ok(true));
    }
}
