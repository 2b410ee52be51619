pub mod check;
pub mod run;
pub mod schema;
pub mod summary;

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use quiz_spec::{AnswerMap, Draft, QuizConfig};
use serde::Serialize;
use serde_json::Value;

/// Starting answers read from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Seed {
    /// A saved session, as written by `quiz run` on `:quit`.
    Draft(Draft),
    Answers(AnswerMap),
}

impl Seed {
    pub fn answers(&self) -> &AnswerMap {
        match self {
            Seed::Draft(draft) => &draft.answers,
            Seed::Answers(answers) => answers,
        }
    }
}

pub fn load_quiz(path: &Path) -> Result<QuizConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz config {}", path.display()))?;
    QuizConfig::from_json_str(&raw)
        .with_context(|| format!("invalid quiz config {}", path.display()))
}

/// Accepts either a draft document or a bare answer map.
pub fn load_seed(path: &Path) -> Result<Seed> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read answers {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("answers file {} is not JSON", path.display()))?;
    let Some(object) = value.as_object() else {
        bail!("answers file {} must contain a JSON object", path.display());
    };
    if object.contains_key("quiz_id") && object.contains_key("answers") {
        let draft = serde_json::from_value(value)
            .with_context(|| format!("draft {} is malformed", path.display()))?;
        return Ok(Seed::Draft(draft));
    }
    Ok(Seed::Answers(object.clone()))
}

/// Pretty JSON to `out`, or to `writer` when no path is given.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>, writer: &mut impl Write) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to encode JSON output")?;
    match out {
        Some(path) => fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => writeln!(writer, "{rendered}").context("failed to write output"),
    }
}
