use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use quiz_spec::{AnswerMap, SummaryItem, computed_values, summary_items, visible_indices};
use serde::Serialize;

use crate::cmd::{load_quiz, load_seed, write_json};

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[arg(value_name = "config.json")]
    pub config: PathBuf,
    /// Answer map or saved draft
    #[arg(long, value_name = "answers.json")]
    pub answers: PathBuf,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub quiz_id: String,
    /// Ids of the questions the answers lead through, in order.
    pub visible: Vec<String>,
    pub items: Vec<SummaryItem>,
    #[serde(skip_serializing_if = "AnswerMap::is_empty")]
    pub computed: AnswerMap,
}

pub fn build(args: &SummaryArgs, locale: Option<&str>) -> Result<SummaryReport> {
    let config = load_quiz(&args.config)?;
    let seed = load_seed(&args.answers)?;
    let answers = seed.answers();
    let visible = visible_indices(&config, answers)
        .into_iter()
        .filter_map(|idx| config.questions.get(idx))
        .map(|question| question.id.clone())
        .collect();
    Ok(SummaryReport {
        quiz_id: config.id.clone(),
        visible,
        items: summary_items(&config, answers, locale),
        computed: computed_values(&config, answers),
    })
}

pub fn run(args: &SummaryArgs, locale: Option<&str>, writer: &mut impl Write) -> Result<()> {
    let report = build(args, locale)?;
    if args.json {
        return write_json(&report, None, writer);
    }
    writeln!(writer, "{}", report.quiz_id)?;
    writeln!(writer, "path: {}", report.visible.join(" -> "))?;
    for item in &report.items {
        writeln!(writer, "  {}: {}", item.label, item.display)?;
    }
    for (id, value) in &report.computed {
        writeln!(writer, "  {id} = {value}")?;
    }
    Ok(())
}
