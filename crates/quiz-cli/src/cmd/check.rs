use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use quiz_spec::ConfigWarning;
use serde::Serialize;

use crate::cmd::load_quiz;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Quiz config document
    #[arg(value_name = "config.json")]
    pub config: PathBuf,
    /// Treat lint warnings as errors
    #[arg(long)]
    pub strict: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub quiz_id: String,
    pub version: String,
    pub sections: usize,
    pub questions: usize,
    /// Questions shown before any answer is given.
    pub initially_visible: usize,
    pub warnings: Vec<ConfigWarning>,
}

pub fn run(args: &CheckArgs) -> Result<CheckReport> {
    let config = load_quiz(&args.config)?;
    let initially_visible = quiz_spec::visible_indices(&config, &Default::default()).len();
    Ok(CheckReport {
        quiz_id: config.id.clone(),
        version: config.version.clone(),
        sections: config.sections.len(),
        questions: config.questions.len(),
        initially_visible,
        warnings: config.lint(),
    })
}

pub fn emit(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        return crate::cmd::write_json(report, None, &mut std::io::stdout());
    }
    println!(
        "{} {}: {} section(s), {} question(s), {} visible at start",
        report.quiz_id, report.version, report.sections, report.questions, report.initially_visible
    );
    emit_warnings(&report.warnings);
    Ok(())
}

pub fn emit_warnings(warnings: &[ConfigWarning]) {
    for warning in warnings {
        eprintln!(
            "warning[{}]: {}: {}",
            warning.code, warning.question_id, warning.message
        );
    }
}
