use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use crate::cmd::{
    self, check::CheckArgs, run::RunArgs, schema::SchemaArgs, summary::SummaryArgs,
};
use crate::{settings, telemetry};

#[derive(Parser, Debug)]
#[command(
    name = "quiz",
    about = "Check, run and review wellness intake quizzes",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Locale for labels and messages (falls back to the quiz default)
    #[arg(long = "locale", value_name = "LOCALE", global = true)]
    locale: Option<String>,

    /// Engine settings file (defaults to the platform config dir)
    #[arg(long = "settings", value_name = "config.toml", global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a quiz config and report structural problems
    Check(CheckArgs),
    /// Answer a quiz in the terminal
    Run(RunArgs),
    /// Show the review screen for a set of answers
    Summary(SummaryArgs),
    /// Print the JSON schema of quiz config documents
    Schema(SchemaArgs),
}

pub fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => {
            let report = cmd::check::run(&args)?;
            cmd::check::emit(&report, args.json)?;
            if args.strict && !report.warnings.is_empty() {
                bail!(
                    "quiz-check: {} warning(s) treated as errors (--strict)",
                    report.warnings.len()
                );
            }
            Ok(())
        }
        Commands::Run(args) => {
            let settings = settings::load(cli.settings.as_deref())?;
            cmd::run::run(args, cli.locale, settings)
        }
        Commands::Summary(args) => {
            let settings = settings::load(cli.settings.as_deref())?;
            let locale = cli.locale.or(settings.default_locale);
            cmd::summary::run(&args, locale.as_deref(), &mut std::io::stdout())
        }
        Commands::Schema(args) => cmd::schema::run(&args),
    }
}
