use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use quiz_engine::collab::{DocumentStore, MemoryDocumentStore, TracingAnalytics, WriteMode, draft_path};
use quiz_engine::{EngineConfig, EngineError, EngineServices, QuizController, QuizStatus};
use quiz_spec::validate::{boolean, numeric};
use quiz_spec::{AnswerMap, AnswerShape, Draft, IntakeRecord, Question, QuizConfig, computed_values};
use serde_json::{Map, Number, Value};

use crate::cmd::{Seed, load_quiz, load_seed, write_json};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "config.json")]
    pub config: PathBuf,
    /// Resume from a saved draft or prefill from an answer map
    #[arg(long, value_name = "answers.json")]
    pub answers: Option<PathBuf>,
    /// Question to start on, if visible
    #[arg(long, value_name = "QUESTION_ID")]
    pub start: Option<String>,
    #[arg(long, value_name = "USER_ID", default_value = "local-user")]
    pub user: String,
    /// Where the intake record (or the draft, after :quit) is written
    #[arg(long, value_name = "out.json")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Submitted(IntakeRecord),
    Saved(Draft),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Back,
    Skip,
    Jump(&'a str),
    Quit,
    Unknown(&'a str),
}

pub fn run(args: RunArgs, locale: Option<String>, settings: EngineConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let outcome = run_session(&args, locale, settings, stdin.lock(), &mut stdout)?;
    match &outcome {
        RunOutcome::Submitted(record) => write_json(record, args.out.as_deref(), &mut stdout),
        RunOutcome::Saved(draft) => {
            writeln!(stdout, "Progress saved. Resume with --answers.")?;
            write_json(draft, args.out.as_deref(), &mut stdout)
        }
    }
}

/// Runs one session reading answers line by line from `input`.
pub fn run_session<R: BufRead, W: Write>(
    args: &RunArgs,
    locale: Option<String>,
    settings: EngineConfig,
    input: R,
    output: &mut W,
) -> Result<RunOutcome> {
    let config = Arc::new(load_quiz(&args.config)?);
    let seed = args.answers.as_deref().map(load_seed).transpose()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(drive(args, config, seed, locale, settings, input, output))
}

async fn drive<R: BufRead, W: Write>(
    args: &RunArgs,
    config: Arc<QuizConfig>,
    seed: Option<Seed>,
    locale: Option<String>,
    settings: EngineConfig,
    mut input: R,
    output: &mut W,
) -> Result<RunOutcome> {
    let store = Arc::new(MemoryDocumentStore::new());
    let services = EngineServices::new(Arc::new(TracingAnalytics), store.clone());
    let prefix = settings.prefix().to_string();
    let mut quiz = QuizController::new(Arc::clone(&config), services, settings);
    if let Some(locale) = locale {
        quiz = quiz.with_locale(locale);
    }

    let start = args.start.as_deref();
    match seed {
        Some(Seed::Draft(draft)) => {
            let value = serde_json::to_value(&draft).context("failed to encode draft")?;
            store
                .write(&draft_path(&prefix, &args.user, &config.id), value, WriteMode::Replace)
                .await?;
            if !quiz.resume(&args.user, start).await? {
                writeln!(output, "Saved draft is for another quiz; starting over.")?;
            }
        }
        Some(Seed::Answers(answers)) => quiz.initialize(answers, start)?,
        None => quiz.initialize(AnswerMap::new(), start)?,
    }

    let mut section_shown: Option<String> = None;
    loop {
        if quiz.state().status() == QuizStatus::Completed {
            let record = quiz.submit(&args.user).await?;
            writeln!(output, "All done, thank you!")?;
            return Ok(RunOutcome::Submitted(record));
        }
        let question = quiz
            .state()
            .current_question()
            .cloned()
            .ok_or_else(|| anyhow!("session is in progress without a current question"))?;

        if section_shown.as_deref() != Some(question.section.as_str()) {
            if let Some(section) = quiz.state().current_section() {
                let title = section.title.resolve(quiz.locale(), config.default_locale.as_deref());
                if !title.is_empty() {
                    writeln!(output, "\n== {title} ==")?;
                }
            }
            section_shown = Some(question.section.clone());
        }
        prompt(&quiz, &question, output)?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return save_and_quit(&mut quiz, &args.user).await;
        }
        let line = line.trim();

        match parse_command(line) {
            Some(Command::Quit) => return save_and_quit(&mut quiz, &args.user).await,
            Some(Command::Back) => {
                quiz.previous()?;
                continue;
            }
            Some(Command::Skip) => {
                if quiz.can_skip() {
                    quiz.next(true)?;
                } else {
                    writeln!(output, "! this question cannot be skipped")?;
                }
                continue;
            }
            Some(Command::Jump(id)) => {
                match quiz.jump_to(id) {
                    Ok(true) => {}
                    Ok(false) => writeln!(output, "! '{id}' is not available right now")?,
                    Err(EngineError::UnknownQuestion(_)) => {
                        writeln!(output, "! unknown question '{id}'")?
                    }
                    Err(err) => return Err(err.into()),
                }
                continue;
            }
            Some(Command::Unknown(other)) => {
                writeln!(output, "! unknown command '{other}' (try :back, :skip, :jump <id>, :quit)")?;
                continue;
            }
            None => {}
        }

        if !line.is_empty() && !question.kind.is_presentational() {
            match parse_answer(&question, line) {
                Ok(value) => quiz.answer(&question.id, value)?,
                Err(err) => {
                    writeln!(output, "! {err}")?;
                    continue;
                }
            }
        }
        let step = quiz.next(false)?;
        if !step.ok {
            writeln!(output, "! {}", step.message.unwrap_or_default())?;
        }
    }
}

async fn save_and_quit(quiz: &mut QuizController, user_id: &str) -> Result<RunOutcome> {
    quiz.save_draft(user_id).await?;
    Ok(RunOutcome::Saved(quiz.state().draft()))
}

fn prompt<W: Write>(quiz: &QuizController, question: &Question, output: &mut W) -> Result<()> {
    let locale = quiz.locale();
    let default_locale = quiz.state().config().default_locale.as_deref();
    let label = question.label.resolve(locale, default_locale);
    let progress = quiz.state().progress();
    writeln!(output, "[{}/{}] {label}", progress.answered, progress.total)?;

    if let Some(description) = &question.description {
        writeln!(output, "    {}", description.resolve(locale, default_locale))?;
    }
    for (idx, option) in question.options.iter().enumerate() {
        let text = option.label.resolve(locale, default_locale);
        writeln!(output, "  {}) {text} [{}]", idx + 1, option.value)?;
    }
    if question.compute.is_some()
        && let Some(value) = computed_values(quiz.state().config(), quiz.state().answers()).get(&question.id)
    {
        writeln!(output, "    = {}", format_computed(value))?;
    }

    let current = quiz
        .state()
        .answer(&question.id)
        .filter(|value| quiz_spec::is_present(value));
    let hint = question
        .hint
        .as_ref()
        .map(|hint| hint.resolve(locale, default_locale).to_string());
    match (question.kind.is_presentational(), current, hint) {
        (true, _, _) => write!(output, "(enter to continue) ")?,
        (false, Some(value), _) => write!(output, "[{value}] > ")?,
        (false, None, Some(hint)) if !hint.is_empty() => write!(output, "({hint}) > ")?,
        (false, None, _) => write!(output, "> ")?,
    }
    output.flush()?;
    Ok(())
}

fn format_computed(value: &Value) -> String {
    match value.as_f64() {
        Some(number) if value.is_f64() => format!("{number:.1}"),
        _ => value.to_string(),
    }
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let rest = line.strip_prefix(':')?;
    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    Some(match (name, argument) {
        ("back" | "b", _) => Command::Back,
        ("skip" | "s", _) => Command::Skip,
        ("quit" | "q", _) => Command::Quit,
        ("jump" | "j", id) if !id.is_empty() => Command::Jump(id),
        _ => Command::Unknown(line),
    })
}

/// Turns a typed line into an answer of the question's shape. Values the
/// validator should judge (unknown options, out-of-range numbers) pass through.
fn parse_answer(question: &Question, raw: &str) -> Result<Value> {
    let choice = |token: &str| -> Value {
        let token = token.trim();
        token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| question.options.get(idx))
            .map(|option| Value::String(option.value.clone()))
            .unwrap_or_else(|| Value::String(token.to_string()))
    };

    Ok(match question.kind.answer_shape() {
        AnswerShape::Choice | AnswerShape::Unit => choice(raw),
        AnswerShape::Choices => Value::Array(
            raw.split(',')
                .filter(|token| !token.trim().is_empty())
                .map(choice)
                .collect(),
        ),
        AnswerShape::Number => number(raw),
        AnswerShape::Boolean => {
            let text = Value::String(raw.to_string());
            boolean(&text).map(Value::Bool).unwrap_or(text)
        }
        AnswerShape::Measurements => measurements(raw)?,
        AnswerShape::Text | AnswerShape::Date => Value::String(raw.to_string()),
        AnswerShape::None => Value::Null,
    })
}

fn number(raw: &str) -> Value {
    let text = Value::String(raw.to_string());
    match numeric(&text) {
        Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::from(n as i64),
        Some(n) => Number::from_f64(n).map(Value::Number).unwrap_or(text),
        None => text,
    }
}

/// `170 65`, or `height_cm=170 weight_kg=65`.
fn measurements(raw: &str) -> Result<Value> {
    let tokens: Vec<&str> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect();
    let mut fields = Map::new();
    if tokens.iter().all(|token| !token.contains('=')) {
        let [height, weight] = tokens.as_slice() else {
            bail!("enter height and weight, e.g. `170 65`");
        };
        fields.insert("height_cm".into(), number(height));
        fields.insert("weight_kg".into(), number(weight));
    } else {
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                bail!("expected key=value, got `{token}`");
            };
            fields.insert(key.trim().to_string(), number(value));
        }
    }
    Ok(Value::Object(fields))
}
