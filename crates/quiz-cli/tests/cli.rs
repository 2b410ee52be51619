use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn quiz() -> Command {
    let mut cmd = Command::cargo_bin("quiz").expect("quiz binary");
    cmd.env_remove("QUIZ_LOG").env_remove("QUIZ_AUTOSAVE_MS");
    cmd
}

fn settings(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "storage_prefix = \"users\"\n").expect("write settings");
    path
}

#[test]
fn check_reports_fixture_shape() {
    quiz()
        .arg("check")
        .arg(fixture("wellness_intake.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "wellness-intake 2.1.0: 3 section(s), 11 question(s), 8 visible at start",
        ));
}

#[test]
fn check_strict_fails_on_warnings() {
    quiz()
        .arg("check")
        .arg(fixture("lint_warnings.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("warning[no_options]: goal"))
        .stderr(predicate::str::contains("warning[show_if_syntax]: detail"));

    quiz()
        .args(["check", "--strict"])
        .arg(fixture("lint_warnings.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 warning(s) treated as errors"));
}

#[test]
fn check_rejects_duplicate_ids() {
    quiz()
        .arg("check")
        .arg(fixture("duplicate_ids.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate question id 'age'"));
}

#[test]
fn check_json_output_parses() {
    let output = quiz()
        .args(["check", "--json"])
        .arg(fixture("wellness_intake.json"))
        .output()
        .expect("run check");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["questions"], 11);
    assert_eq!(report["warnings"], serde_json::json!([]));
}

#[test]
fn schema_describes_config() {
    quiz()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"questions\""))
        .stdout(predicate::str::contains("\"show_if\""));
}

#[test]
fn summary_uses_locale_and_branching() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let answers = dir.path().join("answers.json");
    fs::write(
        &answers,
        r#"{ "name": "Ada", "primary_goal": "weight", "target_weight": 62, "sleep_hours": 8, "smoker": false }"#,
    )
    .expect("write answers");

    quiz()
        .args(["--locale", "es", "summary"])
        .arg(fixture("wellness_intake.json"))
        .arg("--answers")
        .arg(&answers)
        .arg("--settings")
        .arg(settings(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Nombre: Ada"))
        .stdout(predicate::str::contains("Perder peso"))
        .stdout(predicate::str::contains("Target weight (kg): 62"))
        .stdout(predicate::str::contains("Do you smoke?: No"))
        .stdout(predicate::str::contains("Hours of sleep").not());
}

#[test]
fn run_completes_and_writes_intake_record() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let out = dir.path().join("intake.json");
    let script = [
        "Ada",
        "1990-02-28",
        "180 81",
        "",
        "2",
        "7.25",
        "7.5",
        "no",
        "",
        ":skip",
    ]
    .join("\n");

    quiz()
        .arg("run")
        .arg(fixture("wellness_intake.json"))
        .args(["--user", "u-7", "--out"])
        .arg(&out)
        .arg("--settings")
        .arg(settings(dir.path()))
        .write_stdin(format!("{script}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("== About you =="))
        .stdout(predicate::str::contains("must be in steps of 0.5"))
        .stdout(predicate::str::contains("= 25.0"))
        .stdout(predicate::str::contains("All done"));

    let record: Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read record")).expect("record json");
    assert_eq!(record["user_id"], "u-7");
    let ids: Vec<_> = record["answers"]
        .as_array()
        .expect("answers")
        .iter()
        .map(|answer| answer["question_id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        ids,
        ["name", "birth_date", "body", "primary_goal", "sleep_hours", "smoker"]
    );
    assert_eq!(record["answers"][4]["value"], 7.5);
    assert!(record["computed"]["bmi"].as_f64().is_some());
}

#[test]
fn quit_saves_draft_that_resumes() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let draft = dir.path().join("draft.json");
    let record = dir.path().join("intake.json");
    let settings = settings(dir.path());

    quiz()
        .arg("run")
        .arg(fixture("wellness_intake.json"))
        .arg("--out")
        .arg(&draft)
        .arg("--settings")
        .arg(&settings)
        .write_stdin("Ada\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress saved"));

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(&draft).expect("read draft")).expect("draft json");
    assert_eq!(saved["quiz_id"], "wellness-intake");
    assert_eq!(saved["current_question_id"], "birth_date");
    assert_eq!(saved["answers"]["name"], "Ada");

    quiz()
        .arg("run")
        .arg(fixture("wellness_intake.json"))
        .arg("--answers")
        .arg(&draft)
        .arg("--out")
        .arg(&record)
        .arg("--settings")
        .arg(&settings)
        .write_stdin(":jump primary_goal\n3\nyes\n12\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Ada] >").not());

    let submitted: Value =
        serde_json::from_str(&fs::read_to_string(&record).expect("read record")).expect("record json");
    let ids: Vec<_> = submitted["answers"]
        .as_array()
        .expect("answers")
        .iter()
        .map(|answer| answer["question_id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, ["name", "primary_goal", "smoker", "cigarettes"]);
}
