//! Binary surface tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("research-rs").unwrap();
    for key in [
        "OPENAI_API_KEY",
        "RESEARCH_API_KEY",
        "FIRECRAWL_API_KEY",
        "RESEARCH_SEARCH_API_KEY",
        "RESEARCH_DB_PATH",
        "RESEARCH_PROMPT_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_lists_commands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("research"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn version_prints_package_version() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn init_prompts_writes_templates() {
    let dir = tempfile::tempdir().unwrap();
    bin()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 7 prompt template(s)"));
    assert!(dir.path().join("planner.md").exists());
    assert!(dir.path().join("report.md").exists());

    bin()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn research_without_api_key_fails() {
    bin()
        .args(["research", "best rust web frameworks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn research_rejects_unknown_speed() {
    bin()
        .args(["research", "q", "--speed", "warp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("warp"));
}

#[test]
fn research_rejects_malformed_clarification() {
    bin()
        .args(["research", "q", "--clarify", "no-separator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QUESTION=ANSWER"));
}

#[test]
fn plan_rejects_empty_query() {
    bin()
        .args(["plan", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Query cannot be empty"));
}

#[cfg(feature = "store")]
#[test]
fn reports_list_on_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("reports.db");
    bin()
        .arg("--db-path")
        .arg(&db)
        .args(["reports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved reports."));

    bin()
        .arg("--db-path")
        .arg(&db)
        .args(["--format", "json", "reports", "show", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("report not found: 1"));
}
