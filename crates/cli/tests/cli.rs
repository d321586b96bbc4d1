use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("booksearch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("ping"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn unknown_environment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("booksearch")
        .unwrap()
        .env_remove("BOOKSEARCH_ENV")
        .args(["--env", "qa", "--config-dir"])
        .arg(dir.path())
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported environment"));
}

#[test]
fn search_requires_a_prefix() {
    Command::cargo_bin("booksearch")
        .unwrap()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<PREFIX>"));
}
