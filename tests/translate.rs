use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const KEY_VAR: &str = "CURATE_IT_API_KEY";

fn workspace() -> Result<tempfile::TempDir, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("curate.toml"),
        format!(
            "[paths]\nlocales_dir = '{}/locales'\n\n[translation]\napi_key_env = '{KEY_VAR}'\n",
            dir.path().display()
        ),
    )?;
    fs::create_dir_all(dir.path().join("locales/de"))?;
    fs::write(dir.path().join("locales/de/kultur.json"), r#"{"title": "Kultur"}"#)?;
    Ok(dir)
}

#[test]
fn missing_api_key_exits_before_any_work() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace()?;
    Command::cargo_bin("curate")?
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove(KEY_VAR)
        .args(["translate", "kultur.json", "fr"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "environment variable {KEY_VAR} is not set"
        )));
    assert!(!dir.path().join("locales/fr").exists());
    Ok(())
}

#[test]
fn unknown_language_lists_available_codes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace()?;
    Command::cargo_bin("curate")?
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env(KEY_VAR, "sk-test")
        .args(["translate", "kultur.json", "xx"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("unknown language code 'xx'")
                .and(predicate::str::contains("ka"))
                .and(predicate::str::contains("zh")),
        );
    Ok(())
}

#[test]
fn missing_document_argument_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("curate")?
        .env("NO_COLOR", "1")
        .arg("translate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn document_outside_locales_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("curate")?
        .env("NO_COLOR", "1")
        .args(["translate", "../secrets.json"])
        .assert()
        .code(1);
    Ok(())
}

#[test]
fn help_exits_successfully() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("curate")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("translate"));
    Ok(())
}
