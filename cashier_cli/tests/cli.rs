use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's configuration and data
fn cashier(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cashier").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env(
            "CASHIER_DATABASE__PATH",
            config_home.path().join("cashier.db"),
        )
        .env_remove("CASHIER_STRIPE__API_KEY")
        .env_remove("CASHIER_RECONCILE__CHUNK_SIZE")
        .env_remove("CASHIER_RECONCILE__EMPTY_ONLY");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("cashier").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_zero_chunk_size_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["update-subscription-status", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("positive integer"));
}

#[test]
fn test_negative_chunk_size_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["update-subscription-status", "-5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("positive integer"));
}

#[test]
fn test_empty_only_must_be_a_boolean() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["update-subscription-status", "10", "maybe"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a boolean"));
}

#[test]
fn test_reconcile_without_api_key_fails_before_running() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["update-subscription-status", "10", "no"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"))
        .stdout(predicate::str::contains("Processing chunk").not());

    assert!(!home.path().join("cashier.db").exists());
}

#[test]
fn test_subscribe_requires_a_plan() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["subscribe", "--owner", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--plan"));
}

#[test]
fn test_subscribe_rejects_trial_days_with_skip_trial() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args([
            "subscribe",
            "--owner",
            "1",
            "--plan",
            "gold",
            "--trial-days",
            "14",
            "--skip-trial",
        ])
        .assert()
        .code(2);
}

#[test]
fn test_config_set_get_and_list() {
    let home = TempDir::new().unwrap();

    cashier(&home)
        .args(["config", "set", "reconcile.chunk_size", "50"])
        .assert()
        .success();

    cashier(&home)
        .args(["config", "get", "reconcile.chunk_size"])
        .assert()
        .success()
        .stdout(predicate::str::diff("50\n"));

    cashier(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("chunk_size = 50"))
        .stderr(predicate::str::contains("empty_only = true"));

    assert!(home.path().join("cashier").join("config.toml").exists());
}

#[test]
fn test_config_set_rejects_invalid_values() {
    let home = TempDir::new().unwrap();

    cashier(&home)
        .args(["config", "set", "reconcile.chunk_size", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("chunk_size"));

    cashier(&home)
        .args(["config", "set", "stripe.api_key", "pk_test_123"])
        .assert()
        .code(2);
}

#[test]
fn test_environment_overrides_config_file() {
    let home = TempDir::new().unwrap();

    cashier(&home)
        .args(["config", "set", "reconcile.chunk_size", "50"])
        .assert()
        .success();

    cashier(&home)
        .env("CASHIER_RECONCILE__CHUNK_SIZE", "7")
        .args(["config", "get", "reconcile.chunk_size"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));
}

#[test]
fn test_completions() {
    let mut cmd = Command::cargo_bin("cashier").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("update-subscription-status"));
}

#[test]
fn test_customer_add_registers_owner() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["customer", "add", "--email", "taylor@example.com", "--tax", "20"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));

    cashier(&home)
        .args(["customer", "add", "--name", "Jordan"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));

    assert!(home.path().join("cashier.db").exists());
}

#[test]
fn test_customer_add_rejects_invalid_tax() {
    let home = TempDir::new().unwrap();
    cashier(&home)
        .args(["customer", "add", "--tax", "150"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("between 0 and 100"));

    assert!(!home.path().join("cashier.db").exists());
}
