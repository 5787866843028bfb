use assert_cmd::Command;
use predicates::prelude::*;

fn uidrive() -> Command {
    let mut cmd = Command::cargo_bin("uidrive").unwrap();
    // Keep tests hermetic if the environment carries defaults.
    cmd.env_remove("UIDRIVE_PLATFORM")
        .env_remove("UIDRIVE_APP")
        .env_remove("UIDRIVE_SERVER")
        .env_remove("UIDRIVE_LAUNCH_SERVER");
    cmd
}

#[test]
fn help_exits_zero_and_documents_exit_codes() {
    uidrive()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("uidrive"))
        .stdout(predicate::str::contains("Exit codes"))
        .stdout(predicate::str::contains("environment failure"));
}

#[test]
fn missing_required_flags_is_a_usage_error() {
    uidrive()
        .args(["tap", "Login"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--platform"));
}

#[test]
fn unsupported_platform_is_a_usage_error() {
    uidrive()
        .args(["--platform", "windows", "--app", "com.example.app", "page-source"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("windows"));
}

#[test]
fn unknown_action_token_is_a_usage_error() {
    uidrive()
        .args(["--platform", "ios", "--app", "com.example.app", "frobnicate", "Login"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown action 'frobnicate'"));
}

#[test]
fn missing_action_argument_is_a_usage_error() {
    uidrive()
        .args(["--platform", "ios", "--app", "com.example.app", "tap"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires a target identifier"));
}

#[test]
fn non_numeric_wait_is_a_usage_error() {
    uidrive()
        .args(["--platform", "ios", "--app", "com.example.app", "wait", "soon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expects a number"));
}

#[test]
fn unreachable_server_is_an_environment_failure() {
    // Nothing listens on this port; session creation cannot start.
    uidrive()
        .args([
            "--platform",
            "ios",
            "--app",
            "com.example.app",
            "--server",
            "http://127.0.0.1:9",
            "tap",
            "Login",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
}
