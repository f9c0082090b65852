//! End-to-end tests for the mnemosctl binary
//!
//! Every run gets its own config and state directory and an inference URL
//! nobody listens on, so nothing touches the user's real setup.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn mnemosctl(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mnemosctl"));
    cmd.env("MNEMOS_CONFIG", home.join("config.toml"))
        .env("MNEMOS_STATE_DIR", home.join("state"))
        .env("MNEMOS_INFERENCE_URL", closed_port_url())
        .env("MNEMOS_API_URL", format!("{}/api", closed_port_url()))
        .env("NO_COLOR", "1")
        .env_remove("MNEMOS_LOG")
        .env_remove("MNEMOS_PASSWORD");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    mnemosctl(home).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--version"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("mnemosctl "));
    assert!(text.trim_end().ends_with(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_wrong_feature_count_is_invalid_input() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["analyze-bio", "--features", "0,65,12"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("expected 7 biomarker values, got 3"));
}

#[test]
fn test_unsupported_file_type_is_invalid_input() {
    let home = TempDir::new().unwrap();
    let notes = home.path().join("report.pdf");
    std::fs::write(&notes, b"%PDF").unwrap();

    let output = run(home.path(), &["analyze-image", notes.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unreachable_service_exit_code() {
    let home = TempDir::new().unwrap();

    let output = run(
        home.path(),
        &["analyze-bio", "--features", "0,65,12,2,28,1500,0.8"],
    );
    assert_eq!(output.status.code(), Some(69), "{}", stderr(&output));
    assert!(stderr(&output).contains("Biomarker analysis failed"));

    let output = run(home.path(), &["health"]);
    assert_eq!(output.status.code(), Some(69));
    assert!(stdout(&output).contains("unreachable"));
}

#[test]
fn test_out_of_range_values_warn_but_are_sent() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &["analyze-bio", "--features", "0,65,12,2,45,1500,0.8"],
    );

    // Still attempted: fails on the network, not on validation
    assert_eq!(output.status.code(), Some(69));
    assert!(stderr(&output).contains("MMSE score = 45"));
}

#[test]
fn test_whoami_without_session() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["whoami"]);

    assert_eq!(output.status.code(), Some(77));
    assert!(stderr(&output).contains("mnemosctl login"));
}

#[test]
fn test_login_rejects_bad_credentials_locally() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &["login", "--email", "not-an-email", "--password", "12345"],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(!home.path().join("state").join("session.json").exists());
}

#[test]
fn test_logout_when_signed_out() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["logout"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Not signed in"));
}

#[test]
fn test_config_precedence() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[inference]\nbase_url = \"http://from-file:5001\"\ntimeout_secs = 12\n",
    )
    .unwrap();

    // env beats file
    let output = run(home.path(), &["config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(!text.contains("from-file"));
    assert!(text.contains("timeout_secs = 12"));

    // flag beats env
    let output = run(
        home.path(),
        &["config", "--inference-url", "http://from-flag:5001"],
    );
    assert!(stdout(&output).contains("http://from-flag:5001"));
}

#[test]
fn test_config_init_and_malformed_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("config.toml");

    let output = run(home.path(), &["config", "--init"]);
    assert!(output.status.success());
    assert!(std::fs::read_to_string(&path).unwrap().contains("[inference]"));

    std::fs::write(&path, "[inference\nbase_url = ").unwrap();
    let output = run(home.path(), &["config"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load configuration"));
}

#[test]
fn test_chat_text_only_needs_no_service() {
    let home = TempDir::new().unwrap();
    let mut child = mnemosctl(home.path())
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"what does mmse mean?\n/quit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Hello! I'm here to help"));
    assert!(text.contains("I understand your question"));
}

#[test]
fn test_chat_failure_stays_in_conversation() {
    let home = TempDir::new().unwrap();
    let mut child = mnemosctl(home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"/bio 0,65,12,2,28,1500,0.8\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    // Errors become assistant messages; the session itself succeeds
    assert!(output.status.success());
    assert!(stdout(&output).contains("Sorry"));
}

#[test]
fn test_non_finite_biomarker_is_invalid_input() {
    let home = TempDir::new().unwrap();
    let output = run(
        home.path(),
        &["analyze-bio", "--features", "0,65,12,2,NaN,1500,inf"],
    );

    // Rejected before any request: 2, not the 69 of the closed port
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("mmse must be a finite number"));
}

#[test]
fn test_no_color_output_has_no_escape_codes() {
    let home = TempDir::new().unwrap();
    let mut child = mnemosctl(home.path())
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"hello\n/bio 0,65,12,2,45,1500,0.8\n/attach notes.txt\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(!stdout(&output).contains("\x1b["));

    let output = run(
        home.path(),
        &["analyze-bio", "--features", "0,65,12,2,45,1500,0.8"],
    );
    assert!(!stdout(&output).contains("\x1b["));
    assert!(!stderr(&output).contains("\x1b["));

    let output = run(home.path(), &["health"]);
    assert!(!stdout(&output).contains("\x1b["));
}
