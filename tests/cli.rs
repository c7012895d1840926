//! End-to-end checks of the binary that need no live forge.
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, Output};

fn closed_api_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn run(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let bin = env!("CARGO_BIN_EXE_appsec-rollout");
    Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .env("RUST_LOG", "warn")
        .envs(env.iter().copied())
        .output()
        .expect("run appsec-rollout")
}

#[test]
fn missing_token_fails_fast() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run(dir.path(), &["dispatch"], &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GH_TOKEN or GITHUB_TOKEN"), "stderr: {stderr}");
    assert!(!dir.path().join("scan_results.json").exists());
}

#[test]
fn onboard_requires_repository_selection() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run(dir.path(), &["onboard"], &[("GH_TOKEN", "test-token")]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("REPO_NAMES"), "stderr: {stderr}");
}

#[test]
fn unreachable_forge_is_recorded_per_dispatch_target() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("schedule_list.json"),
        r#"[{"repo_name": "org/a", "branch": "main"}]"#,
    )
    .expect("write schedule");
    std::fs::write(
        dir.path().join("scan_results.json"),
        r#"{"org/old@main": {"status": "success"}}"#,
    )
    .expect("seed results");

    let api_url = closed_api_url();
    let output = run(
        dir.path(),
        &["--api-url", &api_url, "dispatch"],
        &[("GITHUB_TOKEN", "test-token")],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("| `org/a` | `main` | ❌ Failed |"), "stdout: {stdout}");

    let saved: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("scan_results.json")).expect("read results"),
    )
    .expect("parse results");
    assert_eq!(saved["org/old@main"]["status"], "success");
    assert_eq!(saved["org/a@main"]["status"], "failed");
    assert!(saved["org/a@main"]["error"].is_string());
}

#[test]
fn unreachable_forge_is_recorded_per_repository() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("appsec.yaml"), "name: AppSec\n").expect("write workflow");
    std::fs::write(dir.path().join("pr_description.md"), "Adds AppSec.\n").expect("write body");
    let summary_path = dir.path().join("summary.md");

    let api_url = closed_api_url();
    let output = run(
        dir.path(),
        &["--api-url", &api_url, "onboard"],
        &[
            ("GH_TOKEN", "test-token"),
            ("REPO_NAMES", "org/a, org/b"),
            ("GITHUB_STEP_SUMMARY", summary_path.to_str().expect("utf-8 path")),
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let summary = std::fs::read_to_string(&summary_path).expect("read summary");
    let rows: Vec<&str> = summary.lines().filter(|line| line.starts_with("| `")).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("| `org/a` | - | ❌ Exception |"));
    assert!(rows[1].contains("resolve default branch of org/b"));
}

#[test]
fn all_selector_requires_organization() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("appsec.yaml"), "name: AppSec\n").expect("write workflow");
    std::fs::write(dir.path().join("pr_description.md"), "Adds AppSec.\n").expect("write body");

    let api_url = closed_api_url();
    let output = run(
        dir.path(),
        &["--api-url", &api_url, "onboard", "--repos", "all"],
        &[("GH_TOKEN", "test-token")],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("APPSEC_ORG"), "stderr: {stderr}");
}
