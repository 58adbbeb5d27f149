//! Integration tests for the `site-mirror` executable
//!
//! These run the built binary against a wiremock server and check its exit
//! status and log output.

use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PATH: &str = "/Home-0123456789abcdef0123456789abcdef";

async fn run_binary(seed: &str, site_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_site-mirror"))
        .arg(seed)
        .arg("--output")
        .arg(site_dir)
        .env_remove("MIRROR_SEED_URL")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .await
        .expect("Failed to run site-mirror")
}

fn warn_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .chain(String::from_utf8_lossy(&output.stderr).lines())
        .filter(|line| line.contains("WARN"))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_failed_seed_exits_successfully() {
    let mock_server = MockServer::start().await;
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let seed = format!("{}{}", mock_server.uri(), HOME_PATH);
    let output = run_binary(&seed, site.path()).await;

    assert!(
        output.status.success(),
        "exit status {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let warnings = warn_lines(&output);
    assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
    assert!(warnings[0].contains(HOME_PATH));

    let pages = std::fs::read_dir(site.path())
        .expect("Failed to read site dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".html"))
        .count();
    assert_eq!(pages, 0);
}

#[tokio::test]
async fn test_invalid_seed_exits_with_failure() {
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    let output = run_binary("ftp://example.com/file", site.path()).await;

    assert!(!output.status.success());
}
