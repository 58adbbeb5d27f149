//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full mirror cycle end-to-end through the built-in HTTP renderer.

use site_mirror::config::Config;
use site_mirror::crawler::{asset_filename, run_crawl};
use site_mirror::output::{SCRIPT_ID, STYLE_ID};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PATH: &str = "/Home-0123456789abcdef0123456789abcdef";
const SECOND_PATH: &str = "/Second-Page-fedcba9876543210fedcba9876543210";

/// Creates a test configuration mirroring `seed` into `site_dir`
fn create_test_config(seed: String, site_dir: &Path) -> Config {
    let mut config = Config::with_seed(seed);
    config.crawler.page_timeout_ms = 5_000;
    config.crawler.marker_timeout_ms = 100;
    config.crawler.asset_timeout_ms = 5_000;
    config.output.site_dir = site_dir.to_path_buf();
    config
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{}</title></head><body><main>{}</main></body></html>",
        title, body
    )
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Lists the `.html` files in the site directory, sorted
fn html_files(site_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = std::fs::read_dir(site_dir)
        .expect("Failed to read site dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".html"))
        .collect();
    files.sort();
    files
}

fn asset_files(site_dir: &Path) -> Vec<String> {
    std::fs::read_dir(site_dir.join("assets"))
        .expect("Failed to read assets dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect()
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_internal_and_external_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    mount_page(
        &mock_server,
        HOME_PATH,
        html_page(
            "Home",
            &format!(
                r#"<p><a href="{}">Go to the next page</a></p>
                <p><a href="https://external.example.org/docs">External docs</a></p>"#,
                SECOND_PATH
            ),
        ),
    )
    .await;
    mount_page(
        &mock_server,
        SECOND_PATH,
        html_page("Second Page", r#"<p>Leaf content</p>"#),
    )
    .await;

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(summary.pages_persisted(), 2);
    assert_eq!(html_files(site.path()), vec!["home.html", "second-page.html"]);

    let home = std::fs::read_to_string(site.path().join("home.html")).unwrap();

    // The provisional guess from the link text is corrected by the fixup pass
    assert!(
        home.contains(r#"<a href="second-page.html">Go to the next page</a>"#),
        "internal link not rewritten: {}",
        home
    );
    assert!(!home.contains("go-to-the-next-page.html"));
    assert!(!home.contains("data-mirror-href"));

    assert!(home.contains(
        r#"<a href="https://external.example.org/docs" target="_blank" rel="noopener noreferrer">External docs</a>"#
    ));

    assert_eq!(home.matches(STYLE_ID).count(), 1);
    assert_eq!(home.matches(SCRIPT_ID).count(), 1);

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(site.path().join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["pages"].as_array().unwrap().len(), 2);
    assert_eq!(manifest["target_host"], "127.0.0.1");
}

#[tokio::test]
async fn test_duplicate_images_share_one_asset() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    mount_page(
        &mock_server,
        HOME_PATH,
        html_page(
            "Gallery",
            &format!(
                r#"<img src="/img/logo.png" alt="one"><img src="{}/img/logo.png" alt="two">"#,
                base_url
            ),
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl failed");

    let expected = asset_filename(&format!("{}/img/logo.png", base_url));
    assert_eq!(asset_files(site.path()), vec![expected.clone()]);
    assert_eq!(summary.assets_downloaded, 1);

    let gallery = std::fs::read_to_string(site.path().join("gallery.html")).unwrap();
    let local_src = format!(r#"src="assets/{}""#, expected);
    assert_eq!(gallery.matches(&local_src).count(), 2);
}

#[tokio::test]
async fn test_assets_not_refetched_across_runs() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    mount_page(
        &mock_server,
        HOME_PATH,
        html_page("Home", r#"<img src="/img/photo.jpg">"#),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/img/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let seed = format!("{}{}", base_url, HOME_PATH);
    let first = run_crawl(create_test_config(seed.clone(), site.path()))
        .await
        .expect("First crawl failed");
    let second = run_crawl(create_test_config(seed, site.path()))
        .await
        .expect("Second crawl failed");

    assert_eq!(first.assets_downloaded, 1);
    assert_eq!(second.assets_downloaded, 0);
    assert_eq!(asset_files(site.path()).len(), 1);
}

#[tokio::test]
async fn test_failed_asset_leaves_image_unresolved() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    mount_page(
        &mock_server,
        HOME_PATH,
        html_page("Home", r#"<img src="/img/broken.png"><img src="/img/ok.gif">"#),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/ok.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"GIF89a".to_vec()))
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(summary.pages_persisted(), 1);
    assert_eq!(summary.assets_failed, 1);

    let home = std::fs::read_to_string(site.path().join("home.html")).unwrap();
    assert!(home.contains(r#"<img src="/img/broken.png">"#));
    assert!(home.contains(&format!(
        r#"src="assets/{}""#,
        asset_filename(&format!("{}/img/ok.gif", base_url))
    )));
}

#[tokio::test]
async fn test_failed_seed_persists_nothing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl should not fail");

    assert_eq!(summary.pages_persisted(), 0);
    assert_eq!(summary.pages_skipped(), 1);
    assert!(html_files(site.path()).is_empty());
}

#[tokio::test]
async fn test_failed_seed_logs_one_warning() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("site_mirror=warn"))
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl should not fail");

    let output = logs.contents();
    let warnings: Vec<&str> = output.lines().filter(|line| line.contains("WARN")).collect();
    assert_eq!(warnings.len(), 1, "log output: {}", output);
    assert!(warnings[0].contains(HOME_PATH));
    assert!(warnings[0].contains("404"));
    assert_eq!(summary.pages_skipped(), 1);
}

#[tokio::test]
async fn test_navigation_timeout_skips_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path(HOME_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Slow", "<p>late</p>"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let seed = format!("{}{}", base_url, HOME_PATH);
    let mut config = create_test_config(seed.clone(), site.path());
    config.crawler.page_timeout_ms = 200;
    let summary = run_crawl(config).await.expect("Crawl should not fail");

    assert_eq!(summary.pages_persisted(), 0);
    assert_eq!(summary.skipped, vec![seed]);
    assert!(html_files(site.path()).is_empty());
}

#[tokio::test]
async fn test_markup_inside_attributes_and_comments() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    mount_page(
        &mock_server,
        HOME_PATH,
        html_page(
            "Home",
            &format!(
                r#"<a href="https://other.org/x" title="a > b">Other</a>
                <img src="/img/cmp.png" alt="1 > 0">
                <!-- <a href="{}">Old link</a> -->"#,
                SECOND_PATH
            ),
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/img/cmp.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(SECOND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Second", "")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    let summary = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(summary.pages_persisted(), 1);
    let home = std::fs::read_to_string(site.path().join("home.html")).unwrap();
    assert!(home.contains(
        r#"<a href="https://other.org/x" title="a > b" target="_blank" rel="noopener noreferrer">Other</a>"#
    ));
    assert!(home.contains(&format!(
        r#"<img src="assets/{}" alt="1 > 0">"#,
        asset_filename(&format!("{}/img/cmp.png", base_url))
    )));
    assert!(!home.contains(r#" b">"#));
}

#[tokio::test]
async fn test_page_cap_stops_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let site = tempfile::tempdir().expect("Failed to create temp dir");

    let links: String = (1..=5)
        .map(|n| format!(r#"<a href="/Child-{0:032x}">Child {0}</a>"#, n))
        .collect();
    mount_page(&mock_server, HOME_PATH, html_page("Home", &links)).await;

    for n in 1..=5 {
        mount_page(
            &mock_server,
            &format!("/Child-{:032x}", n),
            html_page(&format!("Child {}", n), "<p>leaf</p>"),
        )
        .await;
    }

    let mut config = create_test_config(format!("{}{}", base_url, HOME_PATH), site.path());
    config.crawler.max_pages = 3;
    let summary = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(summary.pages_persisted(), 3);
    assert_eq!(
        html_files(site.path()),
        vec!["child-1.html", "child-2.html", "home.html"]
    );

    // Links to pages beyond the cap end up as plain external links
    let home = std::fs::read_to_string(site.path().join("home.html")).unwrap();
    assert!(home.contains(r#"<a href="child-1.html">Child 1</a>"#));
    assert!(home.contains(&format!(
        r#"<a href="{}/Child-{:032x}" target="_blank" rel="noopener noreferrer">Child 5</a>"#,
        base_url, 5
    )));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_invalid_seed_fails_setup() {
    let site = tempfile::tempdir().expect("Failed to create temp dir");
    let config = create_test_config("ftp://example.com/file".to_string(), site.path());

    assert!(run_crawl(config).await.is_err());
}
