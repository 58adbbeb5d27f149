use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Matches the 32-hex-digit page identifier the source site embeds in page paths
fn page_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9a-fA-F]{32}").expect("valid page id regex"))
}

/// Returns true if a URL path carries a page identifier
///
/// Hyphens are ignored, so both `Title-0123…cdef` and the dashed UUID form
/// `01234567-89ab-cdef-0123-456789abcdef` qualify.
pub fn has_page_id(path: &str) -> bool {
    let compact: String = path.chars().filter(|c| *c != '-').collect();
    page_id_pattern().is_match(&compact)
}

/// Decides whether a URL is a crawlable page of the target site
///
/// # Policy
///
/// - The host must equal `target_host` exactly (case-insensitively, since
///   URL hosts are case-insensitive)
/// - The path must contain a page identifier (see [`has_page_id`])
///
/// Malformed URLs and non-http(s) schemes are out of scope.
///
/// # Examples
///
/// ```
/// use site_mirror::url::is_in_scope;
///
/// let page = "https://docs.example.com/Setup-0123456789abcdef0123456789abcdef";
/// assert!(is_in_scope(page, "docs.example.com"));
/// assert!(!is_in_scope(page, "example.com"));
/// assert!(!is_in_scope("https://docs.example.com/search", "docs.example.com"));
/// ```
pub fn is_in_scope(url: &str, target_host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host_str() {
        Some(host) if host.eq_ignore_ascii_case(target_host) => has_page_id(parsed.path()),
        _ => false,
    }
}
