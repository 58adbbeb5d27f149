use url::Url;

/// Normalizes a URL into the canonical form used as the crawl's dedup key
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Resolve against `base` (absolute input ignores the base)
/// 3. Remove the fragment (everything after #)
///
/// Nothing else is rewritten: query strings, trailing slashes, and path
/// case are significant to the source site.
///
/// Malformed input is returned unchanged rather than rejected, so a single
/// bad link never aborts the page that contains it.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize (absolute or relative)
/// * `base` - The base URL for resolving relative input
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// assert_eq!(normalize_url("page#intro", Some(&base)), "https://example.com/docs/page");
/// assert_eq!(normalize_url("https://example.com/p#a", None), "https://example.com/p");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> String {
    let trimmed = raw.trim();

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };

    match parsed {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// Parses an already-normalized URL, ignoring anything that is not http(s)
pub fn parse_web_url(url: &str) -> Option<Url> {
    Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}
