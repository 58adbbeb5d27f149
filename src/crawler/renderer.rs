//! Renderer collaborator interface
//!
//! The crawl never talks to a browser directly. It drives a [`Renderer`],
//! which behaves like a single browser tab: navigate, wait for content,
//! expand collapsed widgets, then hand back the rendered markup.
//!
//! [`HttpRenderer`] is the built-in implementation. It fetches server-rendered
//! markup over HTTP and applies disclosure expansion statically.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::markup::Markup;
use crate::{MirrorError, RenderError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of a navigation that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// True for a 2xx response
    pub ok: bool,

    /// HTTP status of the main document
    pub status: u16,

    /// URL after redirects
    pub final_url: String,
}

/// A page renderer
///
/// Implementations hold at most one "current" page. Non-success navigations
/// and navigation errors are treated identically by the crawl: the page is
/// skipped.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Loads `url` as the current page, bounded by `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Navigation, RenderError>;

    /// Waits until `marker` is present on the current page
    ///
    /// Returns false if the marker did not appear within `timeout`; callers
    /// proceed with whatever rendered.
    async fn wait_for_marker(&self, marker: &str, timeout: Duration) -> bool;

    /// Opens collapsed disclosure widgets, returning how many were opened
    ///
    /// Individual widgets that fail to open are ignored.
    async fn expand_disclosures(&self) -> usize;

    /// Returns the current page's rendered markup
    async fn content(&self) -> Result<String, RenderError>;
}

/// Renderer that fetches server-rendered markup with reqwest
pub struct HttpRenderer {
    client: Client,
    current: Mutex<Option<String>>,
}

impl HttpRenderer {
    /// Builds the renderer's HTTP client from configuration
    pub fn new(config: &Config) -> Result<Self, MirrorError> {
        let client = build_http_client(&config.user_agent, config.crawler.page_timeout())
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            current: Mutex::new(None),
        }
    }

    fn set_current(&self, html: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = html;
        }
    }

    fn current(&self) -> Option<String> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    async fn load(&self, url: &str) -> Result<Navigation, RenderError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Ok(Navigation {
                ok: false,
                status: status.as_u16(),
                final_url,
            });
        }

        let body = response.text().await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.set_current(Some(body));

        Ok(Navigation {
            ok: true,
            status: status.as_u16(),
            final_url,
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Navigation, RenderError> {
        self.set_current(None);
        tokio::time::timeout(timeout, self.load(url))
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
            })?
    }

    async fn wait_for_marker(&self, marker: &str, _timeout: Duration) -> bool {
        // Server-rendered markup never changes after load, so one check is final
        self.current()
            .map(|html| marker_present(&html, marker))
            .unwrap_or(false)
    }

    async fn expand_disclosures(&self) -> usize {
        let Some(html) = self.current() else {
            return 0;
        };
        let (expanded, count) = expand_static_disclosures(&html);
        self.set_current(Some(expanded));
        count
    }

    async fn content(&self) -> Result<String, RenderError> {
        self.current().ok_or(RenderError::NoPage)
    }
}

/// Checks for a content marker: a CSS selector, or literal text if the
/// marker is not a valid selector
pub fn marker_present(html: &str, marker: &str) -> bool {
    let marker = marker.trim();
    if marker.is_empty() {
        return true;
    }

    match Selector::parse(marker) {
        Ok(selector) => Html::parse_document(html).select(&selector).next().is_some(),
        Err(_) => html.contains(marker),
    }
}

/// Opens collapsed disclosure widgets in static markup
///
/// - `<details>` elements gain the `open` attribute
/// - Controls with `aria-expanded="false"` flip to `"true"`
/// - Elements those controls name in `aria-controls` lose `hidden`
///
/// Returns the new markup and the number of widgets opened. Markup with
/// nothing to open is returned as given.
pub fn expand_static_disclosures(html: &str) -> (String, usize) {
    let mut markup = Markup::parse(html);
    let mut count = 0;

    for details in markup.select_ids("details") {
        if markup.attr(details, "open").is_none() {
            markup.set_attr(details, "open", "");
            count += 1;
        }
    }

    let mut controlled = HashSet::new();
    for control in markup.select_ids("[aria-expanded]") {
        if markup.attr(control, "aria-expanded").as_deref() != Some("false") {
            continue;
        }
        markup.set_attr(control, "aria-expanded", "true");
        if let Some(ids) = markup.attr(control, "aria-controls") {
            controlled.extend(ids.split_whitespace().map(str::to_string));
        }
        count += 1;
    }

    if !controlled.is_empty() {
        for element in markup.select_ids("[hidden]") {
            let named = markup
                .attr(element, "id")
                .map_or(false, |id| controlled.contains(&id));
            if named {
                markup.remove_attr(element, "hidden");
            }
        }
    }

    if count == 0 {
        return (html.to_string(), 0);
    }
    (markup.serialize(), count)
}
