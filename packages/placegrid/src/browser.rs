use async_trait::async_trait;
use serde_json::Value;

/// Selector for the consent dialog's decline button shown on first visit.
pub const CONSENT_DECLINE_SELECTOR: &str = r#"button[jsname="tWT92d"][jscontroller="soHxf"]"#;

/// Settle criteria for "the page has finished loading": at most
/// `concurrency` in-flight requests for `idle_ms` milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct NetworkIdle {
    pub concurrency: u32,
    pub idle_ms: u64,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self {
            concurrency: 1000,
            idle_ms: 300,
        }
    }
}

/// Driver for the headless browser session the crawl runs against.
///
/// The orchestrator only ever talks to the page through this trait, so tests
/// script page behavior without a browser. One page is active at a time;
/// `new_page` followed by `close_other_pages` keeps the session at a single
/// tab between iterations.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn new_page(&self) -> Result<(), Self::Error>;
    async fn close_other_pages(&self) -> Result<(), Self::Error>;
    async fn close_page(&self) -> Result<(), Self::Error>;

    async fn goto(&self, url: &str) -> Result<(), Self::Error>;

    /// The page URL after any redirects, as the browser reports it.
    async fn current_url(&self) -> Result<String, Self::Error>;

    /// Click the consent decline button if the dialog is present. A missing
    /// dialog is not an error.
    async fn dismiss_consent(&self, selector: &str) -> Result<(), Self::Error>;

    async fn wait_for_network_idle(&self, idle: NetworkIdle) -> Result<(), Self::Error>;

    /// Pixel height of the scrollable results feed, used to detect when
    /// scrolling has stopped loading more results.
    async fn results_feed_height(&self) -> Result<u64, Self::Error>;

    /// Scroll the results feed to its bottom.
    async fn scroll_results_feed(&self) -> Result<(), Self::Error>;

    /// All place-detail hrefs currently rendered in the results feed.
    async fn place_links(&self) -> Result<Vec<String>, Self::Error>;

    /// The app-state JSON blob embedded in a place-detail page.
    async fn embedded_app_data(&self) -> Result<Value, Self::Error>;
}
