use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

/// Response half of an intercepted network exchange
#[derive(Debug, Clone, Default)]
pub struct InterceptedResponse {
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl InterceptedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A request the browser made while a page was open
#[derive(Debug, Clone, Default)]
pub struct InterceptedRequest {
    pub url: String,
    pub request_body: Vec<u8>,
    pub response: Option<InterceptedResponse>,
}

/// Browser session the crawl drives
///
/// One session is reused for the whole run. Element lookups happen on the
/// HTML returned by [`BrowserSession::page_html`], so implementations only
/// need to cover navigation, waiting and network capture.
pub trait BrowserSession {
    /// Load `url` and block until navigation completes
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Poll for `selector` for at most `timeout`; `Ok(false)` when it never shows up
    fn wait_until_present(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Rendered HTML of the current page
    fn page_html(&mut self) -> Result<String>;

    /// Requests captured since the last [`BrowserSession::clear_intercepted`]
    fn intercepted_requests(&self) -> Vec<InterceptedRequest>;

    fn clear_intercepted(&mut self);
}
