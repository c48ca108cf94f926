pub mod browser;
pub mod listing;
pub mod traits;
pub mod types;

pub use browser::ChromeSession;
pub use listing::ListingPages;
pub use traits::{BrowserSession, InterceptedRequest, InterceptedResponse};
pub use types::CrawlConfig;

use anyhow::{anyhow, Result};
use scraper::Selector;

/// Compile a CSS selector, keeping the parse error readable
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector '{}': {:?}", selector, e))
}
