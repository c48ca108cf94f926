//! In-memory browser used by the integration tests.
//!
//! Pages are registered by URL with their rendered HTML and the network
//! requests the page would have triggered. Element waits succeed exactly
//! when the selector matches the registered HTML.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use hemnet_sold::scrapers::{BrowserSession, CrawlConfig, InterceptedRequest, InterceptedResponse};
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub const REGION: &str = "17860";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub requests: Vec<InterceptedRequest>,
}

#[derive(Default)]
pub struct FakeSession {
    pages: HashMap<String, FakePage>,
    current: Option<String>,
    log: Vec<InterceptedRequest>,
    /// Every URL navigated to, in order; shared so it survives the crawl
    pub visited: Rc<RefCell<Vec<String>>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            FakePage {
                html: html.into(),
                requests: Vec::new(),
            },
        );
        self
    }

    pub fn page_with_requests(
        mut self,
        url: impl Into<String>,
        html: impl Into<String>,
        requests: Vec<InterceptedRequest>,
    ) -> Self {
        self.pages.insert(
            url.into(),
            FakePage {
                html: html.into(),
                requests,
            },
        );
        self
    }

    fn current_page(&self) -> Result<&FakePage> {
        let url = self.current.as_ref().ok_or_else(|| anyhow!("no page loaded"))?;
        self.pages
            .get(url)
            .ok_or_else(|| anyhow!("page {url} vanished"))
    }
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.visited.borrow_mut().push(url.to_string());
        let Some(page) = self.pages.get(url) else {
            bail!("net::ERR_CONNECTION_REFUSED at {url}");
        };
        self.log.extend(page.requests.iter().cloned());
        self.current = Some(url.to_string());
        Ok(())
    }

    fn wait_until_present(&mut self, selector: &str, _timeout: Duration) -> Result<bool> {
        let selector =
            Selector::parse(selector).map_err(|e| anyhow!("bad selector {selector}: {e:?}"))?;
        let document = Html::parse_document(&self.current_page()?.html);
        let found = document.select(&selector).next().is_some();
        Ok(found)
    }

    fn page_html(&mut self) -> Result<String> {
        Ok(self.current_page()?.html.clone())
    }

    fn intercepted_requests(&self) -> Vec<InterceptedRequest> {
        self.log.clone()
    }

    fn clear_intercepted(&mut self) {
        self.log.clear();
    }
}

/// Defaults with the waits and settle delay taken out
pub fn test_config() -> CrawlConfig {
    CrawlConfig {
        element_timeout_secs: 0,
        settle_delay_ms: 0,
        ..CrawlConfig::default()
    }
}

pub fn listing_url(page: Option<u32>) -> String {
    test_config().listing_page_url(REGION, page)
}

/// Search page with result cards and, when `pages` is given, pagination
pub fn listing_html(hrefs: &[&str], pages: Option<&[u32]>) -> String {
    let cards: String = hrefs
        .iter()
        .map(|href| format!(r#"<a class="Card_hclCard__v27k7" href="{href}">card</a>"#))
        .collect();
    let pagination = match pages {
        Some(pages) => {
            let anchors: String = pages.iter().map(|page| format!("<a>{page}</a>")).collect();
            format!(r#"<div class="Pagination_hclPaginationItems__3newI">{anchors}<a>Nästa</a></div>"#)
        }
        None => String::new(),
    };
    let results = if hrefs.is_empty() {
        String::new()
    } else {
        format!(r#"<div data-testid="result-list">{cards}</div>"#)
    };
    format!("<html><body>{results}{pagination}</body></html>")
}

/// Detail page embedding `cache` as its object cache
pub fn detail_html(cache: Value) -> String {
    let data = json!({"props": {"pageProps": {"__APOLLO_STATE__": cache}}});
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
    )
}

/// Minimal listing entity with the given id
pub fn listing_cache(id: &str) -> Value {
    let mut cache = serde_json::Map::new();
    cache.insert(
        format!("SoldPropertyListing:{id}"),
        json!({"id": id, "streetAddress": format!("Storgatan {id}")}),
    );
    Value::Object(cache)
}

/// The map request a detail page fires, answering with `lat`/`long`
pub fn sale_map_request(lat: f64, long: f64) -> InterceptedRequest {
    InterceptedRequest {
        url: "https://www.hemnet.se/graphql".to_string(),
        request_body: br#"{"operationName":"saleMap","variables":{"id":"1"}}"#.to_vec(),
        response: Some(InterceptedResponse {
            headers: HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            body: json!({"data": {"sales": [{"coordinates": {"lat": lat, "long": long}}]}})
                .to_string()
                .into_bytes(),
        }),
    }
}
