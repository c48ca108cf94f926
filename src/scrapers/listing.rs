use crate::scrapers::parse_selector;
use crate::scrapers::traits::BrowserSession;
use crate::scrapers::types::CrawlConfig;
use anyhow::{Context, Result};
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

/// Enumerates detail-page URLs from the paginated sold-listings search
pub struct ListingPages<'c> {
    config: &'c CrawlConfig,
}

impl<'c> ListingPages<'c> {
    pub fn new(config: &'c CrawlConfig) -> Self {
        Self { config }
    }

    /// Detail-page URLs on one listing page; empty when the result list never renders
    pub fn list_page<S: BrowserSession>(
        &self,
        session: &mut S,
        region_id: &str,
        page: u32,
    ) -> Result<Vec<String>> {
        let url = self.config.listing_page_url(region_id, Some(page));
        debug!("Fetching listing page {}", url);
        session.navigate(&url)?;

        let selector = &self.config.result_card_selector;
        if !session.wait_until_present(selector, self.config.element_timeout())? {
            warn!("No result cards on page {} for region {}", page, region_id);
            return Ok(Vec::new());
        }

        let html = session.page_html()?;
        card_links(&html, selector, &url)
    }

    /// Number of listing pages for a region, at least 1
    pub fn total_pages<S: BrowserSession>(&self, session: &mut S, region_id: &str) -> Result<u32> {
        let url = self.config.listing_page_url(region_id, None);
        session.navigate(&url)?;

        if !session.wait_until_present(
            &self.config.pagination_selector,
            self.config.element_timeout(),
        )? {
            info!("No pagination for region {}, assuming a single page", region_id);
            return Ok(1);
        }

        let html = session.page_html()?;
        max_page_number(&html, &self.config.pagination_link_selector())
    }
}

/// Absolute hrefs of every anchor matching `selector`, skipping empty ones
pub fn card_links(html: &str, selector: &str, page_url: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    let base = Url::parse(page_url).with_context(|| format!("Invalid page URL {}", page_url))?;
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for anchor in document.select(&selector) {
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if href.is_empty() {
            continue;
        }
        match base.join(href) {
            Ok(link) => links.push(link.to_string()),
            Err(e) => warn!("Skipping unusable link '{}': {}", href, e),
        }
    }
    Ok(links)
}

/// Highest numeric anchor text among the pagination links, 1 when none parse
pub fn max_page_number(html: &str, link_selector: &str) -> Result<u32> {
    let selector = parse_selector(link_selector)?;
    let document = Html::parse_document(html);

    let highest = document
        .select(&selector)
        .filter_map(|anchor| {
            let text = anchor.text().collect::<String>();
            let text = text.trim();
            if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            text.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(1);

    Ok(highest.max(1))
}
