use crate::error::ExtractError;
use crate::extract::{extract_coordinates, extract_record};
use crate::models::{FlatRecord, PageListing};
use crate::scrapers::{BrowserSession, CrawlConfig, ListingPages};
use anyhow::{Context, Result};
use std::thread;
use tracing::{debug, error, info, warn};

/// Drives one sequential crawl of a region over a single browser session
///
/// The session is owned by the crawler and dropped when [`Crawler::run`]
/// returns, whichever way it returns.
pub struct Crawler<'c, S: BrowserSession> {
    session: S,
    config: &'c CrawlConfig,
}

impl<'c, S: BrowserSession> Crawler<'c, S> {
    pub fn new(session: S, config: &'c CrawlConfig) -> Self {
        Self { session, config }
    }

    /// Walk every listing page of `region_id` and collect one record per detail page
    ///
    /// Only a failure to reach the first listing page is an error. Listing
    /// pages and detail pages that fail later are logged and skipped.
    pub fn run(mut self, region_id: &str) -> Result<Vec<FlatRecord>> {
        let listing = ListingPages::new(self.config);

        let total_pages = listing
            .total_pages(&mut self.session, region_id)
            .with_context(|| format!("Failed to open listing for region {}", region_id))?;
        info!("Total pages to scrape: {}", total_pages);

        let mut records = Vec::new();
        for page in 1..=total_pages {
            info!("Scraping page {} of {}", page, total_pages);
            let urls = match listing.list_page(&mut self.session, region_id, page) {
                Ok(urls) => urls,
                Err(e) => {
                    error!("Failed to list page {}: {:#}", page, e);
                    continue;
                }
            };
            let page_listing = PageListing {
                page,
                total_pages,
                urls,
            };
            info!(
                "Found {} property links on page {}",
                page_listing.urls.len(),
                page_listing.page
            );

            let outcomes: Vec<_> = page_listing
                .urls
                .iter()
                .map(|url| (url, self.scrape_detail(url)))
                .collect();

            for (url, outcome) in outcomes {
                match outcome {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => warn!("No listing data on {}", url),
                    Err(e) => error!("Error scraping property {}: {}", url, e),
                }
            }
        }

        info!("Collected {} property records", records.len());
        Ok(records)
    }

    fn scrape_detail(&mut self, url: &str) -> Result<Option<FlatRecord>, ExtractError> {
        info!("Scraping property: {}", url);
        let config = self.config;

        self.session.clear_intercepted();
        self.session.navigate(url)?;
        // Let client-side rendering and the map request settle
        thread::sleep(config.settle_delay());
        if !self
            .session
            .wait_until_present(&config.next_data_selector, config.element_timeout())?
        {
            debug!("Embedded data never rendered on {}", url);
        }

        let html = self.session.page_html()?;
        let extracted = extract_record(
            &html,
            &config.next_data_selector,
            &config.root_key_prefix,
            url,
        )?;
        let Some(record) = extracted else {
            return Ok(None);
        };

        let geo = extract_coordinates(
            &self.session.intercepted_requests(),
            &config.coordinate_url_marker,
            &config.coordinate_operation_marker,
        );
        if geo.latitude.is_none() {
            warn!("No coordinates captured for {}", url);
        }
        Ok(Some(record.with_coordinates(geo)))
    }
}
