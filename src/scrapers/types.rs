use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Region crawled when none is given on the command line (Skellefteå kommun)
pub const DEFAULT_REGION_ID: &str = "17860";

/// File picked up from the working directory to override the defaults
pub const CONFIG_FILE_NAME: &str = "hemnet-sold.toml";

/// Crawl parameters: where to look, what to wait for, where to write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Sold-listings search page, without query string
    pub listing_url: String,
    /// Anchors pointing at detail pages inside the result list
    pub result_card_selector: String,
    /// Container of the pagination anchors
    pub pagination_selector: String,
    /// Script tag holding the embedded page data
    pub next_data_selector: String,
    /// Key prefix of the listing entity in the object cache
    pub root_key_prefix: String,
    /// Upper bound for element waits, in seconds
    pub element_timeout_secs: u64,
    /// Pause after each detail navigation, in milliseconds
    pub settle_delay_ms: u64,
    /// Substring identifying side-channel request URLs
    pub coordinate_url_marker: String,
    /// Substring identifying the side-channel operation in request bodies
    pub coordinate_operation_marker: String,
    /// Parquet file written at the end of the run
    pub output_path: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.hemnet.se/salda/bostader".to_string(),
            result_card_selector: r#"div[data-testid="result-list"] a.Card_hclCard__v27k7"#
                .to_string(),
            pagination_selector: "div.Pagination_hclPaginationItems__3newI".to_string(),
            next_data_selector: "script#__NEXT_DATA__".to_string(),
            root_key_prefix: "SoldPropertyListing:".to_string(),
            element_timeout_secs: 10,
            settle_delay_ms: 2000,
            coordinate_url_marker: "graphql".to_string(),
            coordinate_operation_marker: r#""operationName":"saleMap""#.to_string(),
            output_path: PathBuf::from("properties/properties.parquet"),
        }
    }
}

impl CrawlConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse crawl configuration")
    }

    /// Load overrides from `path`, or the defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Anchors inside the pagination container
    pub fn pagination_link_selector(&self) -> String {
        format!("{} a", self.pagination_selector)
    }

    /// Search page URL for a region, optionally pinned to a page
    pub fn listing_page_url(&self, region_id: &str, page: Option<u32>) -> String {
        match page {
            Some(page) => format!(
                "{}?location_ids={}&page={}",
                self.listing_url, region_id, page
            ),
            None => format!("{}?location_ids={}", self.listing_url, region_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CrawlConfig::from_toml(
            r#"
            settle-delay-ms = 0
            output-path = "out/sold.parquet"
            "#,
        )
        .unwrap();

        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.output_path, PathBuf::from("out/sold.parquet"));
        assert_eq!(config.root_key_prefix, "SoldPropertyListing:");
        assert_eq!(config.element_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = CrawlConfig::load_or_default(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.listing_url, "https://www.hemnet.se/salda/bostader");
    }

    #[test]
    fn listing_urls_carry_region_and_page() {
        let config = CrawlConfig::default();
        assert_eq!(
            config.listing_page_url("17860", Some(3)),
            "https://www.hemnet.se/salda/bostader?location_ids=17860&page=3"
        );
        assert_eq!(
            config.listing_page_url("17860", None),
            "https://www.hemnet.se/salda/bostader?location_ids=17860"
        );
    }
}
