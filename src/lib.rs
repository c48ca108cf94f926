//! Sold-property crawler for hemnet.se.
//!
//! Walks the paginated sold-listings search for one region, opens every
//! detail page in headless Chrome, flattens the page's embedded object
//! cache into a [`models::FlatRecord`] and writes the results to Parquet.

pub mod crawl;
pub mod error;
pub mod extract;
pub mod models;
pub mod scrapers;
pub mod storage;

pub use crawl::Crawler;
pub use error::{ExtractError, StorageError};
pub use models::{FlatRecord, GeoCoordinate, MoneyValue, PageListing};
