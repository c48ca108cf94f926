pub mod coordinates;
pub mod graph;
pub mod next_data;
pub mod normalize;

pub use coordinates::extract_coordinates;
pub use graph::{CacheValue, ObjectCache};
pub use normalize::normalize;

use crate::error::ExtractError;
use crate::models::FlatRecord;

/// Turn a detail page's HTML into a normalized record
///
/// `Ok(None)` means the page is well formed but has no listing entity. A
/// listing entity that is present always yields a record, however sparse.
pub fn extract_record(
    html: &str,
    script_selector: &str,
    root_key_prefix: &str,
    url: &str,
) -> Result<Option<FlatRecord>, ExtractError> {
    let cache = next_data::object_cache(html, script_selector, url)?;
    let Some(root_key) = cache.find_root(root_key_prefix) else {
        return Ok(None);
    };
    Ok(Some(normalize(cache.resolve(root_key))))
}
