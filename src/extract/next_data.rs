use crate::error::ExtractError;
use crate::extract::graph::ObjectCache;
use crate::scrapers::parse_selector;
use scraper::Html;
use serde_json::Value;

/// Location of the object cache inside the embedded page data
const CACHE_POINTER: &str = "/props/pageProps/__APOLLO_STATE__";

/// Pull the object cache out of a detail page
///
/// A page without the embedded script, or with a script that is not JSON,
/// is an error. Valid JSON that carries no cache yields an empty cache.
pub fn object_cache(html: &str, script_selector: &str, url: &str) -> Result<ObjectCache, ExtractError> {
    let selector = parse_selector(script_selector)?;
    let document = Html::parse_document(html);

    let script = document
        .select(&selector)
        .next()
        .ok_or_else(|| ExtractError::MissingNextData {
            url: url.to_string(),
        })?;
    let content = script.text().collect::<String>();

    let data: Value = serde_json::from_str(&content)?;
    match data.pointer(CACHE_POINTER) {
        Some(Value::Object(entries)) => Ok(ObjectCache::new(entries.clone())),
        _ => Ok(ObjectCache::default()),
    }
}
