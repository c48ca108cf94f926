use crate::models::GeoCoordinate;
use crate::scrapers::traits::{InterceptedRequest, InterceptedResponse};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Find the listing's coordinates among intercepted map requests
///
/// Entries are tried in capture order; the first one whose response holds
/// `data.sales[0].coordinates` wins. Never fails: no match means no coordinates.
pub fn extract_coordinates(
    requests: &[InterceptedRequest],
    url_marker: &str,
    operation_marker: &str,
) -> GeoCoordinate {
    requests
        .iter()
        .filter(|request| request.url.contains(url_marker))
        .filter(|request| String::from_utf8_lossy(&request.request_body).contains(operation_marker))
        .filter_map(|request| request.response.as_ref())
        .find_map(|response| match coordinates_from_response(response) {
            Ok(geo) => geo,
            Err(e) => {
                debug!("Skipping side-channel response: {:#}", e);
                None
            }
        })
        .unwrap_or_default()
}

fn coordinates_from_response(response: &InterceptedResponse) -> Result<Option<GeoCoordinate>> {
    let body = decode_body(response)?;
    let data: Value = serde_json::from_slice(&body).context("Response is not JSON")?;

    let Some(coordinates) = data.pointer("/data/sales/0/coordinates") else {
        return Ok(None);
    };
    Ok(Some(GeoCoordinate {
        latitude: coordinates.get("lat").and_then(Value::as_f64),
        longitude: coordinates.get("long").and_then(Value::as_f64),
    }))
}

/// Response body with gzip content-encoding undone
///
/// Browsers usually hand bodies over already inflated while keeping the
/// header, so only bodies that still start with the gzip magic are inflated.
fn decode_body(response: &InterceptedResponse) -> Result<Vec<u8>> {
    let gzipped = response
        .header("content-encoding")
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"));

    if gzipped && response.body.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(response.body.as_slice())
            .read_to_end(&mut inflated)
            .context("Failed to inflate gzip response")?;
        Ok(inflated)
    } else {
        Ok(response.body.clone())
    }
}
