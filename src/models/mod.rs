use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Price-like value as published on a sold listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoneyValue {
    /// `None` when the source holds an explicit non-string such as `null`
    pub formatted: Option<String>,
    pub amount: Option<Number>,
    pub amount_in_cents: Option<Number>,
}

impl MoneyValue {
    /// Read the money shape out of a dereferenced entity
    ///
    /// A missing `formatted` becomes `""`; amounts that are not numbers
    /// become `None`.
    pub fn from_entity(entity: &Map<String, Value>) -> Self {
        let number = |field: &str| entity.get(field).and_then(Value::as_number).cloned();
        Self {
            formatted: match entity.get("formatted") {
                None => Some(String::new()),
                Some(value) => value.as_str().map(str::to_string),
            },
            amount: number("amount"),
            amount_in_cents: number("amountInCents"),
        }
    }
}

/// Coordinates for a listing, read from the map side-channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Detail-page URLs found on one listing page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageListing {
    pub page: u32,
    pub total_pages: u32,
    pub urls: Vec<String>,
}

/// Fully dereferenced, normalized sale record for one detail page
///
/// Built once per page visit and never mutated afterwards; the only way to
/// extend it is [`FlatRecord::with_coordinates`], which consumes the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FlatRecord(Map<String, Value>);

impl FlatRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Attach side-channel coordinates as top-level `latitude`/`longitude`
    pub fn with_coordinates(mut self, geo: GeoCoordinate) -> Self {
        self.0.insert("latitude".to_string(), geo.latitude.into());
        self.0.insert("longitude".to_string(), geo.longitude.into());
        self
    }
}
