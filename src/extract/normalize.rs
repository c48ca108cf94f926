//! Field-specific shaping of a dereferenced listing into a [`FlatRecord`].
//!
//! Every rule is independent and only fires when its source field holds a
//! truthy value. Entities are projected onto a fixed set of sub-fields so
//! the output schema stays the same from one listing to the next.

use crate::models::{FlatRecord, MoneyValue};
use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::debug;

/// Money-bearing fields, all projected to the [`MoneyValue`] shape
pub const MONEY_FIELDS: [&str; 4] = ["askingPrice", "sellingPrice", "priceChange", "runningCosts"];

/// Fields present in every record, `null` when the listing omits them
pub const POSSIBLE_FIELDS: [&str; 6] = [
    "fee",
    "formattedFloor",
    "squareMeterSellingPrice",
    "yearlyArrendeFee",
    "yearlyLeaseholdFee",
    "housingCooperative",
];

/// Default used for a projected sub-field the source does not carry
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Text,
    Flag,
}

impl Fallback {
    fn value(self) -> Value {
        match self {
            Fallback::Text => Value::String(String::new()),
            Fallback::Flag => Value::Bool(false),
        }
    }
}

const BROKER: &[(&str, Fallback)] = &[
    ("name", Fallback::Text),
    ("email", Fallback::Text),
    ("phoneNumber", Fallback::Text),
    ("description", Fallback::Text),
    ("id", Fallback::Text),
    ("slug", Fallback::Text),
    ("hasActiveProfile", Fallback::Flag),
    ("canonicalUrl", Fallback::Text),
];

const BROKER_AGENCY: &[(&str, Fallback)] = &[
    ("id", Fallback::Text),
    ("name", Fallback::Text),
    ("phoneNumber", Fallback::Text),
    ("email", Fallback::Text),
    ("websiteUrl", Fallback::Text),
    ("slug", Fallback::Text),
    ("offersSellingPrices", Fallback::Flag),
    ("isKronofogden", Fallback::Flag),
    ("developer", Fallback::Flag),
];

const LOCATION: &[(&str, Fallback)] = &[
    ("id", Fallback::Text),
    ("fullName", Fallback::Text),
    ("__typename", Fallback::Text),
];

const AMENITY: &[(&str, Fallback)] = &[
    ("kind", Fallback::Text),
    ("isRelevant", Fallback::Flag),
    ("isAvailable", Fallback::Flag),
];

const HOUSING_FORM: &[(&str, Fallback)] = &[
    ("name", Fallback::Text),
    ("symbol", Fallback::Text),
    ("primaryGroup", Fallback::Text),
];

const TENURE: &[(&str, Fallback)] = &[("name", Fallback::Text), ("symbol", Fallback::Text)];

/// Shape a dereferenced listing into its final record
pub fn normalize(mut fields: Map<String, Value>) -> FlatRecord {
    reshape(&mut fields, "broker", |entity| project(entity, BROKER));
    reshape(&mut fields, "brokerAgency", |entity| {
        project(entity, BROKER_AGENCY)
    });
    reshape(&mut fields, "municipality", |entity| project(entity, LOCATION));
    reshape(&mut fields, "county", |entity| project(entity, LOCATION));
    reshape(&mut fields, "housingForm", |entity| {
        project(entity, HOUSING_FORM)
    });
    reshape(&mut fields, "tenure", |entity| project(entity, TENURE));

    reshape_each(&mut fields, "districts", LOCATION);
    reshape_each(&mut fields, "relevantAmenities", AMENITY);

    for field in MONEY_FIELDS {
        reshape(&mut fields, field, money);
    }

    if let Some(sold_at) = fields.get_mut("soldAt") {
        if is_truthy(sold_at) {
            if let Some(date) = epoch_to_date(sold_at) {
                *sold_at = Value::String(date);
            } else {
                debug!("Keeping unparseable soldAt value {}", sold_at);
            }
        }
    }

    for field in POSSIBLE_FIELDS {
        fields.entry(field).or_insert(Value::Null);
    }

    FlatRecord::new(fields)
}

/// Python-style truthiness: null, false, 0, "" and empty containers are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Replace an entity-valued field through `shape`; non-entity values stay
fn reshape(
    fields: &mut Map<String, Value>,
    field: &str,
    shape: impl Fn(&Map<String, Value>) -> Value,
) {
    if let Some(value) = fields.get_mut(field) {
        if !is_truthy(value) {
            return;
        }
        let shaped = match value {
            Value::Object(entity) => shape(entity),
            _ => return,
        };
        *value = shaped;
    }
}

/// Project every entity item of a sequence-valued field
fn reshape_each(fields: &mut Map<String, Value>, field: &str, shape: &[(&str, Fallback)]) {
    if let Some(Value::Array(items)) = fields.get_mut(field) {
        for item in items.iter_mut() {
            let projected = match item {
                Value::Object(entity) => project(entity, shape),
                _ => continue,
            };
            *item = projected;
        }
    }
}

fn project(entity: &Map<String, Value>, shape: &[(&str, Fallback)]) -> Value {
    let projected: Map<String, Value> = shape
        .iter()
        .map(|(name, fallback)| {
            let value = entity
                .get(*name)
                .cloned()
                .unwrap_or_else(|| fallback.value());
            (name.to_string(), value)
        })
        .collect();
    Value::Object(projected)
}

fn money(entity: &Map<String, Value>) -> Value {
    let money = MoneyValue::from_entity(entity);
    let mut shaped = Map::new();
    shaped.insert("formatted".to_string(), money.formatted.map_or(Value::Null, Value::String));
    shaped.insert("amount".to_string(), money.amount.map_or(Value::Null, Value::Number));
    shaped.insert(
        "amountInCents".to_string(),
        money.amount_in_cents.map_or(Value::Null, Value::Number),
    );
    Value::Object(shaped)
}

/// Epoch seconds (number or numeric string) to `YYYY-MM-DD` in UTC
fn epoch_to_date(value: &Value) -> Option<String> {
    let seconds = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() {
        return None;
    }
    let timestamp = DateTime::from_timestamp(seconds.floor() as i64, 0)?;
    Some(timestamp.format("%Y-%m-%d").to_string())
}
