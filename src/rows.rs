//! Backend row shapes and the mappings between rows and domain records.
//!
//! Rows come back from the `products` and `trips` tables with lower-case column
//! names, nullable columns and some sub-documents stored as JSON text. Every
//! column is read through a lenient helper, so a malformed value degrades to a
//! default instead of failing the row. The mapping functions never fail.

use crate::models::{
    Category, PricePoint, Product, Trip, TripPlan, TripPreferences, TripStatus, TripType,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Columns requested from the `products` table
pub const PRODUCT_COLUMNS: &str =
    "id,name,url,currentprice,targetprice,imageurl,category,status,history,originalprice,tags";

/// Columns requested from the `trips` table
pub const TRIP_COLUMNS: &str = "id,destination,startdate,enddate,budget,estimatedcost,itinerary,notes,origin,roundtrip,people,needshotel,dietary,currency,status,activities,structuredplan,imageurl,preferences,triptype,travelers";

/// Row of the `products` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub currentprice: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub originalprice: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub targetprice: Option<f64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub imageurl: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    /// Array of `{date, price}` or the same array encoded as JSON text
    #[serde(default, deserialize_with = "loose_value")]
    pub history: Option<Value>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub tags: Option<Vec<String>>,
}

impl ProductRow {
    /// Read a row from whatever the backend returned. Never fails.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            warn!("Product row is not an object, using empty row");
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Product row could not be read, using empty row");
            Self::default()
        })
    }
}

/// Row of the `trips` table.
///
/// Carries both the current columns and the legacy ones (`roundtrip`, `people`,
/// `needshotel`, `dietary`, `itinerary`) that older rows still populate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub startdate: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub enddate: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub estimatedcost: Option<f64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub itinerary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub roundtrip: Option<bool>,
    #[serde(default, deserialize_with = "loose_number")]
    pub people: Option<f64>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub needshotel: Option<bool>,
    #[serde(default, deserialize_with = "loose_string")]
    pub dietary: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose_strings")]
    pub activities: Option<Vec<String>>,
    /// Plan object, or the same object encoded as JSON text
    #[serde(default, deserialize_with = "loose_value")]
    pub structuredplan: Option<Value>,
    #[serde(default, deserialize_with = "loose_string")]
    pub imageurl: Option<String>,
    #[serde(default, deserialize_with = "loose_value")]
    pub preferences: Option<Value>,
    #[serde(default, deserialize_with = "loose_string")]
    pub triptype: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub travelers: Option<f64>,
}

impl TripRow {
    /// Read a row from whatever the backend returned. Never fails.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            warn!("Trip row is not an object, using empty row");
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Trip row could not be read, using empty row");
            Self::default()
        })
    }
}

pub fn row_to_product(row: ProductRow) -> Product {
    let current_price = row.currentprice.unwrap_or(0.0);
    Product {
        id: row.id.unwrap_or_default(),
        name: row.name.unwrap_or_default(),
        category: row
            .category
            .and_then(|c| c.parse::<Category>().ok())
            .unwrap_or_default(),
        current_price,
        original_price: row.originalprice.unwrap_or(current_price),
        target_price: row.targetprice.unwrap_or(0.0),
        image_url: row.imageurl.unwrap_or_default(),
        url: row.url.unwrap_or_default(),
        history: row.history.map(parse_history).unwrap_or_default(),
        tags: row.tags.unwrap_or_default(),
    }
}

/// Inverse of [`row_to_product`]. Inserted products are always `active`.
pub fn product_to_row(product: &Product) -> ProductRow {
    ProductRow {
        id: Some(product.id.clone()),
        name: Some(product.name.clone()),
        url: Some(product.url.clone()),
        currentprice: Some(product.current_price),
        originalprice: Some(product.original_price),
        targetprice: Some(product.target_price),
        imageurl: Some(product.image_url.clone()),
        category: Some(product.category.as_str().to_string()),
        status: Some("active".to_string()),
        history: serde_json::to_value(&product.history).ok(),
        tags: Some(product.tags.clone()),
    }
}

pub fn row_to_trip(row: TripRow) -> Trip {
    let trip_type = row
        .triptype
        .as_deref()
        .and_then(|t| t.parse::<TripType>().ok())
        .unwrap_or(if row.roundtrip.unwrap_or(false) {
            TripType::RoundTrip
        } else {
            TripType::OneWay
        });

    let structured_plan = row
        .structuredplan
        .and_then(parse_plan)
        .or_else(|| row.itinerary.map(Value::String).and_then(parse_plan));

    let preferences = row
        .preferences
        .and_then(parse_preferences)
        .unwrap_or_else(|| TripPreferences {
            needs_hotel: row.needshotel.unwrap_or(false),
            needs_car: false,
            dietary_restrictions: row.dietary.clone(),
        });

    Trip {
        id: row.id.unwrap_or_default(),
        origin: row.origin.unwrap_or_default(),
        destination: row.destination.unwrap_or_default(),
        start_date: row.startdate.unwrap_or_default(),
        end_date: row.enddate.unwrap_or_default(),
        trip_type,
        travelers: row
            .travelers
            .or(row.people)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(1),
        budget: row.budget.unwrap_or(0.0),
        currency: row.currency.unwrap_or_else(|| "USD".to_string()),
        estimated_cost: row.estimatedcost.unwrap_or(0.0),
        status: row
            .status
            .and_then(|s| s.parse::<TripStatus>().ok())
            .unwrap_or_default(),
        activities: row.activities.unwrap_or_default(),
        structured_plan,
        image_url: row.imageurl,
        preferences,
    }
}

/// Inverse of [`row_to_trip`].
///
/// Fills the legacy columns alongside the current ones so older readers of the
/// table keep working: the plan goes to both `structuredplan` and `itinerary`,
/// the trip type to both `triptype` and `roundtrip`, and so on.
pub fn trip_to_row(trip: &Trip) -> TripRow {
    let structuredplan = trip
        .structured_plan
        .as_ref()
        .and_then(|plan| serde_json::to_value(plan).ok());
    let itinerary = trip
        .structured_plan
        .as_ref()
        .and_then(|plan| serde_json::to_string(plan).ok())
        .unwrap_or_default();

    TripRow {
        id: Some(trip.id.clone()),
        origin: Some(trip.origin.clone()),
        destination: Some(trip.destination.clone()),
        startdate: Some(trip.start_date.clone()),
        enddate: Some(trip.end_date.clone()),
        budget: Some(trip.budget),
        estimatedcost: Some(trip.estimated_cost),
        itinerary: Some(itinerary),
        notes: Some(String::new()),
        roundtrip: Some(trip.trip_type == TripType::RoundTrip),
        people: Some(f64::from(trip.travelers)),
        needshotel: Some(trip.preferences.needs_hotel),
        dietary: trip.preferences.dietary_restrictions.clone(),
        currency: Some(trip.currency.clone()),
        status: Some(trip.status.as_str().to_string()),
        activities: Some(trip.activities.clone()),
        structuredplan,
        imageurl: trip.image_url.clone(),
        preferences: serde_json::to_value(&trip.preferences).ok(),
        triptype: Some(trip.trip_type.as_str().to_string()),
        travelers: Some(f64::from(trip.travelers)),
    }
}

fn parse_history(value: Value) -> Vec<PricePoint> {
    let items = match value {
        Value::Array(items) => items,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            _ => {
                debug!("History column is not a JSON array, ignoring");
                return Vec::new();
            }
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let date = item.get("date").and_then(coerce_string)?;
            let price = item.get("price").and_then(coerce_number).unwrap_or(0.0);
            Some(PricePoint { date, price })
        })
        .collect()
}

fn parse_plan(value: Value) -> Option<TripPlan> {
    let value = match value {
        Value::String(text) if text.trim().is_empty() => return None,
        Value::String(text) => serde_json::from_str::<Value>(&text).ok()?,
        Value::Object(_) => value,
        _ => return None,
    };
    match serde_json::from_value(value) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(error = %e, "Stored trip plan does not match the plan shape, dropping it");
            None
        }
    }
}

fn parse_preferences(value: Value) -> Option<TripPreferences> {
    let value = match value {
        Value::String(text) => serde_json::from_str::<Value>(&text).ok()?,
        Value::Object(_) => value,
        _ => return None,
    };
    Some(TripPreferences {
        needs_hotel: value.get("needsHotel").map_or(false, truthy),
        needs_car: value.get("needsCar").map_or(false, truthy),
        dietary_restrictions: value
            .get("dietaryRestrictions")
            .and_then(coerce_string)
            .filter(|s| !s.is_empty()),
    })
}

/// Numeric coercion for loosely typed columns: numbers pass through, numeric
/// text is parsed, booleans become 1/0. Anything else, including NaN and
/// infinities, is treated as absent.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(coerce_number))
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(coerce_string))
}

fn loose_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(|v| !v.is_null())
        .map(|v| truthy(&v)))
}

fn loose_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(items.iter().filter_map(coerce_string).collect()),
        _ => None,
    })
}

fn loose_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.filter(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_plan() -> TripPlan {
        TripPlan {
            summary: "Temples and tea".to_string(),
            total_estimated_cost: "4,200 USD".to_string(),
            daily_itinerary: vec![crate::models::DayPlan {
                day: 1,
                title: "Arrival".to_string(),
                schedule: vec![],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_numeric_fields_are_zero() {
        let product = row_to_product(ProductRow::from_value(json!({ "id": "p1", "name": "Lamp" })));
        assert_eq!(product.current_price, 0.0);
        assert_eq!(product.original_price, 0.0);
        assert_eq!(product.target_price, 0.0);

        let trip = row_to_trip(TripRow::from_value(json!({ "id": "t1" })));
        assert_eq!(trip.budget, 0.0);
        assert_eq!(trip.estimated_cost, 0.0);
    }

    #[test]
    fn test_unparseable_numbers_never_nan() {
        let product = row_to_product(ProductRow::from_value(json!({
            "currentprice": "abc",
            "targetprice": {"nested": true},
            "originalprice": null
        })));
        assert_eq!(product.current_price, 0.0);
        assert_eq!(product.target_price, 0.0);
        assert_eq!(product.original_price, 0.0);
        assert!(!product.current_price.is_nan());
    }

    #[test]
    fn test_numeric_text_is_coerced() {
        let product = row_to_product(ProductRow::from_value(json!({
            "currentprice": "348.5",
            "targetprice": 299
        })));
        assert_eq!(product.current_price, 348.5);
        assert_eq!(product.target_price, 299.0);
    }

    #[test]
    fn test_original_price_falls_back_to_current() {
        let product = row_to_product(ProductRow::from_value(json!({ "currentprice": 120 })));
        assert_eq!(product.original_price, 120.0);
    }

    #[test]
    fn test_product_defaults() {
        let product = row_to_product(ProductRow::from_value(json!({})));
        assert_eq!(product.category, Category::Electronics);
        assert!(product.tags.is_empty());
        assert!(product.history.is_empty());
        assert_eq!(product.image_url, "");

        let product = row_to_product(ProductRow::from_value(json!({ "category": "furniture" })));
        assert_eq!(product.category, Category::Electronics);
    }

    #[test]
    fn test_history_as_json_text() {
        let product = row_to_product(ProductRow::from_value(json!({
            "history": "[{\"date\":\"2024-01-01\",\"price\":10},{\"date\":\"2024-02-01\",\"price\":\"9.5\"}]"
        })));
        assert_eq!(product.history.len(), 2);
        assert_eq!(product.history[1].price, 9.5);

        let product = row_to_product(ProductRow::from_value(json!({ "history": "not json" })));
        assert!(product.history.is_empty());
    }

    #[test]
    fn test_non_object_row_is_empty() {
        let product = row_to_product(ProductRow::from_value(json!([1, 2, 3])));
        assert_eq!(product.id, "");
        assert_eq!(product.current_price, 0.0);
    }

    #[test]
    fn test_product_round_trip() {
        let product = crate::defaults::sample_products().remove(0);
        let row = product_to_row(&product);
        assert_eq!(row.status.as_deref(), Some("active"));
        assert_eq!(row_to_product(row), product);
    }

    #[test]
    fn test_product_row_survives_json() {
        let product = crate::defaults::sample_products().remove(1);
        let wire = serde_json::to_value(product_to_row(&product)).unwrap();
        assert_eq!(wire["currentprice"], json!(1250.0));
        assert_eq!(row_to_product(ProductRow::from_value(wire)), product);
    }

    #[test]
    fn test_trip_type_from_legacy_roundtrip() {
        let trip = row_to_trip(TripRow::from_value(json!({ "roundtrip": true })));
        assert_eq!(trip.trip_type, TripType::RoundTrip);

        let trip = row_to_trip(TripRow::from_value(json!({ "roundtrip": false })));
        assert_eq!(trip.trip_type, TripType::OneWay);

        let trip = row_to_trip(TripRow::from_value(json!({ "triptype": "one-way", "roundtrip": true })));
        assert_eq!(trip.trip_type, TripType::OneWay);
    }

    #[test]
    fn test_travelers_fall_back_to_people() {
        let trip = row_to_trip(TripRow::from_value(json!({ "people": 3 })));
        assert_eq!(trip.travelers, 3);

        let trip = row_to_trip(TripRow::from_value(json!({ "people": 3, "travelers": "2" })));
        assert_eq!(trip.travelers, 2);

        let trip = row_to_trip(TripRow::from_value(json!({})));
        assert_eq!(trip.travelers, 1);
    }

    #[test]
    fn test_preferences_synthesized_from_legacy_columns() {
        let trip = row_to_trip(TripRow::from_value(json!({
            "needshotel": 1,
            "dietary": "vegan"
        })));
        assert_eq!(
            trip.preferences,
            TripPreferences {
                needs_hotel: true,
                needs_car: false,
                dietary_restrictions: Some("vegan".to_string()),
            }
        );
    }

    #[test]
    fn test_structured_preferences_win() {
        let trip = row_to_trip(TripRow::from_value(json!({
            "needshotel": false,
            "preferences": { "needsHotel": true, "needsCar": true }
        })));
        assert!(trip.preferences.needs_hotel);
        assert!(trip.preferences.needs_car);
        assert_eq!(trip.preferences.dietary_restrictions, None);
    }

    #[test]
    fn test_structured_plan_as_text_or_object() {
        let plan = sample_plan();
        let as_text = serde_json::to_string(&plan).unwrap();
        let trip = row_to_trip(TripRow::from_value(json!({ "structuredplan": as_text })));
        assert_eq!(trip.structured_plan.as_ref(), Some(&plan));

        let as_object = serde_json::to_value(&plan).unwrap();
        let trip = row_to_trip(TripRow::from_value(json!({ "structuredplan": as_object })));
        assert_eq!(trip.structured_plan, Some(plan));

        let trip = row_to_trip(TripRow::from_value(json!({ "structuredplan": "{broken" })));
        assert_eq!(trip.structured_plan, None);
    }

    #[test]
    fn test_legacy_itinerary_column() {
        let plan = sample_plan();
        let trip = row_to_trip(TripRow::from_value(json!({
            "itinerary": serde_json::to_string(&plan).unwrap()
        })));
        assert_eq!(trip.structured_plan, Some(plan));

        let trip = row_to_trip(TripRow::from_value(json!({ "itinerary": "" })));
        assert_eq!(trip.structured_plan, None);
    }

    #[test]
    fn test_trip_row_writes_legacy_columns() {
        let mut trip = crate::defaults::sample_trips().remove(0);
        trip.structured_plan = Some(sample_plan());
        let row = trip_to_row(&trip);

        assert_eq!(row.roundtrip, Some(true));
        assert_eq!(row.triptype.as_deref(), Some("round-trip"));
        assert_eq!(row.people, Some(2.0));
        assert_eq!(row.travelers, Some(2.0));
        assert_eq!(row.needshotel, Some(true));
        assert!(row.structuredplan.is_some());
        let itinerary = row.itinerary.clone().unwrap();
        assert_eq!(serde_json::from_str::<TripPlan>(&itinerary).unwrap(), sample_plan());

        assert_eq!(row_to_trip(row), trip);
    }

    #[test]
    fn test_trip_without_plan_writes_empty_itinerary() {
        let trip = crate::defaults::sample_trips().remove(1);
        let row = trip_to_row(&trip);
        assert_eq!(row.itinerary.as_deref(), Some(""));
        assert_eq!(row.structuredplan, None);
        assert_eq!(row_to_trip(row), trip);
    }
}
