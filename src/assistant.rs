//! Advice, price analysis, itinerary generation and coupon discovery.
//!
//! Every entry point here is advisory. Failures of any kind, whether transport,
//! an empty answer or a response that does not match the expected shape, are
//! logged and replaced by a fixed fallback value, so none of these functions
//! return an error.

use crate::client::{GenerateRequest, GenerativeModel};
use crate::fallback::or_fallback;
use crate::models::{Language, Product, Trip, TripPlan, TripPreferences, TripType};
use crate::TrackiflyError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

/// Codes returned by [`find_coupons`] when the model cannot help
pub const FALLBACK_COUPONS: [&str; 3] = ["SAVE10", "WELCOME", "FREESHIP"];

pub const ADVICE_UNAVAILABLE: &str =
    "Sorry, I'm having trouble connecting to the server right now. Please check your API key.";
pub const ADVICE_EMPTY: &str = "I couldn't generate a response at this time.";
pub const ANALYSIS_UNAVAILABLE: &str = "Could not analyze price.";
pub const ANALYSIS_EMPTY: &str = "Analysis unavailable.";

const MAX_COUPONS: usize = 5;

const SYSTEM_INSTRUCTION: &str = "You are Trackifly, an expert AI shopping assistant and travel planner.
Your goal is to help users save money, track prices, and plan trips efficiently.
You have access to the user's tracked products and current trip plans.
Always be concise, helpful, and money-conscious.
If asked about price trends, analyze the provided history.";

/// Trip parameters for itinerary generation. `end_date` is ignored one-way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryRequest {
    pub origin: String,
    pub destination: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub trip_type: TripType,
    pub budget: f64,
    pub currency: String,
    pub travelers: u32,
    #[serde(default)]
    pub preferences: TripPreferences,
}

#[derive(Serialize)]
struct ProductDigest<'a> {
    name: &'a str,
    current: f64,
    target: f64,
}

#[derive(Serialize)]
struct TripDigest<'a> {
    destination: &'a str,
    budget: f64,
}

/// Free-form shopping or travel question answered against the user's data.
#[instrument(level = "info", skip_all, fields(model = model.name()))]
pub async fn get_shopping_advice(
    model: &dyn GenerativeModel,
    query: &str,
    products: &[Product],
    trips: &[Trip],
) -> String {
    let request = GenerateRequest::text(advice_prompt(query, products, trips))
        .with_system_instruction(SYSTEM_INSTRUCTION);

    or_fallback(
        "shopping_advice",
        async {
            match model.generate(request).await {
                Err(TrackiflyError::EmptyResponse) => Ok(ADVICE_EMPTY.to_string()),
                other => other,
            }
        },
        || ADVICE_UNAVAILABLE.to_string(),
    )
    .await
}

/// Short buy/wait verdict for one product.
#[instrument(level = "info", skip_all, fields(product_id = %product.id))]
pub async fn analyze_product_value(model: &dyn GenerativeModel, product: &Product) -> String {
    let request = GenerateRequest::text(analysis_prompt(product));

    or_fallback(
        "analyze_product",
        async {
            match model.generate(request).await {
                Err(TrackiflyError::EmptyResponse) => Ok(ANALYSIS_EMPTY.to_string()),
                other => other,
            }
        },
        || ANALYSIS_UNAVAILABLE.to_string(),
    )
    .await
}

/// Structured itinerary for a trip, or `None` if the model fails or the
/// response does not parse as a [`TripPlan`].
#[instrument(level = "info", skip_all, fields(destination = %trip.destination, language = %language))]
pub async fn generate_trip_itinerary(
    model: &dyn GenerativeModel,
    trip: &ItineraryRequest,
    language: Language,
) -> Option<TripPlan> {
    let request = GenerateRequest::json(itinerary_prompt(trip, language))
        .with_schema(itinerary_schema());

    or_fallback(
        "generate_itinerary",
        async {
            let text = model.generate(request).await?;
            let plan: TripPlan = serde_json::from_str(strip_code_fence(&text))?;
            info!(days = plan.daily_itinerary.len(), "Itinerary generated");
            Ok::<_, TrackiflyError>(Some(plan))
        },
        || None,
    )
    .await
}

/// Three to five plausible promotional codes for a store.
///
/// Always returns something to show: [`FALLBACK_COUPONS`] when the model
/// fails or answers with anything other than a non-empty array of strings.
#[instrument(level = "info", skip(model))]
pub async fn find_coupons(model: &dyn GenerativeModel, url: &str) -> Vec<String> {
    let request = GenerateRequest::json(coupon_prompt(url));

    or_fallback(
        "find_coupons",
        async {
            let text = model.generate(request).await?;
            parse_coupons(&text)
        },
        fallback_coupons,
    )
    .await
}

pub fn fallback_coupons() -> Vec<String> {
    FALLBACK_COUPONS.iter().map(|c| c.to_string()).collect()
}

fn advice_prompt(query: &str, products: &[Product], trips: &[Trip]) -> String {
    let products: Vec<ProductDigest> = products
        .iter()
        .map(|p| ProductDigest {
            name: &p.name,
            current: p.current_price,
            target: p.target_price,
        })
        .collect();
    let trips: Vec<TripDigest> = trips
        .iter()
        .map(|t| TripDigest {
            destination: &t.destination,
            budget: t.budget,
        })
        .collect();

    // Vec of plain structs always serializes
    let products = serde_json::to_string(&products).unwrap_or_else(|_| "[]".to_string());
    let trips = serde_json::to_string(&trips).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Context:\nUser's Tracked Products: {}\nUser's Planned Trips: {}\n\nUser Query: {}",
        products, trips, query
    )
}

fn analysis_prompt(product: &Product) -> String {
    let history = serde_json::to_string(&product.history).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Analyze the price history of this product: {}.\n\
         Current Price: ${}.\n\
         Original Price: ${}.\n\
         History: {}.\n\
         Is this a good time to buy? Give a 2-sentence verdict.",
        product.name, product.current_price, product.original_price, history
    )
}

fn itinerary_prompt(trip: &ItineraryRequest, language: Language) -> String {
    let (flight_type, dates) = match (trip.trip_type, trip.end_date.as_deref()) {
        (TripType::OneWay, _) => (
            "One Way (No Return Flight needed)",
            trip.start_date.clone(),
        ),
        (TripType::RoundTrip, Some(end)) if !end.is_empty() => {
            ("Round Trip", format!("{} to {}", trip.start_date, end))
        }
        (TripType::RoundTrip, _) => ("Round Trip", trip.start_date.clone()),
    };
    let dietary = trip
        .preferences
        .dietary_restrictions
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("None");

    format!(
        "Plan a detailed trip for {travelers} people.\n\
         From: {origin}\n\
         To: {destination}\n\
         Flight Type: {flight_type}\n\
         Dates: {dates}\n\
         Total Budget: {budget} {currency}\n\
         \n\
         Requirements:\n\
         - Hotel Required: {hotel}\n\
         - Car Rental: {car}\n\
         - Dietary Restrictions: {dietary}\n\
         - Language: {language} (Ensure all text fields are in this language; keep JSON keys in English)\n\
         \n\
         Generate a structured JSON response with realistic options.",
        travelers = trip.travelers,
        origin = trip.origin,
        destination = trip.destination,
        flight_type = flight_type,
        dates = dates,
        budget = trip.budget,
        currency = trip.currency,
        hotel = trip.preferences.needs_hotel,
        car = trip.preferences.needs_car,
        dietary = dietary,
        language = language,
    )
}

fn coupon_prompt(url: &str) -> String {
    format!(
        "The user is shopping at this website: {}.\n\
         List 3-5 common, likely active, or generic coupon codes for this retailer (e.g., WELCOME10, SAVE20).\n\
         Return ONLY a JSON array of strings, for example: [\"SAVE10\", \"WELCOME20\"].\n\
         Do not include any other text.",
        url
    )
}

/// Response schema for itinerary generation, in the Gemini schema dialect.
pub fn itinerary_schema() -> Value {
    fn strings(fields: &[&str]) -> Value {
        let properties: serde_json::Map<String, Value> = fields
            .iter()
            .map(|f| (f.to_string(), json!({ "type": "STRING" })))
            .collect();
        json!({ "type": "ARRAY", "items": { "type": "OBJECT", "properties": properties } })
    }

    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING", "description": "A 2-sentence enthusiastic summary of the trip." },
            "totalEstimatedCost": { "type": "STRING", "description": "Total estimated cost formatted with currency." },
            "flights": strings(&["airline", "price", "duration", "departureTime"]),
            "hotels": strings(&["name", "pricePerNight", "rating", "location", "description"]),
            "carRentals": strings(&["company", "carType", "dailyRate"]),
            "food": strings(&["name", "cuisine", "priceRange", "description", "mustTry"]),
            "dailyItinerary": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "day": { "type": "INTEGER" },
                        "title": { "type": "STRING", "description": "Theme of the day" },
                        "schedule": strings(&["time", "activity", "location"])
                    }
                }
            }
        },
        "required": ["summary", "flights", "hotels", "dailyItinerary"]
    })
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
    })
}

/// Models occasionally wrap JSON in a Markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    match code_fence().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => {
            debug!("Stripping Markdown code fence from model output");
            inner.as_str()
        }
        None => text.trim(),
    }
}

fn parse_coupons(text: &str) -> Result<Vec<String>, TrackiflyError> {
    let codes: Vec<String> = serde_json::from_str(strip_code_fence(text))?;
    let codes: Vec<String> = codes
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .take(MAX_COUPONS)
        .collect();

    if codes.is_empty() {
        warn!("Model returned no usable coupon codes");
        return Err(TrackiflyError::EmptyResponse);
    }
    Ok(codes)
}
