//! Domain records shared by the adapters, the assistant and the session.

use crate::TrackiflyError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// One observed price for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
}

/// Product category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Electronics,
    Clothing,
    Travel,
    Home,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Clothing => "clothing",
            Category::Travel => "travel",
            Category::Home => "home",
        }
    }
}

impl FromStr for Category {
    type Err = TrackiflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "electronics" => Ok(Category::Electronics),
            "clothing" => Ok(Category::Clothing),
            "travel" => Ok(Category::Travel),
            "home" => Ok(Category::Home),
            _ => Err(TrackiflyError::invalid("category", s)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub current_price: f64,
    pub original_price: f64,
    pub target_price: f64,
    pub image_url: String,
    pub url: String,
    pub history: Vec<PricePoint>,
    pub tags: Vec<String>,
}

impl Product {
    /// True when history dates never go backwards.
    ///
    /// Dates are ISO-8601 strings, so lexical order is chronological order.
    pub fn history_is_chronological(&self) -> bool {
        self.history.windows(2).all(|w| w[0].date <= w[1].date)
    }

    /// True when the current price matches the latest history point.
    /// An empty history is trivially consistent.
    pub fn current_matches_history(&self) -> bool {
        self.history
            .last()
            .map_or(true, |last| last.price == self.current_price)
    }

    pub fn savings(&self) -> f64 {
        self.original_price - self.current_price
    }

    pub fn share_text(&self) -> String {
        format!(
            "Check out this deal! {} is currently ${} at {}",
            self.name, self.current_price, self.url
        )
    }
}

/// Trip type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripType {
    #[default]
    #[serde(rename = "round-trip")]
    RoundTrip,
    #[serde(rename = "one-way")]
    OneWay,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::RoundTrip => "round-trip",
            TripType::OneWay => "one-way",
        }
    }
}

impl FromStr for TripType {
    type Err = TrackiflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round-trip" | "roundtrip" => Ok(TripType::RoundTrip),
            "one-way" | "oneway" => Ok(TripType::OneWay),
            _ => Err(TrackiflyError::invalid("trip type", s)),
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trip status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Planning,
    Booked,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planning => "planning",
            TripStatus::Booked => "booked",
            TripStatus::Completed => "completed",
        }
    }
}

impl FromStr for TripStatus {
    type Err = TrackiflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" => Ok(TripStatus::Planning),
            "booked" => Ok(TripStatus::Booked),
            "completed" => Ok(TripStatus::Completed),
            _ => Err(TrackiflyError::invalid("trip status", s)),
        }
    }
}

/// What the traveller asked for when planning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPreferences {
    #[serde(default)]
    pub needs_hotel: bool,
    #[serde(default)]
    pub needs_car: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<String>,
}

/// A planned or booked trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub start_date: String,
    /// Only meaningful for round trips, see [`Trip::return_date`].
    pub end_date: String,
    pub trip_type: TripType,
    pub travelers: u32,
    pub budget: f64,
    pub currency: String,
    pub estimated_cost: f64,
    pub status: TripStatus,
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_plan: Option<TripPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub preferences: TripPreferences,
}

impl Trip {
    pub fn return_date(&self) -> Option<&str> {
        match self.trip_type {
            TripType::RoundTrip if !self.end_date.is_empty() => Some(&self.end_date),
            _ => None,
        }
    }
}

// Display fields in a generated plan are free text. Models sometimes emit a bare
// number for prices or ratings, which is kept as its textual form.
fn display_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOption {
    #[serde(default, deserialize_with = "display_string")]
    pub airline: String,
    #[serde(default, deserialize_with = "display_string")]
    pub price: String,
    #[serde(default, deserialize_with = "display_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "display_string")]
    pub departure_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelOption {
    #[serde(default, deserialize_with = "display_string")]
    pub name: String,
    #[serde(default, deserialize_with = "display_string")]
    pub price_per_night: String,
    #[serde(default, deserialize_with = "display_string")]
    pub rating: String,
    #[serde(default, deserialize_with = "display_string")]
    pub location: String,
    #[serde(default, deserialize_with = "display_string")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarRentalOption {
    #[serde(default, deserialize_with = "display_string")]
    pub company: String,
    #[serde(default, deserialize_with = "display_string")]
    pub car_type: String,
    #[serde(default, deserialize_with = "display_string")]
    pub daily_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecommendation {
    #[serde(default, deserialize_with = "display_string")]
    pub name: String,
    #[serde(default, deserialize_with = "display_string")]
    pub cuisine: String,
    #[serde(default, deserialize_with = "display_string")]
    pub price_range: String,
    #[serde(default, deserialize_with = "display_string")]
    pub description: String,
    #[serde(default, deserialize_with = "display_string")]
    pub must_try: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    #[serde(default, deserialize_with = "display_string")]
    pub time: String,
    #[serde(default, deserialize_with = "display_string")]
    pub activity: String,
    #[serde(default, deserialize_with = "display_string")]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub day: u32,
    #[serde(default, deserialize_with = "display_string")]
    pub title: String,
    #[serde(default)]
    pub schedule: Vec<DailyActivity>,
}

/// AI-generated plan attached to a trip.
///
/// `summary`, `flights`, `hotels` and `daily_itinerary` are required, matching
/// the response schema sent to the model; everything else may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    #[serde(deserialize_with = "display_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "display_string")]
    pub total_estimated_cost: String,
    pub flights: Vec<FlightOption>,
    pub hotels: Vec<HotelOption>,
    #[serde(default)]
    pub car_rentals: Vec<CarRentalOption>,
    #[serde(default)]
    pub food: Vec<FoodRecommendation>,
    pub daily_itinerary: Vec<DayPlan>,
}

impl TripPlan {
    /// Every scheduled activity, day by day, in schedule order.
    pub fn activities(&self) -> Vec<String> {
        self.daily_itinerary
            .iter()
            .flat_map(|day| day.schedule.iter().map(|s| s.activity.clone()))
            .collect()
    }

    pub fn export_json(&self) -> Result<String, TrackiflyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn export_file_name(destination: &str) -> String {
        let destination = destination.trim();
        if destination.is_empty() {
            "Trip-to-Unknown.json".to_string()
        } else {
            format!("Trip-to-{}.json", destination)
        }
    }
}

/// How the user signed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Guest,
    #[serde(rename = "auth")]
    Authenticated,
}

/// The signed-in user. Held in memory for the life of a [`crate::Session`] only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

impl UserProfile {
    /// Guest sign-in; both name and email are required.
    pub fn guest(name: &str, email: &str) -> Result<Self, TrackiflyError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() {
            return Err(TrackiflyError::invalid("name", name));
        }
        if email.is_empty() {
            return Err(TrackiflyError::invalid("email", email));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            avatar: None,
            account_type: AccountType::Guest,
        })
    }

    pub fn authenticated(name: Option<&str>, email: &str, avatar: Option<String>) -> Self {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Demo User");
        Self {
            name: name.to_string(),
            email: email.trim().to_string(),
            avatar,
            account_type: AccountType::Authenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PriceDrop,
    TripAlert,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub timestamp: String,
}

/// Output language for generated text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    Hu,
    Ur,
    Ar,
    Zh,
    Hi,
    Pt,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Hu => "hu",
            Language::Ur => "ur",
            Language::Ar => "ar",
            Language::Zh => "zh",
            Language::Hi => "hi",
            Language::Pt => "pt",
        }
    }
}

impl FromStr for Language {
    type Err = TrackiflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "fr" => Ok(Language::Fr),
            "de" => Ok(Language::De),
            "hu" => Ok(Language::Hu),
            "ur" => Ok(Language::Ur),
            "ar" => Ok(Language::Ar),
            "zh" => Ok(Language::Zh),
            "hi" => Ok(Language::Hi),
            "pt" => Ok(Language::Pt),
            _ => Err(TrackiflyError::invalid("language", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Supported display currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Jpy,
    Huf,
    Inr,
    Aed,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Huf => "HUF",
            Currency::Inr => "INR",
            Currency::Aed => "AED",
        }
    }
}

impl FromStr for Currency {
    type Err = TrackiflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "JPY" => Ok(Currency::Jpy),
            "HUF" => Ok(Currency::Huf),
            "INR" => Ok(Currency::Inr),
            "AED" => Ok(Currency::Aed),
            _ => Err(TrackiflyError::invalid("currency", s)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
