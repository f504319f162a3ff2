//! # Trackifly
//!
//! Price tracking, AI trip planning and coupon discovery.
//!
//! The library composes two optional external services: a Gemini model for
//! advice, itineraries and coupon codes, and a Supabase (PostgREST) backend that
//! mirrors the tracked products and trips. Neither is load-bearing: every call
//! into them degrades to a deterministic fallback so the in-memory
//! [`Session`] stays usable when they are missing or failing.

pub mod assistant;
pub mod backend;
pub mod client;
pub mod config;
pub mod defaults;
pub mod fallback;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod preferences;
pub mod rows;
pub mod session;

use thiserror::Error;

// Re-export main types for convenience
pub use assistant::{
    analyze_product_value, find_coupons, generate_trip_itinerary, get_shopping_advice,
    ItineraryRequest, FALLBACK_COUPONS,
};
pub use backend::{DataService, RowStore, SupabaseClient};
pub use client::{GeminiClient, GenerateRequest, GenerativeModel, Unconfigured};
pub use config::Config;
pub use metrics::DashboardSummary;
pub use models::*;
pub use preferences::{Theme, ThemeStore};
pub use rows::{product_to_row, row_to_product, row_to_trip, trip_to_row, ProductRow, TripRow};
pub use session::{NewProduct, Rehydrated, Session};

/// Error types for the trackifly library
#[derive(Error, Debug)]
pub enum TrackiflyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{service} responded with status {status}: {body}")]
    StatusError {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Invalid {kind}: {value}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Preference storage failed: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrackiflyError {
    pub(crate) fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        TrackiflyError::InvalidValue {
            kind,
            value: value.into(),
        }
    }
}
