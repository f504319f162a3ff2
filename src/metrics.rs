//! Dashboard aggregates, recomputed from the collections on every call.

use crate::models::{Product, Trip, TripStatus};
use serde::Serialize;

/// Sum of `original - current` over all products.
///
/// Products priced above their original price contribute a negative amount.
pub fn total_savings(products: &[Product]) -> f64 {
    products.iter().map(Product::savings).sum()
}

/// Trips still being planned
pub fn active_trip_count(trips: &[Trip]) -> usize {
    trips
        .iter()
        .filter(|t| t.status == TripStatus::Planning)
        .count()
}

/// Products currently priced below their original price.
pub fn price_drop_count(products: &[Product]) -> usize {
    products.iter().filter(|p| has_price_drop(p)).count()
}

pub fn has_price_drop(product: &Product) -> bool {
    product.current_price < product.original_price
}

/// Share of the budget already committed, as a percentage capped at 100.
pub fn budget_utilization(trip: &Trip) -> f64 {
    if trip.budget <= 0.0 {
        return 0.0;
    }
    (trip.estimated_cost * 100.0 / trip.budget).min(100.0)
}

pub fn is_over_budget(trip: &Trip) -> bool {
    trip.estimated_cost > trip.budget
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_savings: f64,
    pub price_drops: usize,
    pub active_trips: usize,
    pub tracked_products: usize,
}

impl DashboardSummary {
    pub fn compute(products: &[Product], trips: &[Trip]) -> Self {
        Self {
            total_savings: total_savings(products),
            price_drops: price_drop_count(products),
            active_trips: active_trip_count(trips),
            tracked_products: products.len(),
        }
    }
}
