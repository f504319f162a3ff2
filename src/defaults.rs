//! Zero-state content and image lookup.
//!
//! A fresh session starts from these records; the backend only ever replaces
//! them with something non-empty.

use crate::models::{
    Category, Notification, NotificationKind, PricePoint, Product, Trip, TripPreferences,
    TripStatus, TripType,
};

const GENERIC_PRODUCT_IMAGE: &str =
    "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&fit=crop&w=800&q=80";
const GENERIC_DESTINATION_IMAGE: &str =
    "https://images.unsplash.com/photo-1469854523086-cc02fe5d8800?auto=format&fit=crop&w=800&q=80";

/// (keywords, image) pairs checked in order against the lower-cased product name
const PRODUCT_IMAGES: &[(&[&str], &str)] = &[
    (&["headphone", "sony", "bose", "audio"], "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?auto=format&fit=crop&w=800&q=80"),
    (&["laptop", "macbook", "computer"], "https://images.unsplash.com/photo-1496181133206-80ce9b88a853?auto=format&fit=crop&w=800&q=80"),
    (&["camera", "canon", "nikon"], "https://images.unsplash.com/photo-1516035069371-29a1b244cc32?auto=format&fit=crop&w=800&q=80"),
    (&["shoe", "sneaker", "nike", "adidas"], "https://images.unsplash.com/photo-1542291026-7eec264c27ff?auto=format&fit=crop&w=800&q=80"),
    (&["watch", "rolex", "smartwatch"], "https://images.unsplash.com/photo-1524592094714-0f0654e20314?auto=format&fit=crop&w=800&q=80"),
    (&["chair", "sofa", "furniture"], "https://images.unsplash.com/photo-1592078615290-033ee584e267?auto=format&fit=crop&w=800&q=80"),
    (&["phone", "iphone", "samsung", "android"], "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?auto=format&fit=crop&w=800&q=80"),
    (&["flight", "trip", "travel"], "https://images.unsplash.com/photo-1436491865332-7a61a109cc05?auto=format&fit=crop&w=800&q=80"),
];

const DESTINATION_IMAGES: &[(&[&str], &str)] = &[
    (&["japan", "tokyo", "kyoto"], "https://images.unsplash.com/photo-1542051841857-5f90071e7989?auto=format&fit=crop&w=800&q=80"),
    (&["paris", "france"], "https://images.unsplash.com/photo-1502602898657-3e91760cbb34?auto=format&fit=crop&w=800&q=80"),
    (&["london", "uk", "england"], "https://images.unsplash.com/photo-1513635269975-59663e0ac1ad?auto=format&fit=crop&w=800&q=80"),
    (&["new york", "nyc"], "https://images.unsplash.com/photo-1496442226666-8d4a0e62e6e9?auto=format&fit=crop&w=800&q=80"),
    (&["iceland"], "https://images.unsplash.com/photo-1476610182048-b716b8518aae?auto=format&fit=crop&w=800&q=80"),
    (&["italy", "rome"], "https://images.unsplash.com/photo-1552832230-c0197dd311b5?auto=format&fit=crop&w=800&q=80"),
    (&["dubai", "uae"], "https://images.unsplash.com/photo-1512453979798-5ea266f8880c?auto=format&fit=crop&w=800&q=80"),
];

fn lookup(table: &[(&[&str], &'static str)], text: &str, fallback: &'static str) -> &'static str {
    let text = text.to_lowercase();
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map_or(fallback, |(_, image)| *image)
}

pub fn product_image_for(name: &str) -> &'static str {
    lookup(PRODUCT_IMAGES, name, GENERIC_PRODUCT_IMAGE)
}

pub fn destination_image_for(destination: &str) -> &'static str {
    lookup(DESTINATION_IMAGES, destination, GENERIC_DESTINATION_IMAGE)
}

fn history(points: &[(&str, f64)]) -> Vec<PricePoint> {
    points
        .iter()
        .map(|(date, price)| PricePoint {
            date: date.to_string(),
            price: *price,
        })
        .collect()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| t.to_string()).collect()
}

pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            id: "1".to_string(),
            name: "Sony WH-1000XM5 Wireless Headphones".to_string(),
            category: Category::Electronics,
            current_price: 348.0,
            original_price: 399.0,
            target_price: 299.0,
            image_url: PRODUCT_IMAGES[0].1.to_string(),
            url: "https://example.com/sony-headphones".to_string(),
            history: history(&[
                ("2023-10-01", 399.0),
                ("2023-11-01", 399.0),
                ("2023-12-01", 348.0),
                ("2024-01-01", 348.0),
                ("2024-02-01", 329.0),
                ("2024-03-01", 348.0),
            ]),
            tags: tags(&["noise-canceling", "audio", "tech"]),
        },
        Product {
            id: "2".to_string(),
            name: "Herman Miller Aeron Chair".to_string(),
            category: Category::Home,
            current_price: 1250.0,
            original_price: 1600.0,
            target_price: 1000.0,
            image_url: "https://images.unsplash.com/photo-1505843490538-5133c6c7d0e1?auto=format&fit=crop&w=800&q=80".to_string(),
            url: "https://example.com/chair".to_string(),
            history: history(&[
                ("2023-10-01", 1600.0),
                ("2023-12-15", 1450.0),
                ("2024-01-10", 1250.0),
            ]),
            tags: tags(&["ergonomic", "office", "furniture"]),
        },
        Product {
            id: "3".to_string(),
            name: "Flight: NYC to Tokyo (JAL)".to_string(),
            category: Category::Travel,
            current_price: 1450.0,
            original_price: 2100.0,
            target_price: 1200.0,
            image_url: DESTINATION_IMAGES[0].1.to_string(),
            url: "https://example.com/flight-nyc-tokyo".to_string(),
            history: history(&[
                ("2024-01-01", 2100.0),
                ("2024-01-15", 1800.0),
                ("2024-02-01", 1450.0),
                ("2024-02-15", 1550.0),
            ]),
            tags: tags(&["flight", "international", "vacation"]),
        },
    ]
}

pub fn sample_trips() -> Vec<Trip> {
    vec![
        Trip {
            id: "t1".to_string(),
            origin: "New York, USA".to_string(),
            destination: "Kyoto, Japan".to_string(),
            start_date: "2024-04-10".to_string(),
            end_date: "2024-04-24".to_string(),
            trip_type: TripType::RoundTrip,
            travelers: 2,
            budget: 5000.0,
            currency: "USD".to_string(),
            estimated_cost: 4200.0,
            status: TripStatus::Planning,
            activities: tags(&["Temple Visit", "Tea Ceremony", "Bamboo Forest"]),
            structured_plan: None,
            image_url: Some("https://images.unsplash.com/photo-1493976040374-85c8e12f0c0e?auto=format&fit=crop&w=800&q=80".to_string()),
            preferences: TripPreferences {
                needs_hotel: true,
                needs_car: false,
                dietary_restrictions: None,
            },
        },
        Trip {
            id: "t2".to_string(),
            origin: "London, UK".to_string(),
            destination: "Iceland Ring Road".to_string(),
            start_date: "2024-08-01".to_string(),
            end_date: "2024-08-10".to_string(),
            trip_type: TripType::RoundTrip,
            travelers: 2,
            budget: 3500.0,
            currency: "USD".to_string(),
            estimated_cost: 3800.0,
            status: TripStatus::Planning,
            activities: tags(&["Glacier Hike", "Blue Lagoon", "Northern Lights"]),
            structured_plan: None,
            image_url: Some(DESTINATION_IMAGES[4].1.to_string()),
            preferences: TripPreferences {
                needs_hotel: true,
                needs_car: true,
                dietary_restrictions: None,
            },
        },
    ]
}

pub fn sample_notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: "1".to_string(),
            title: "Price Drop Alert!".to_string(),
            message: "Sony WH-1000XM5 has dropped to $348.00 (13% off).".to_string(),
            kind: NotificationKind::PriceDrop,
            is_read: false,
            timestamp: "10 mins ago".to_string(),
        },
        Notification {
            id: "2".to_string(),
            title: "Trip Recommendation".to_string(),
            message: "Flights to Kyoto are trending cheaper for April.".to_string(),
            kind: NotificationKind::TripAlert,
            is_read: false,
            timestamp: "2 hours ago".to_string(),
        },
        Notification {
            id: "3".to_string(),
            title: "Welcome to Trackifly".to_string(),
            message: "Start tracking products to see your dashboard come alive.".to_string(),
            kind: NotificationKind::System,
            is_read: true,
            timestamp: "1 day ago".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_image_lookup() {
        assert_eq!(product_image_for("Bose QuietComfort"), PRODUCT_IMAGES[0].1);
        assert_eq!(product_image_for("Nike Pegasus Shoes"), PRODUCT_IMAGES[3].1);
        assert_eq!(product_image_for("Garden hose"), GENERIC_PRODUCT_IMAGE);
    }

    #[test]
    fn test_destination_image_lookup() {
        assert_eq!(destination_image_for("Paris, France"), DESTINATION_IMAGES[1].1);
        assert_eq!(destination_image_for("NYC"), DESTINATION_IMAGES[3].1);
        assert_eq!(destination_image_for("Lima"), GENERIC_DESTINATION_IMAGE);
    }

    #[test]
    fn test_sample_products_are_consistent() {
        for product in sample_products() {
            assert!(product.history_is_chronological(), "{}", product.name);
        }
    }
}
