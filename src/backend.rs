//! Supabase persistence for products and trips
//!
//! [`SupabaseClient`] talks to the PostgREST API and propagates errors.
//! [`DataService`] sits on top of any [`RowStore`] and turns every failure, or
//! a missing store, into the documented no-op result: empty lists on read and
//! `false` on write.

use crate::models::{Product, Trip};
use crate::rows::{
    product_to_row, row_to_product, row_to_trip, trip_to_row, ProductRow, TripRow,
    PRODUCT_COLUMNS, TRIP_COLUMNS,
};
use crate::TrackiflyError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const PRODUCTS_TABLE: &str = "products";
pub const TRIPS_TABLE: &str = "trips";

/// Minimal table access needed by [`DataService`]
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All rows of `table` with the given columns, newest id first
    async fn select(&self, table: &str, columns: &str) -> Result<Vec<Value>, TrackiflyError>;

    async fn insert(&self, table: &str, row: Value) -> Result<(), TrackiflyError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), TrackiflyError>;
}

/// PostgREST client authenticated with the project's anonymous key
#[derive(Clone)]
pub struct SupabaseClient {
    http_client: Client,
    base_url: String,
    anon_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, TrackiflyError> {
        debug!("Creating new Supabase client");
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http_client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TrackiflyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackiflyError::StatusError {
            service: "supabase",
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl RowStore for SupabaseClient {
    #[instrument(level = "debug", skip(self, columns))]
    async fn select(&self, table: &str, columns: &str) -> Result<Vec<Value>, TrackiflyError> {
        let start_time = std::time::Instant::now();
        let response = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", columns), ("order", "id.desc")])
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        info!(
            table,
            rows = rows.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Fetched rows"
        );
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self, row))]
    async fn insert(&self, table: &str, row: Value) -> Result<(), TrackiflyError> {
        let response = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;
        debug!(table, "Inserted row");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, table: &str, id: &str) -> Result<(), TrackiflyError> {
        let filter = format!("eq.{}", id);
        let response = self
            .request(reqwest::Method::DELETE, table)
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        debug!(table, id, "Deleted row");
        Ok(())
    }
}

/// Never-failing persistence façade used by the session.
///
/// Cheap to clone. Without a store every read is empty and every write
/// reports `false`.
#[derive(Clone, Default)]
pub struct DataService {
    store: Option<Arc<dyn RowStore>>,
}

impl DataService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub async fn fetch_products(&self) -> Vec<Product> {
        self.select(PRODUCTS_TABLE, PRODUCT_COLUMNS)
            .await
            .into_iter()
            .map(|row| row_to_product(ProductRow::from_value(row)))
            .collect()
    }

    pub async fn insert_product(&self, product: &Product) -> bool {
        match serde_json::to_value(product_to_row(product)) {
            Ok(row) => self.insert(PRODUCTS_TABLE, row).await,
            Err(e) => {
                warn!(error = %e, product_id = %product.id, "Could not encode product row");
                false
            }
        }
    }

    pub async fn delete_product(&self, id: &str) -> bool {
        self.delete(PRODUCTS_TABLE, id).await
    }

    pub async fn fetch_trips(&self) -> Vec<Trip> {
        self.select(TRIPS_TABLE, TRIP_COLUMNS)
            .await
            .into_iter()
            .map(|row| row_to_trip(TripRow::from_value(row)))
            .collect()
    }

    pub async fn insert_trip(&self, trip: &Trip) -> bool {
        match serde_json::to_value(trip_to_row(trip)) {
            Ok(row) => self.insert(TRIPS_TABLE, row).await,
            Err(e) => {
                warn!(error = %e, trip_id = %trip.id, "Could not encode trip row");
                false
            }
        }
    }

    pub async fn delete_trip(&self, id: &str) -> bool {
        self.delete(TRIPS_TABLE, id).await
    }

    async fn select(&self, table: &str, columns: &str) -> Vec<Value> {
        let Some(store) = &self.store else {
            debug!(table, "Backend not configured, nothing to fetch");
            return Vec::new();
        };
        match store.select(table, columns).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table, error = %e, "Fetch failed, returning no rows");
                Vec::new()
            }
        }
    }

    async fn insert(&self, table: &str, row: Value) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.insert(table, row).await {
            Ok(()) => true,
            Err(e) => {
                warn!(table, error = %e, "Insert failed");
                false
            }
        }
    }

    async fn delete(&self, table: &str, id: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.delete(table, id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(table, id, error = %e, "Delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory tables; optionally fails every call
    #[derive(Default)]
    struct MemoryStore {
        tables: Mutex<HashMap<String, Vec<Value>>>,
        broken: bool,
    }

    #[async_trait]
    impl RowStore for MemoryStore {
        async fn select(&self, table: &str, _columns: &str) -> Result<Vec<Value>, TrackiflyError> {
            if self.broken {
                return Err(TrackiflyError::MissingConfig("test"));
            }
            Ok(self.tables.lock().unwrap().get(table).cloned().unwrap_or_default())
        }

        async fn insert(&self, table: &str, row: Value) -> Result<(), TrackiflyError> {
            if self.broken {
                return Err(TrackiflyError::MissingConfig("test"));
            }
            self.tables.lock().unwrap().entry(table.to_string()).or_default().push(row);
            Ok(())
        }

        async fn delete(&self, table: &str, id: &str) -> Result<(), TrackiflyError> {
            if self.broken {
                return Err(TrackiflyError::MissingConfig("test"));
            }
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.retain(|r| r["id"] != json!(id));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unconfigured_is_noop() {
        let service = DataService::unconfigured();
        assert!(!service.is_configured());
        assert!(service.fetch_products().await.is_empty());
        assert!(service.fetch_trips().await.is_empty());

        let product = crate::defaults::sample_products().remove(0);
        assert!(!service.insert_product(&product).await);
        assert!(!service.delete_product("1").await);
        assert!(!service.delete_trip("t1").await);
    }

    #[tokio::test]
    async fn test_failing_store_is_swallowed() {
        let store = MemoryStore { broken: true, ..Default::default() };
        let service = DataService::new(Arc::new(store));
        assert!(service.fetch_products().await.is_empty());

        let trip = crate::defaults::sample_trips().remove(0);
        assert!(!service.insert_trip(&trip).await);
        assert!(!service.delete_trip(&trip.id).await);
    }

    #[tokio::test]
    async fn test_products_persist_through_rows() {
        let service = DataService::new(Arc::new(MemoryStore::default()));
        let products = crate::defaults::sample_products();
        for product in &products {
            assert!(service.insert_product(product).await);
        }
        assert_eq!(service.fetch_products().await, products);

        assert!(service.delete_product("2").await);
        let remaining: Vec<String> = service.fetch_products().await.into_iter().map(|p| p.id).collect();
        assert_eq!(remaining, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_trips_persist_through_rows() {
        let service = DataService::new(Arc::new(MemoryStore::default()));
        let trips = crate::defaults::sample_trips();
        for trip in &trips {
            assert!(service.insert_trip(trip).await);
        }
        assert_eq!(service.fetch_trips().await, trips);
    }

    #[tokio::test]
    async fn test_legacy_rows_are_mapped() {
        let store = MemoryStore::default();
        store.tables.lock().unwrap().insert(
            TRIPS_TABLE.to_string(),
            vec![json!({ "id": 9, "destination": "Lisbon", "roundtrip": true, "people": "4" })],
        );
        let trips = DataService::new(Arc::new(store)).fetch_trips().await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "9");
        assert_eq!(trips[0].travelers, 4);
        assert_eq!(trips[0].trip_type, crate::models::TripType::RoundTrip);
    }

    #[test]
    fn test_table_url() {
        let client = SupabaseClient::new("https://abc.supabase.co/", "anon").unwrap();
        assert_eq!(client.table_url("products"), "https://abc.supabase.co/rest/v1/products");
    }

    #[tokio::test]
    async fn test_unreachable_backend_fetches_nothing() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon").unwrap();
        assert!(matches!(
            client.select(PRODUCTS_TABLE, PRODUCT_COLUMNS).await,
            Err(TrackiflyError::HttpError(_))
        ));

        let service = DataService::new(Arc::new(client));
        assert!(service.fetch_products().await.is_empty());
    }
}
