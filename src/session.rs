//! Application state for one signed-in user.
//!
//! A [`Session`] is created at login from the built-in zero-state data and torn
//! down at logout. The backend is only an optional mirror: [`Session::rehydrate`]
//! may replace a collection with what it returns, and writes are spawned after
//! the local change without ever rolling it back.

use crate::assistant::{self, ItineraryRequest};
use crate::backend::DataService;
use crate::client::GenerativeModel;
use crate::defaults::{
    destination_image_for, product_image_for, sample_notifications, sample_products, sample_trips,
};
use crate::metrics::DashboardSummary;
use crate::models::{
    Category, Currency, Language, Notification, PricePoint, Product, Trip, TripPlan, TripStatus,
    TripType, UserProfile,
};
use chrono::{SecondsFormat, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

const ORIGINAL_PRICE_MARKUP: f64 = 1.1;
const TARGET_PRICE_DISCOUNT: f64 = 0.9;
const ESTIMATED_COST_SHARE: f64 = 0.95;

/// User input for tracking a new product
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub url: String,
    pub price: f64,
}

/// Result of [`Session::rehydrate`]: which collections were replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rehydrated {
    pub products: bool,
    pub trips: bool,
}

pub struct Session {
    user: UserProfile,
    products: Vec<Product>,
    trips: Vec<Trip>,
    notifications: Vec<Notification>,
    language: Language,
    currency: Currency,
    data: DataService,
    model: Arc<dyn GenerativeModel>,
    analyses: HashMap<String, String>,
    pending_analyses: HashSet<String>,
    generating_itinerary: bool,
    searching_coupons: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.email)
            .field("products", &self.products.len())
            .field("trips", &self.trips.len())
            .field("model", &self.model.name())
            .field("backend", &self.data.is_configured())
            .finish()
    }
}

impl Session {
    /// Start a session on the zero-state data
    pub fn login(user: UserProfile, data: DataService, model: Arc<dyn GenerativeModel>) -> Self {
        info!(email = %user.email, account = ?user.account_type, "Session started");
        Self {
            user,
            products: sample_products(),
            trips: sample_trips(),
            notifications: sample_notifications(),
            language: Language::default(),
            currency: Currency::default(),
            data,
            model,
            analyses: HashMap::new(),
            pending_analyses: HashSet::new(),
            generating_itinerary: false,
            searching_coupons: false,
        }
    }

    /// End the session, handing back the user that owned it
    pub fn logout(self) -> UserProfile {
        info!(email = %self.user.email, "Session ended");
        self.user
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    pub fn model(&self) -> Arc<dyn GenerativeModel> {
        Arc::clone(&self.model)
    }

    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary::compute(&self.products, &self.trips)
    }

    /// Replace each collection with the backend's copy when it has one.
    ///
    /// An empty answer (no backend, failed fetch, or empty table) keeps the
    /// current data.
    #[instrument(level = "info", skip(self))]
    pub async fn rehydrate(&mut self) -> Rehydrated {
        let (products, trips) = tokio::join!(self.data.fetch_products(), self.data.fetch_trips());
        let mut replaced = Rehydrated::default();

        if !products.is_empty() {
            info!(count = products.len(), "Products loaded from backend");
            self.products = products;
            replaced.products = true;
        }
        if !trips.is_empty() {
            info!(count = trips.len(), "Trips loaded from backend");
            self.trips = trips;
            replaced.trips = true;
        }
        replaced
    }

    /// Track a product. Shown immediately; the returned handle resolves to
    /// whether the backend accepted it.
    ///
    /// # Panics
    ///
    /// Persistence is spawned, so this must be called from within a Tokio runtime.
    pub fn add_product(&mut self, input: NewProduct) -> JoinHandle<bool> {
        let product = Product {
            id: self.next_id(),
            image_url: product_image_for(&input.name).to_string(),
            category: Category::Electronics,
            current_price: input.price,
            original_price: input.price * ORIGINAL_PRICE_MARKUP,
            target_price: input.price * TARGET_PRICE_DISCOUNT,
            history: vec![PricePoint {
                date: now_iso(),
                price: input.price,
            }],
            tags: vec!["new".to_string()],
            name: input.name,
            url: input.url,
        };
        debug!(product_id = %product.id, "Product added");
        self.products.insert(0, product.clone());

        let data = self.data.clone();
        tokio::spawn(async move { data.insert_product(&product).await })
    }

    /// Stop tracking a product. The handle resolves to whether the backend row was deleted.
    ///
    /// # Panics
    ///
    /// Persistence is spawned, so this must be called from within a Tokio runtime.
    pub fn remove_product(&mut self, id: &str) -> JoinHandle<bool> {
        self.products.retain(|p| p.id != id);
        self.analyses.remove(id);

        let (data, id) = (self.data.clone(), id.to_string());
        tokio::spawn(async move { data.delete_product(&id).await })
    }

    /// Store a generated plan as a new trip in the planning state
    ///
    /// # Panics
    ///
    /// Persistence is spawned, so this must be called from within a Tokio runtime.
    pub fn save_trip(&mut self, request: &ItineraryRequest, plan: TripPlan) -> JoinHandle<bool> {
        let end_date = match request.trip_type {
            TripType::RoundTrip => request.end_date.clone().unwrap_or_default(),
            TripType::OneWay => String::new(),
        };
        let trip = Trip {
            id: self.next_id(),
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            start_date: request.start_date.clone(),
            end_date,
            trip_type: request.trip_type,
            travelers: request.travelers,
            budget: request.budget,
            currency: request.currency.clone(),
            estimated_cost: request.budget * ESTIMATED_COST_SHARE,
            status: TripStatus::Planning,
            activities: plan.activities(),
            image_url: Some(destination_image_for(&request.destination).to_string()),
            preferences: request.preferences.clone(),
            structured_plan: Some(plan),
        };
        debug!(trip_id = %trip.id, destination = %trip.destination, "Trip saved");
        self.trips.insert(0, trip.clone());

        let data = self.data.clone();
        tokio::spawn(async move { data.insert_trip(&trip).await })
    }

    /// # Panics
    ///
    /// Persistence is spawned, so this must be called from within a Tokio runtime.
    pub fn delete_trip(&mut self, id: &str) -> JoinHandle<bool> {
        self.trips.retain(|t| t.id != id);

        let (data, id) = (self.data.clone(), id.to_string());
        tokio::spawn(async move { data.delete_trip(&id).await })
    }

    pub fn analysis(&self, product_id: &str) -> Option<&str> {
        self.analyses.get(product_id).map(String::as_str)
    }

    pub fn is_analyzing(&self, product_id: &str) -> bool {
        self.pending_analyses.contains(product_id)
    }

    /// Mark an analysis as in flight. `None` if the product is unknown or
    /// already being analysed.
    pub fn begin_analysis(&mut self, product_id: &str) -> Option<Product> {
        let product = self.product(product_id)?.clone();
        self.pending_analyses
            .insert(product_id.to_string())
            .then_some(product)
    }

    pub fn finish_analysis(&mut self, product_id: &str, verdict: String) {
        self.pending_analyses.remove(product_id);
        self.analyses.insert(product_id.to_string(), verdict);
    }

    pub async fn analyze_product(&mut self, product_id: &str) -> Option<String> {
        let product = self.begin_analysis(product_id)?;
        let verdict = assistant::analyze_product_value(self.model.as_ref(), &product).await;
        self.finish_analysis(product_id, verdict.clone());
        Some(verdict)
    }

    pub fn is_generating_itinerary(&self) -> bool {
        self.generating_itinerary
    }

    /// Returns false when a generation is already running
    pub fn begin_itinerary(&mut self) -> bool {
        !std::mem::replace(&mut self.generating_itinerary, true)
    }

    pub fn finish_itinerary(&mut self) {
        self.generating_itinerary = false;
    }

    /// `None` while another generation is pending or when no plan could be
    /// produced.
    pub async fn generate_itinerary(&mut self, request: &ItineraryRequest) -> Option<TripPlan> {
        if !self.begin_itinerary() {
            debug!("Itinerary generation already in progress");
            return None;
        }
        let plan =
            assistant::generate_trip_itinerary(self.model.as_ref(), request, self.language).await;
        self.finish_itinerary();
        plan
    }

    pub fn is_searching_coupons(&self) -> bool {
        self.searching_coupons
    }

    pub fn begin_coupon_search(&mut self) -> bool {
        !std::mem::replace(&mut self.searching_coupons, true)
    }

    pub fn finish_coupon_search(&mut self) {
        self.searching_coupons = false;
    }

    /// `None` only while another search is pending
    pub async fn find_coupons(&mut self, url: &str) -> Option<Vec<String>> {
        if !self.begin_coupon_search() {
            debug!("Coupon search already in progress");
            return None;
        }
        let codes = assistant::find_coupons(self.model.as_ref(), url).await;
        self.finish_coupon_search();
        Some(codes)
    }

    pub async fn ask(&self, query: &str) -> String {
        assistant::get_shopping_advice(self.model.as_ref(), query, &self.products, &self.trips)
            .await
    }

    // Millisecond timestamps, bumped past any id already in use.
    fn next_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        loop {
            let id = candidate.to_string();
            let taken = self.products.iter().any(|p| p.id == id)
                || self.trips.iter().any(|t| t.id == id);
            if !taken {
                return id;
            }
            candidate += 1;
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
