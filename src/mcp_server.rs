// src/mcp_server.rs

use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use trackifly::{
    analyze_product_value, find_coupons as find_coupons_internal, generate_trip_itinerary,
    get_shopping_advice, logging,
    Config, ItineraryRequest, Language, Session, TripPreferences, TripType, UserProfile,
};

/// Shopping and travel assistant MCP server over one in-memory session
#[derive(Clone)]
pub struct TrackiflyServer {
    session: Arc<Mutex<Session>>,
}

impl TrackiflyServer {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct AdviceParams {
    #[schemars(description = "Shopping or travel question, answered against the tracked products and trips")]
    pub query: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct ProductParams {
    #[schemars(description = "Id of a tracked product (see the dashboard tool)")]
    pub product_id: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct CouponParams {
    #[schemars(description = "Store URL or name to find promotional codes for")]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct TripPlanParams {
    #[schemars(description = "Origin city")]
    pub origin: String,
    #[schemars(description = "Destination city")]
    pub destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format")]
    pub start_date: String,
    #[schemars(description = "Return date in YYYY-MM-DD format for round trips")]
    pub end_date: Option<String>,
    #[schemars(description = "Trip type: one-way or round-trip (default round-trip)")]
    pub trip_type: Option<String>,
    #[schemars(description = "Total budget")]
    pub budget: f64,
    #[schemars(description = "Currency code for the budget (default USD)")]
    pub currency: Option<String>,
    #[schemars(description = "Number of travelers (default 1)")]
    pub travelers: Option<u32>,
    #[schemars(description = "Include hotel options")]
    pub needs_hotel: Option<bool>,
    #[schemars(description = "Include car rental options")]
    pub needs_car: Option<bool>,
    #[schemars(description = "Dietary restrictions for food recommendations")]
    pub dietary_restrictions: Option<String>,
    #[schemars(description = "Output language code: en, es, fr, de, hu, ur, ar, zh, hi, pt (default en)")]
    pub language: Option<String>,
    #[schemars(description = "Save the generated plan as a trip in the session")]
    pub save: Option<bool>,
}

#[tool(tool_box)]
impl TrackiflyServer {
    #[tool(description = "Ask the shopping assistant a question. It sees the tracked products and planned trips.")]
    async fn shopping_advice(&self, #[tool(aggr)] params: AdviceParams) -> String {
        info!(query_length = params.query.len(), "Shopping advice request received");
        let (model, products, trips) = {
            let session = self.session.lock().await;
            (session.model(), session.products().to_vec(), session.trips().to_vec())
        };
        get_shopping_advice(model.as_ref(), &params.query, &products, &trips).await
    }

    #[tool(description = "Get a short buy-now or wait verdict for a tracked product based on its price history.")]
    async fn analyze_product(&self, #[tool(aggr)] params: ProductParams) -> String {
        info!(product_id = %params.product_id, "Product analysis request received");

        let (product, model) = {
            let mut session = self.session.lock().await;
            if session.is_analyzing(&params.product_id) {
                warn!(product_id = %params.product_id, "Analysis already in progress");
                return error_reply("Analysis already in progress for this product");
            }
            match session.begin_analysis(&params.product_id) {
                Some(product) => (product, session.model()),
                None => {
                    warn!(product_id = %params.product_id, "Unknown product");
                    return error_reply(format!("No product with id {}", params.product_id));
                }
            }
        };

        let verdict = analyze_product_value(model.as_ref(), &product).await;
        self.session
            .lock()
            .await
            .finish_analysis(&params.product_id, verdict.clone());

        serde_json::json!({
            "product_id": product.id,
            "name": product.name,
            "current_price": product.current_price,
            "target_price": product.target_price,
            "analysis": verdict,
        })
        .to_string()
    }

    #[tool(description = "Generate a day-by-day trip itinerary with flight, hotel, car rental and food suggestions. Returns structured JSON.")]
    async fn plan_trip(&self, #[tool(aggr)] params: TripPlanParams) -> String {
        info!(
            origin = %params.origin,
            destination = %params.destination,
            start_date = %params.start_date,
            budget = params.budget,
            "Trip plan request received"
        );

        let (request, language) = match build_itinerary_request(params.clone()) {
            Ok(built) => built,
            Err(e) => {
                error!("Error building itinerary request: {}", e);
                return error_reply(e);
            }
        };

        let model = {
            let mut session = self.session.lock().await;
            if !session.begin_itinerary() {
                warn!("Itinerary generation already in progress");
                return error_reply("An itinerary is already being generated");
            }
            session.model()
        };

        let plan = generate_trip_itinerary(model.as_ref(), &request, language).await;

        let mut session = self.session.lock().await;
        session.finish_itinerary();

        let Some(plan) = plan else {
            return error_reply("Could not generate an itinerary. Check the API key and try again.");
        };

        let json = match plan.export_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize plan: {}", e);
                return error_reply(format!("Failed to serialize plan: {}", e));
            }
        };

        if params.save.unwrap_or(false) {
            // The write completes on its own; the plan is returned either way.
            drop(session.save_trip(&request, plan));
            debug!(trip_id = %session.trips()[0].id, "Plan saved as trip");
        }
        json
    }

    #[tool(description = "Find 3 to 5 promotional codes for a store. Falls back to common generic codes when none are found.")]
    async fn find_coupons(&self, #[tool(aggr)] params: CouponParams) -> String {
        info!(url = %params.url, "Coupon search request received");

        let model = {
            let mut session = self.session.lock().await;
            if !session.begin_coupon_search() {
                warn!("Coupon search already in progress");
                return error_reply("A coupon search is already running");
            }
            session.model()
        };

        let codes = find_coupons_internal(model.as_ref(), &params.url).await;
        self.session.lock().await.finish_coupon_search();

        serde_json::json!({ "url": params.url, "codes": codes }).to_string()
    }

    #[tool(description = "Summary of tracked products and trips: total savings, price drops, active trips.")]
    async fn dashboard(&self) -> String {
        let session = self.session.lock().await;
        let summary = session.dashboard();
        info!(
            tracked_products = summary.tracked_products,
            active_trips = summary.active_trips,
            "Dashboard requested"
        );

        serde_json::json!({
            "summary": summary,
            "products": session.products(),
            "trips": session.trips(),
            "unread_notifications": session.unread_notifications(),
        })
        .to_string()
    }
}

fn error_reply(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

fn build_itinerary_request(params: TripPlanParams) -> Result<(ItineraryRequest, Language), String> {
    let trip_type = params
        .trip_type
        .as_deref()
        .unwrap_or("round-trip")
        .parse::<TripType>()
        .map_err(|e| e.to_string())?;

    let language = params
        .language
        .as_deref()
        .unwrap_or("en")
        .parse::<Language>()
        .map_err(|e| e.to_string())?;

    if !params.budget.is_finite() || params.budget < 0.0 {
        return Err(format!("Invalid budget: {}", params.budget));
    }

    let request = ItineraryRequest {
        origin: params.origin,
        destination: params.destination,
        start_date: params.start_date,
        end_date: params.end_date,
        trip_type,
        budget: params.budget,
        currency: params.currency.unwrap_or_else(|| "USD".to_string()),
        travelers: params.travelers.unwrap_or(1).max(1),
        preferences: TripPreferences {
            needs_hotel: params.needs_hotel.unwrap_or(false),
            needs_car: params.needs_car.unwrap_or(false),
            dietary_restrictions: params.dietary_restrictions,
        },
    };
    Ok((request, language))
}

#[tool(tool_box)]
impl ServerHandler for TrackiflyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("A shopping and travel assistant. Ask for advice, analyze tracked product prices, generate trip itineraries as structured JSON, find coupon codes, and read the dashboard summary.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // stdout carries the protocol, so logs go to files
    if let Err(e) = logging::init_file(&PathBuf::from("logs"), "trackifly-mcp.log") {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting Trackifly MCP server");

    let config = Config::from_env();
    let user = UserProfile::authenticated(None, "demo@trackifly.app", None);
    let mut session = Session::login(user, config.data_service(), config.model_or_fallback());
    let replaced = session.rehydrate().await;
    debug!(?replaced, "Session ready");

    let server = TrackiflyServer::new(session);
    let transport = stdio();

    let service = server.serve(transport).await?;
    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use trackifly::{DataService, GenerateRequest, GenerativeModel, TrackiflyError};

    /// Takes longer to answer than any caller should wait on the session
    struct SlowModel;

    #[async_trait]
    impl GenerativeModel for SlowModel {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, TrackiflyError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok("Wait for the next sale.".to_string())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn params() -> TripPlanParams {
        TripPlanParams {
            origin: "Berlin".to_string(),
            destination: "Rome".to_string(),
            start_date: "2024-05-01".to_string(),
            end_date: None,
            trip_type: None,
            budget: 1500.0,
            currency: None,
            travelers: Some(0),
            needs_hotel: Some(true),
            needs_car: None,
            dietary_restrictions: None,
            language: Some("it".to_string()),
            save: None,
        }
    }

    #[test]
    fn test_build_itinerary_request_rejects_unknown_language() {
        assert!(build_itinerary_request(params()).is_err());
    }

    #[test]
    fn test_build_itinerary_request_defaults() {
        let mut params = params();
        params.language = None;
        let (request, language) = build_itinerary_request(params).unwrap();
        assert_eq!(language, Language::En);
        assert_eq!(request.trip_type, TripType::RoundTrip);
        assert_eq!(request.currency, "USD");
        assert_eq!(request.travelers, 1);
        assert!(request.preferences.needs_hotel);
        assert!(!request.preferences.needs_car);
    }

    #[test]
    fn test_error_reply_escapes_message() {
        let message = r#"Invalid trip type: "weekend\trip""#;
        let reply: serde_json::Value = serde_json::from_str(&error_reply(message)).unwrap();
        assert_eq!(reply["error"], message);
    }

    #[tokio::test]
    async fn test_dashboard_not_blocked_by_advice() {
        let user = UserProfile::authenticated(None, "demo@example.com", None);
        let session = Session::login(user, DataService::unconfigured(), Arc::new(SlowModel));
        let server = TrackiflyServer::new(session);

        let advising = server.clone();
        let advice = tokio::spawn(async move {
            advising
                .shopping_advice(AdviceParams { query: "Should I buy now?".to_string() })
                .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let dashboard = tokio::time::timeout(Duration::from_secs(1), server.dashboard()).await;
        assert!(dashboard.is_ok());
        advice.abort();
    }
}
