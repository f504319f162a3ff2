//! CLI interface for trackifly

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use trackifly::metrics::{budget_utilization, has_price_drop, is_over_budget};
use trackifly::{
    logging, Config, Currency, ItineraryRequest, Language, NewProduct, Session, TripPlan,
    TripPreferences, TripType, UserProfile,
};

#[derive(Parser)]
#[command(name = "trackifly")]
#[command(about = "Track prices, plan trips and find coupons")]
#[command(version)]
pub struct Cli {
    /// Sign in as a guest with this name instead of the demo account
    #[arg(long, global = true)]
    pub guest: Option<String>,
    /// Email for the session
    #[arg(long, global = true, default_value = "demo@trackifly.app")]
    pub email: String,
    /// Language for generated itineraries (en, es, fr, de, hu, ur, ar, zh, hi, pt)
    #[arg(long, global = true, default_value = "en")]
    pub language: Language,
    /// Gemini model name
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    pub model: Option<String>,
    /// Theme preference file
    #[arg(long, global = true, env = "TRACKIFLY_PREFS")]
    pub prefs: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show savings, price drops and active trips
    Dashboard,
    /// List tracked products
    Products,
    /// Start tracking a product
    Track {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Current price
        #[arg(long, value_parser = parse_amount)]
        price: f64,
    },
    /// Stop tracking a product
    Untrack { id: String },
    /// Ask the assistant whether a product is worth buying now
    Analyze { id: String },
    /// Print share text for a product
    Share { id: String },
    /// List trips
    Trips,
    /// Delete a trip
    DeleteTrip { id: String },
    /// Ask a shopping or travel question
    Advice { query: String },
    /// Generate a trip itinerary
    Plan {
        /// Origin city
        #[arg(short, long)]
        from: String,
        /// Destination city
        #[arg(short, long)]
        to: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Return date for round trips (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<String>,
        /// Trip type (one-way, round-trip)
        #[arg(long, default_value = "round-trip")]
        trip_type: TripType,
        #[arg(long, value_parser = parse_amount)]
        budget: f64,
        #[arg(long, default_value = "USD")]
        currency: Currency,
        #[arg(long, default_value = "1")]
        travelers: u32,
        /// Include hotel options
        #[arg(long)]
        hotel: bool,
        /// Include car rental options
        #[arg(long)]
        car: bool,
        #[arg(long)]
        dietary: Option<String>,
        /// Save the plan as a new trip
        #[arg(long)]
        save: bool,
        /// Write the plan to this file (defaults to Trip-to-<destination>.json with --export)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        export: bool,
    },
    /// Find coupon codes for a store
    Coupons { url: String },
    /// List notifications
    Notifications,
    /// Show or toggle the colour theme
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

/// Prices and budgets must be finite and not negative
fn parse_amount(s: &str) -> Result<f64, String> {
    let amount: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("'{}' is not a valid amount", s));
    }
    Ok(amount)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_cli()?;

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(model) = cli.model.clone() {
        config.gemini_model = model;
    }
    if let Some(prefs) = cli.prefs.clone() {
        config.preferences_path = prefs;
    }

    if let Commands::Theme { toggle } = cli.command {
        let store = config.theme_store();
        let theme = if toggle { store.toggle() } else { store.load() };
        println!("Theme: {:?}", theme);
        return Ok(());
    }

    let user = match cli.guest.as_deref() {
        Some(name) => UserProfile::guest(name, &cli.email)?,
        None => UserProfile::authenticated(None, &cli.email, None),
    };
    let mut session = Session::login(user, config.data_service(), config.model_or_fallback());
    session.set_language(cli.language);
    session.rehydrate().await;

    match cli.command {
        Commands::Dashboard => {
            let summary = session.dashboard();
            println!("Total savings:    ${:.2}", summary.total_savings);
            println!("Price drops:      {}", summary.price_drops);
            println!("Active trips:     {}", summary.active_trips);
            println!("Tracked products: {}", summary.tracked_products);
        }
        Commands::Products => {
            for product in session.products() {
                let marker = if has_price_drop(product) { "↓" } else { " " };
                println!(
                    "{} [{}] {} ${:.2} (was ${:.2}, target ${:.2})",
                    marker,
                    product.id,
                    product.name,
                    product.current_price,
                    product.original_price,
                    product.target_price
                );
            }
        }
        Commands::Track { name, url, price } => {
            let persisted = session.add_product(NewProduct { name, url, price });
            let product = &session.products()[0];
            println!("Tracking {} as {}", product.name, product.id);
            if !persisted.await? {
                println!("Not saved to the backend; kept for this session only");
            }
        }
        Commands::Untrack { id } => {
            session.remove_product(&id).await?;
            println!("Removed {}", id);
        }
        Commands::Analyze { id } => match session.analyze_product(&id).await {
            Some(verdict) => println!("{}", verdict),
            None => {
                eprintln!("No product with id {}", id);
                std::process::exit(1);
            }
        },
        Commands::Share { id } => match session.product(&id) {
            Some(product) => println!("{}", product.share_text()),
            None => {
                eprintln!("No product with id {}", id);
                std::process::exit(1);
            }
        },
        Commands::Trips => {
            for trip in session.trips() {
                let warning = if is_over_budget(trip) { " over budget" } else { "" };
                println!(
                    "[{}] {} -> {} on {} ({}, {} travelers) {:.0}% of {} {:.0}{}",
                    trip.id,
                    trip.origin,
                    trip.destination,
                    trip.start_date,
                    trip.trip_type,
                    trip.travelers,
                    budget_utilization(trip),
                    trip.currency,
                    trip.budget,
                    warning
                );
            }
        }
        Commands::DeleteTrip { id } => {
            session.delete_trip(&id).await?;
            println!("Deleted {}", id);
        }
        Commands::Advice { query } => {
            println!("{}", session.ask(&query).await);
        }
        Commands::Plan {
            from,
            to,
            date,
            return_date,
            trip_type,
            budget,
            currency,
            travelers,
            hotel,
            car,
            dietary,
            save,
            output,
            export,
        } => {
            let request = ItineraryRequest {
                origin: from,
                destination: to,
                start_date: date,
                end_date: return_date,
                trip_type,
                budget,
                currency: currency.code().to_string(),
                travelers,
                preferences: TripPreferences {
                    needs_hotel: hotel,
                    needs_car: car,
                    dietary_restrictions: dietary,
                },
            };

            println!("Planning trip to {}...", request.destination);
            let Some(plan) = session.generate_itinerary(&request).await else {
                eprintln!("Could not generate an itinerary. Check your API key and try again.");
                std::process::exit(1);
            };

            let json = plan.export_json()?;
            let output =
                output.or_else(|| export.then(|| TripPlan::export_file_name(&request.destination).into()));
            match output {
                Some(path) => {
                    fs::write(&path, &json)?;
                    println!("Itinerary saved to {}", path.display());
                }
                None => println!("{}", json),
            }

            println!("\nSummary: {}", plan.summary);
            println!("Days planned: {}", plan.daily_itinerary.len());

            if save {
                let persisted = session.save_trip(&request, plan);
                println!("Saved as trip {}", session.trips()[0].id);
                if !persisted.await? {
                    println!("Not saved to the backend; kept for this session only");
                }
            }
        }
        Commands::Coupons { url } => {
            let codes = session.find_coupons(&url).await.unwrap_or_default();
            for code in codes {
                println!("{}", code);
            }
        }
        Commands::Notifications => {
            println!("{} unread", session.unread_notifications());
            for notification in session.notifications() {
                let marker = if notification.is_read { " " } else { "*" };
                println!(
                    "{} {} ({}): {}",
                    marker, notification.title, notification.timestamp, notification.message
                );
            }
        }
        Commands::Theme { .. } => {}
    }

    Ok(())
}
