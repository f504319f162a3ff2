use trackifly::defaults::{sample_products, sample_trips};
use trackifly::{logging, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_cli()?;

    println!("🚀 Seeding backend with sample data...");

    let data = Config::from_env().data_service();
    if !data.is_configured() {
        eprintln!("SUPABASE_URL and SUPABASE_ANON_KEY must be set");
        std::process::exit(1);
    }

    let products = sample_products();
    let mut inserted_products = 0;
    for product in &products {
        if data.insert_product(product).await {
            inserted_products += 1;
        } else {
            println!("  ⚠️  product {} ({}) was not inserted", product.id, product.name);
        }
    }

    let trips = sample_trips();
    let mut inserted_trips = 0;
    for trip in &trips {
        if data.insert_trip(trip).await {
            inserted_trips += 1;
        } else {
            println!("  ⚠️  trip {} ({}) was not inserted", trip.id, trip.destination);
        }
    }

    println!("\n📊 Products: {}/{}", inserted_products, products.len());
    println!("📊 Trips: {}/{}", inserted_trips, trips.len());

    // Read back what the app will see on its next start
    let stored = data.fetch_products().await;
    println!("\n🔍 Backend now returns {} products", stored.len());

    Ok(())
}
