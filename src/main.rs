use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use waygo::cache::PersistentCache;
use waygo::directions::cache::CachedDirectionsProvider;
use waygo::directions::google::GoogleDirectionsClient;
use waygo::models::Difficulty;
use waygo::{
    DirectionsProvider, GeoPosition, MovementMode, RouteCatalog, RouteView, WayGoConfig, logging,
    proximity, travel_time, web,
};

#[derive(Parser)]
#[command(name = "waygo", version, about = "Walking and running routes near you")]
struct Cli {
    /// Configuration file, defaults to <config_dir>/waygo/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Route catalog JSON file, overrides the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List catalog routes
    List {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
    /// Show one route with its travel time
    Show {
        key: String,
        #[arg(long, default_value = "walking")]
        mode: MovementMode,
    },
    /// Routes of the city nearest to a position
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Travel time for a distance in meters
    Estimate {
        #[arg(allow_negative_numbers = true)]
        meters: f64,
        #[arg(long, default_value = "walking")]
        mode: MovementMode,
    },
    /// Compute the itinerary of a route, and the walk to its start
    Directions {
        key: String,
        #[arg(long, default_value = "walking")]
        mode: MovementMode,
        #[arg(long, requires = "from_lng", allow_hyphen_values = true)]
        from_lat: Option<f64>,
        #[arg(long, requires = "from_lat", allow_hyphen_values = true)]
        from_lng: Option<f64>,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_catalog(cli_path: Option<&Path>, config: &WayGoConfig) -> Result<RouteCatalog> {
    let configured = config.catalog.path.as_deref().map(Path::new);
    let catalog = RouteCatalog::load_or_bundled(cli_path.or(configured))
        .context("Failed to load route catalog")?;
    info!("Loaded {} routes", catalog.len());
    Ok(catalog)
}

fn directions_provider(config: &WayGoConfig) -> Result<Arc<dyn DirectionsProvider>> {
    let client = GoogleDirectionsClient::new(&config.directions)?;
    if !config.cache.enabled {
        return Ok(Arc::new(client));
    }

    let location = config.cache.resolved_location();
    let cache = PersistentCache::open(&location)
        .with_context(|| format!("Failed to open cache at {}", location.display()))?;
    Ok(Arc::new(CachedDirectionsProvider::new(
        client,
        cache,
        config.cache.ttl(),
    )))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WayGoConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging)?;

    let catalog = load_catalog(cli.catalog.as_deref(), &config)?;

    match cli.command {
        Command::List { city, difficulty } => {
            for record in catalog.iter().filter(|r| {
                city.as_deref().is_none_or(|c| r.city == c)
                    && difficulty.is_none_or(|d| r.difficulty == d)
            }) {
                println!(
                    "{:<20} {:<30} {:<8} {:<14} {:>5.1} km",
                    record.key, record.name, record.city, record.difficulty, record.distance_km
                );
            }
        }
        Command::Show { key, mode } => {
            let record = catalog.require(&key)?;
            print_json(record)?;
            let duration = travel_time::estimate_route(record, mode)?;
            println!("{mode}: {duration}");
        }
        Command::Nearby { lat, lng } => {
            let position = GeoPosition::checked(lat, lng)?;
            print_json(&proximity::nearby(&position, &catalog)?)?;
        }
        Command::Estimate { meters, mode } => {
            println!("{}", travel_time::estimate_duration(meters, mode)?);
        }
        Command::Directions {
            key,
            mode,
            from_lat,
            from_lng,
        } => {
            let record = catalog.require(&key)?.clone();
            let mut view = RouteView::open(record, directions_provider(&config)?);
            view.set_mode(mode);
            view.wait_for_directions().await;

            if let (Some(lat), Some(lng)) = (from_lat, from_lng) {
                view.update_position(GeoPosition::checked(lat, lng)?);
                view.wait_for_time_to_start().await;
            }

            print_json(&view.summary())?;
            view.close();
        }
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            web::run(port, Arc::new(catalog)).await?;
        }
    }

    Ok(())
}
