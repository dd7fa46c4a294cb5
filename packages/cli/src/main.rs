#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for managing service zones and quoting fares.
//!
//! Zones live in a JSON file store (`--store`, default `data/zones`).
//! Store behaviour is tuned through the `ZONES_*` environment variables
//! read by [`RepositoryConfig::from_env`]. Set `RUST_LOG=debug` for
//! detailed logs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use taxi_zones_drawing::{DrawingConfig, DrawingSession, HeadlessTool};
use taxi_zones_fare::{
    FareCalculator, FareRequest, StraightLineRouter, default_pricing, find_zone, load_pricing,
};
use taxi_zones_fare_models::FareRule;
use taxi_zones_geometry::{Coordinate, area_km2_for_display};
use taxi_zones_repository::{JsonFileStore, RepositoryConfig, ZoneRepository};
use taxi_zones_zone_models::{ZoneDraft, ZoneId};

type Repository = ZoneRepository<JsonFileStore>;

#[derive(Parser)]
#[command(name = "taxi_zones", about = "Service zone management and fare quoting")]
struct Cli {
    /// Directory holding the zone store
    #[arg(long, global = true, default_value = "data/zones")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored zones
    List,
    /// Create a square zone around a point
    CreateSquare {
        /// Zone name
        #[arg(long)]
        name: String,
        /// Center longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Center latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Side length in kilometers
        #[arg(long)]
        side_km: Option<f64>,
        /// Fare multiplier for trips starting or ending in the zone
        #[arg(long)]
        surcharge: Option<f64>,
    },
    /// Delete a zone by id
    Delete {
        /// Zone id
        id: String,
    },
    /// Show which zone contains a point
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
    },
    /// Quote a fare between two points
    Quote {
        #[arg(long, allow_negative_numbers = true)]
        pickup_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        pickup_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        dropoff_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        dropoff_lat: f64,
        /// Vehicle type from the pricing config
        #[arg(long, default_value = "standard")]
        vehicle: String,
        /// Pickup time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
        /// JSON file with an array of fare rules
        #[arg(long)]
        rules: Option<PathBuf>,
        /// TOML pricing file overriding the built-in pricing
        #[arg(long)]
        pricing: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = RepositoryConfig::from_env()?;
    log::debug!("Using store {} ({config:?})", cli.store.display());
    let repo = ZoneRepository::new(JsonFileStore::new(&cli.store), config);

    match cli.command {
        Commands::List => list(&repo).await?,
        Commands::CreateSquare {
            name,
            lng,
            lat,
            side_km,
            surcharge,
        } => create_square(&repo, name, Coordinate::new(lng, lat), side_km, surcharge).await?,
        Commands::Delete { id } => {
            repo.delete_zone(&ZoneId::new(id.clone())).await?;
            println!("Deleted {id}");
        }
        Commands::Locate { lng, lat } => locate(&repo, Coordinate::new(lng, lat)).await?,
        Commands::Quote {
            pickup_lng,
            pickup_lat,
            dropoff_lng,
            dropoff_lat,
            vehicle,
            at,
            rules,
            pricing,
        } => {
            let request = FareRequest {
                pickup: Coordinate::new(pickup_lng, pickup_lat),
                dropoff: Coordinate::new(dropoff_lng, dropoff_lat),
                vehicle_type: vehicle,
                local_time: parse_local_time(at.as_deref())?,
            };
            quote(&repo, &request, rules.as_deref(), pricing.as_deref()).await?;
        }
    }

    Ok(())
}

async fn list(repo: &Repository) -> Result<(), Box<dyn std::error::Error>> {
    let listed = repo.list_zones().await?;

    if listed.zones.is_empty() {
        println!("No zones");
        return Ok(());
    }

    for zone in &listed.zones {
        println!(
            "{}  {:<24} {:>10.2} km²  {}{}",
            zone.id,
            zone.name,
            area_km2_for_display(&zone.polygon),
            if zone.is_active { "active" } else { "inactive" },
            if zone.degraded { "  [degraded]" } else { "" },
        );
    }

    if listed.degraded > 0 {
        println!(
            "\n{} zone(s) could not be decoded and show a placeholder shape",
            listed.degraded
        );
    }

    Ok(())
}

async fn create_square(
    repo: &Repository,
    name: String,
    center: Coordinate,
    side_km: Option<f64>,
    surcharge: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = DrawingConfig::default();
    let config = DrawingConfig {
        default_side_km: side_km.unwrap_or(defaults.default_side_km),
        ..defaults
    };

    let mut session = DrawingSession::start(HeadlessTool, ZoneDraft::new(name), config).await?;
    session.set_pricing(None, surcharge)?;
    session.generate_default_shape(Some(center))?;

    let zone = repo.commit_session(&mut session).await?;
    println!("Created {} '{}' ({} km²)", zone.id, zone.name, zone.area_km2);
    Ok(())
}

async fn locate(repo: &Repository, point: Coordinate) -> Result<(), Box<dyn std::error::Error>> {
    let listed = repo.list_zones().await?;

    match find_zone(point, &listed.zones) {
        Some(zone) => println!("{} '{}'", zone.id, zone.name),
        None => println!("Outside all active zones"),
    }

    Ok(())
}

async fn quote(
    repo: &Repository,
    request: &FareRequest,
    rules_path: Option<&Path>,
    pricing_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pricing = match pricing_path {
        Some(path) => load_pricing(&tokio::fs::read_to_string(path).await?)?,
        None => default_pricing(),
    };

    let rules: Vec<FareRule> = match rules_path {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Vec::new(),
    };

    let zones = repo.list_zones().await?.zones;
    let calculator = FareCalculator::new(pricing);
    let router = StraightLineRouter {
        speed_kmh: calculator.pricing().fallback_speed_kmh,
    };

    let fare = calculator.quote(request, &zones, &rules, &router).await?;
    println!("{}", serde_json::to_string_pretty(&fare)?);
    Ok(())
}

fn parse_local_time(at: Option<&str>) -> Result<NaiveDateTime, chrono::ParseError> {
    at.map_or_else(
        || Ok(Local::now().naive_local()),
        |s| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_local()),
    )
}
