// Operator CLI for the frontier database: seeding, status, grid preview.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use placegrid::config::{load_active_areas, load_categories, Config};
use placegrid::geo::tile_grid;
use placegrid::seed::build_seed_urls;
use placegrid::storage::{FrontierStore, PgFrontierStore};

#[derive(Parser)]
#[command(name = "dev", about = "Frontier database operations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grid the active areas and insert their search URLs into the frontier
    Seed {
        /// Clear the frontier before seeding
        #[arg(long)]
        truncate: bool,
    },
    /// Print frontier and place row counts
    Status,
    /// Print the scan tiles one area's geofence produces
    Tiles {
        /// Area name, as spelled in the areas file
        area: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,placegrid=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Seed { truncate } => seed(&config, truncate).await,
        Command::Status => status(&config).await,
        Command::Tiles { area } => tiles(&config, &area),
    }
}

async fn store(config: &Config) -> Result<PgFrontierStore> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    PgFrontierStore::migrate(&pool)
        .await
        .context("Failed to run migrations")?;
    Ok(PgFrontierStore::new(pool))
}

async fn seed(config: &Config, truncate: bool) -> Result<()> {
    let areas = load_active_areas(&config.areas_path)?;
    let categories = load_categories(&config.categories_path)?;
    tracing::info!(
        areas = areas.len(),
        categories = categories.len(),
        "loaded crawl configuration"
    );

    let seeds = build_seed_urls(&areas, &categories);
    tracing::info!(urls = seeds.len(), "built seed URLs");

    let store = store(config).await?;
    if truncate {
        tracing::warn!("truncating frontier before seeding");
        store.truncate_frontier().await?;
    }

    let stats = store.seed(&seeds).await?;
    println!(
        "Seeded {} new search URLs ({} already present)",
        stats.inserted, stats.skipped
    );
    Ok(())
}

async fn status(config: &Config) -> Result<()> {
    let store = store(config).await?;
    let counts = store.counts().await?;
    println!("Frontier URLs:   {}", counts.frontier_total);
    println!("  unscrapped:    {}", counts.frontier_unscrapped);
    println!("Place URLs:      {}", counts.places);
    Ok(())
}

fn tiles(config: &Config, area_name: &str) -> Result<()> {
    let areas = load_active_areas(&config.areas_path)?;
    let Some(area) = areas.iter().find(|a| a.name == area_name) else {
        bail!("no active area named '{area_name}' in {}", config.areas_path);
    };

    let tiles = tile_grid(
        &area.geo_fencing,
        area.map_config.divide_lat,
        area.map_config.divide_lng,
    )?;
    println!(
        "{}: {} tiles ({}x{} grid, zoom {})",
        area.name,
        tiles.len(),
        area.map_config.divide_lat,
        area.map_config.divide_lng,
        area.map_config.zoom_level
    );
    for tile in tiles {
        println!("  {},{}", tile.lat, tile.lng);
    }
    Ok(())
}
