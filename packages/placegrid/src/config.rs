use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::types::LatLng;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub areas_path: String,
    pub categories_path: String,
}

impl Config {
    /// Load configuration from environment variables (reads `.env` if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            areas_path: env::var("AREAS_PATH").unwrap_or_else(|_| "./areas.json".to_string()),
            categories_path: env::var("CATEGORIES_PATH")
                .unwrap_or_else(|_| "./categories.json".to_string()),
        })
    }
}

/// Grid density and zoom for one area's map searches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    pub divide_lat: u32,
    pub divide_lng: u32,
    pub zoom_level: u32,
}

/// A geofenced region of interest. Immutable, loaded once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "geoFencing")]
    pub geo_fencing: Vec<LatLng>,
    #[serde(rename = "mapConfig")]
    pub map_config: MapConfig,
}

#[derive(Debug, Deserialize)]
struct AreasFile {
    areas: Vec<Area>,
}

/// A search category, with an opt-out flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Exclude", default)]
    pub exclude: bool,
}

/// Load the active areas from the configured JSON document.
pub fn load_active_areas(path: impl AsRef<Path>) -> Result<Vec<Area>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read areas file {}", path.display()))?;
    let parsed: AreasFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse areas file {}", path.display()))?;

    Ok(parsed.areas.into_iter().filter(|a| a.active).collect())
}

/// Load the non-excluded categories from the configured JSON document.
pub fn load_categories(path: impl AsRef<Path>) -> Result<Vec<Category>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read categories file {}", path.display()))?;
    let parsed: Vec<Category> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse categories file {}", path.display()))?;

    Ok(parsed.into_iter().filter(|c| !c.exclude).collect())
}

/// Just the polygons, for geofence membership checks during extraction.
pub fn geofences(areas: &[Area]) -> Vec<Vec<LatLng>> {
    areas.iter().map(|a| a.geo_fencing.clone()).collect()
}
