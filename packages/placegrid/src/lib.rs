//! Geofenced map-listing crawler: grids configured areas into search tiles,
//! seeds a deduplicated URL frontier, and drives a browser session that
//! discovers and extracts place-detail pages.

pub mod browser;
pub mod config;
pub mod errors;
pub mod extract;
pub mod geo;
pub mod orchestrator;
pub mod seed;
pub mod storage;
pub mod types;

pub use browser::{BrowserDriver, NetworkIdle};
pub use config::{load_active_areas, load_categories, Area, Category, Config};
pub use errors::CycleError;
pub use orchestrator::{CrawlSettings, CrawlSummary, Orchestrator, ThrottleSettings};
pub use seed::build_seed_urls;
pub use storage::{FrontierStore, MemoryFrontier, PgFrontierStore};
pub use types::{ExtractedPlace, FrontierEntry, LatLng, SeedStats, SeedUrl, Tile};
