use crate::config::{Area, Category};
use crate::geo::tile_grid;
use crate::types::SeedUrl;

const SEARCH_URL_BASE: &str = "https://www.google.com/maps/search";

fn search_url(category: &str, lat: f64, lng: f64, zoom: u32) -> String {
    format!(
        "{SEARCH_URL_BASE}/{}/@{lat},{lng},{zoom}z?entry=ttu",
        urlencoding::encode(category)
    )
}

/// Cross every area's tile grid with every category to produce the search
/// URLs that seed the frontier.
///
/// An area whose geofence cannot be gridded is logged and skipped; the other
/// areas still seed.
pub fn build_seed_urls(areas: &[Area], categories: &[Category]) -> Vec<SeedUrl> {
    let mut seeds = vec![];

    for area in areas {
        let tiles = match tile_grid(
            &area.geo_fencing,
            area.map_config.divide_lat,
            area.map_config.divide_lng,
        ) {
            Ok(tiles) => tiles,
            Err(err) => {
                tracing::error!(area = %area.name, error = %err, "skipping area with bad geofence");
                continue;
            }
        };
        tracing::info!(area = %area.name, tiles = tiles.len(), "gridded area");

        for category in categories {
            for tile in &tiles {
                seeds.push(SeedUrl {
                    url: search_url(
                        &category.category,
                        tile.lat,
                        tile.lng,
                        area.map_config.zoom_level,
                    ),
                    area: area.name.clone(),
                    category: category.category.clone(),
                    lat: tile.lat,
                    lng: tile.lng,
                });
            }
        }
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::types::LatLng;

    fn square_area(name: &str) -> Area {
        Area {
            name: name.to_string(),
            active: true,
            geo_fencing: vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 10.0),
                LatLng::new(10.0, 10.0),
                LatLng::new(10.0, 0.0),
            ],
            map_config: MapConfig {
                divide_lat: 2,
                divide_lng: 2,
                zoom_level: 15,
            },
        }
    }

    fn category(name: &str) -> Category {
        Category {
            category: name.to_string(),
            exclude: false,
        }
    }

    #[test]
    fn crosses_tiles_with_categories() {
        let seeds = build_seed_urls(&[square_area("sq")], &[category("cafe"), category("bar")]);
        // 4 tiles x 2 categories
        assert_eq!(seeds.len(), 8);
        assert!(seeds.iter().all(|s| s.area == "sq"));
        assert_eq!(seeds.iter().filter(|s| s.category == "cafe").count(), 4);
    }

    #[test]
    fn category_is_percent_encoded_in_url() {
        let seeds = build_seed_urls(&[square_area("sq")], &[category("ice cream shop")]);
        assert!(seeds[0].url.contains("/maps/search/ice%20cream%20shop/@"));
        assert!(seeds[0].url.ends_with("z?entry=ttu"));
        assert!(seeds[0].url.contains(",15z"));
    }

    #[test]
    fn bad_geofence_skips_only_that_area() {
        let mut degenerate = square_area("bad");
        degenerate.geo_fencing.truncate(2);
        let seeds = build_seed_urls(&[degenerate, square_area("good")], &[category("cafe")]);
        assert_eq!(seeds.len(), 4);
        assert!(seeds.iter().all(|s| s.area == "good"));
    }
}
