use thiserror::Error;

use crate::types::{LatLng, Tile};

/// Geometry failures are fatal for the offending area only; seeding of other
/// areas proceeds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon bounding box has zero area")]
    DegenerateBoundingBox,
}

/// Round to 7 decimal digits so grid steps stay stable across runs.
fn round7(value: f64) -> f64 {
    (value * 1e7).round() / 1e7
}

/// Even-odd ray-casting membership test.
///
/// The strict comparisons are load-bearing: points exactly on the boundary
/// are classified by this tie-break, which is a documented limitation rather
/// than something to smooth over.
pub fn point_in_polygon(point: LatLng, polygon: &[LatLng]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].lat, polygon[i].lng);
        let (xj, yj) = (polygon[j].lat, polygon[j].lng);

        let crosses = (yi > point.lng) != (yj > point.lng);
        if crosses && point.lat < (xj - xi) * (point.lng - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Grid a geofence polygon into scan tiles.
///
/// The bounding box is divided into `divide_lat x divide_lng` cells; rows run
/// from the top latitude downward, columns from the left longitude rightward.
/// Each cell contributes one candidate point, offset half a cell from the
/// row/column edge, which is kept only if it falls inside the polygon.
pub fn tile_grid(
    polygon: &[LatLng],
    divide_lat: u32,
    divide_lng: u32,
) -> Result<Vec<Tile>, GeometryError> {
    if polygon.len() < 3 {
        return Err(GeometryError::TooFewVertices(polygon.len()));
    }

    let min_lat = polygon.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
    let max_lat = polygon.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max);
    let min_lng = polygon.iter().map(|p| p.lng).fold(f64::INFINITY, f64::min);
    let max_lng = polygon.iter().map(|p| p.lng).fold(f64::NEG_INFINITY, f64::max);

    if max_lat == min_lat || max_lng == min_lng {
        return Err(GeometryError::DegenerateBoundingBox);
    }

    let divide_lat = divide_lat.max(1);
    let divide_lng = divide_lng.max(1);

    let tile_height = round7((max_lat - min_lat).abs() / f64::from(divide_lat));
    let tile_width = round7((max_lng - min_lng).abs() / f64::from(divide_lng));

    let mut tiles = Vec::new();

    for row in 0..divide_lat {
        // Cursor starts half a cell above the top edge; the candidate sits one
        // full step below it.
        let lat_cursor = max_lat + tile_height / 2.0 - f64::from(row) * tile_height;
        let lat = round7(lat_cursor - tile_height);

        for col in 0..divide_lng {
            let lng_cursor = min_lng - tile_width / 2.0 + f64::from(col) * tile_width;
            let lng = round7(lng_cursor + tile_width);

            if point_in_polygon(LatLng::new(lat, lng), polygon) {
                tiles.push(Tile { lat, lng });
            }
        }
    }

    Ok(tiles)
}
