//! Extraction of structured place data from the JSON blob a place-detail
//! page embeds. The blob is a deeply nested array; every field of interest
//! lives at a fixed index path, and any shape mismatch degrades that one
//! field to None instead of failing the extraction.

use serde_json::Value;

use crate::types::ExtractedPlace;

pub mod normalize;

/// Rendered image dimensions requested when rewriting image URLs.
pub const IMAGE_WIDTH: u32 = 1600;
pub const IMAGE_HEIGHT: u32 = 1600;

/// Weekday names as the upstream pages spell them, in display order.
pub const DEFAULT_DAY_ORDER: [&str; 7] = [
    "Δευτέρα",
    "Τρίτη",
    "Τετάρτη",
    "Πέμπτη",
    "Παρασκευή",
    "Σάββατο",
    "Κυριακή",
];

/// Index paths into the embedded document, one per extracted field.
pub mod paths {
    pub const LAT: &[usize] = &[6, 9, 2];
    pub const LNG: &[usize] = &[6, 9, 3];
    pub const NAME: &[usize] = &[6, 99, 0, 0, 1, 2, 1, 13, 0];
    pub const SUBTITLE: &[usize] = &[6, 99, 0, 0, 1, 2, 1, 11];
    pub const ADDRESS: &[usize] = &[6, 39];
    pub const ADDRESS_LOCATED_AT: &[usize] = &[6, 134, 0, 0, 0, 0];
    pub const REVIEWS_TOTAL: &[usize] = &[6, 4, 8];
    pub const REVIEWS_AVERAGE: &[usize] = &[6, 4, 7];
    pub const TIMEZONE: &[usize] = &[6, 30];
    pub const STREET_VIEW: &[usize] = &[6, 37, 0, 0, 6, 0];
    pub const PLACE_IMAGE: &[usize] = &[6, 37, 0, 1, 6, 0];
    pub const PLACE_COVER_IMAGE: &[usize] = &[6, 51, 0, 0, 6, 0];
    pub const MAP_URL: &[usize] = &[6, 42];
    pub const RESERVATION_TEXT: &[usize] = &[6, 46, 0, 1];
    pub const RESERVATION_URL: &[usize] = &[6, 46, 0, 0];
    pub const WEBSITE_TEXT: &[usize] = &[6, 7, 1];
    pub const WEBSITE_URL: &[usize] = &[6, 7, 0];
    pub const MENU_TEXT: &[usize] = &[6, 38, 1];
    pub const MENU_URL: &[usize] = &[6, 38, 0];
    pub const DELIVERY_SERVICES: &[usize] = &[6, 75, 0, 1, 2];
    pub const WORKING_HOURS: &[usize] = &[6, 34, 1];
    pub const FEATURES: &[usize] = &[6, 100, 1];
    pub const PHONE_NUMBER: &[usize] = &[6, 178, 0, 3];
    pub const PLUS_CODE: &[usize] = &[6, 183, 2, 2, 0];
}

/// Walk a path of array indices through the document.
///
/// Returns None when any step lands on a non-array, an out-of-range index,
/// or when the leaf itself is null, so callers can chain fallbacks the way
/// the page data expects.
pub fn get_value<'a>(document: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut current = document;
    for &index in path {
        current = current.as_array()?.get(index)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn str_at(document: &Value, path: &[usize]) -> Option<String> {
    get_value(document, path)?.as_str().map(str::to_string)
}

pub fn f64_at(document: &Value, path: &[usize]) -> Option<f64> {
    get_value(document, path)?.as_f64()
}

pub fn i64_at(document: &Value, path: &[usize]) -> Option<i64> {
    get_value(document, path)?.as_i64()
}

/// Pull every known field out of the embedded document. Total: a document of
/// any shape produces a record, with unmatched fields left empty.
pub fn extract(document: &Value, day_order: &[&str]) -> ExtractedPlace {
    ExtractedPlace {
        lat: f64_at(document, paths::LAT),
        lng: f64_at(document, paths::LNG),
        name: str_at(document, paths::NAME),
        subtitle: str_at(document, paths::SUBTITLE),
        address: str_at(document, paths::ADDRESS),
        address_located_at: str_at(document, paths::ADDRESS_LOCATED_AT),
        reviews_total: i64_at(document, paths::REVIEWS_TOTAL),
        reviews_average: f64_at(document, paths::REVIEWS_AVERAGE),
        timezone: str_at(document, paths::TIMEZONE),
        street_view: normalize::optimize_street_view_url(
            str_at(document, paths::STREET_VIEW),
            IMAGE_WIDTH,
            IMAGE_HEIGHT,
        ),
        place_image: normalize::optimize_place_image_url(
            str_at(document, paths::PLACE_IMAGE),
            IMAGE_WIDTH,
            IMAGE_HEIGHT,
        ),
        place_cover_image: normalize::optimize_place_image_url(
            str_at(document, paths::PLACE_COVER_IMAGE),
            IMAGE_WIDTH,
            IMAGE_HEIGHT,
        ),
        map_url: str_at(document, paths::MAP_URL),
        reservation_text: str_at(document, paths::RESERVATION_TEXT),
        reservation_url: str_at(document, paths::RESERVATION_URL),
        website_text: str_at(document, paths::WEBSITE_TEXT),
        website_url: str_at(document, paths::WEBSITE_URL),
        menu_text: str_at(document, paths::MENU_TEXT),
        menu_url: str_at(document, paths::MENU_URL),
        delivery_services: normalize::delivery_services(get_value(
            document,
            paths::DELIVERY_SERVICES,
        )),
        working_hours: normalize::working_hours(
            get_value(document, paths::WORKING_HOURS),
            day_order,
        ),
        features: normalize::features(get_value(document, paths::FEATURES)),
        phone_number: str_at(document, paths::PHONE_NUMBER),
        plus_code: str_at(document, paths::PLUS_CODE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Grow nested arrays (padding with nulls) so `value` lands at `path`.
    fn set_path(document: &mut Value, path: &[usize], value: Value) {
        let mut current = document;
        for &index in &path[..path.len() - 1] {
            if !current.is_array() {
                *current = Value::Array(vec![]);
            }
            let arr = current.as_array_mut().unwrap();
            while arr.len() <= index {
                arr.push(Value::Null);
            }
            current = &mut arr[index];
        }
        if !current.is_array() {
            *current = Value::Array(vec![]);
        }
        let arr = current.as_array_mut().unwrap();
        let last = path[path.len() - 1];
        while arr.len() <= last {
            arr.push(Value::Null);
        }
        arr[last] = value;
    }

    #[test]
    fn walks_nested_arrays() {
        let doc = json!([null, [null, [[12, 11, "Monday"]]], null, null, []]);
        assert_eq!(
            get_value(&doc, &[1, 1, 0, 2]).and_then(Value::as_str),
            Some("Monday")
        );
    }

    #[test]
    fn null_leaf_is_a_miss() {
        let doc = json!([[null]]);
        assert_eq!(get_value(&doc, &[0, 0]), None);
    }

    #[test]
    fn non_array_midway_is_a_miss() {
        let doc = json!([["scalar"]]);
        assert_eq!(get_value(&doc, &[0, 0, 3]), None);
    }

    #[test]
    fn out_of_range_index_is_a_miss() {
        let doc = json!([[1, 2]]);
        assert_eq!(get_value(&doc, &[0, 9]), None);
    }

    #[test]
    fn extract_reads_fields_at_their_paths() {
        let mut doc = Value::Null;
        set_path(&mut doc, paths::LAT, json!(39.6049844));
        set_path(&mut doc, paths::LNG, json!(19.8945215));
        set_path(&mut doc, paths::NAME, json!("Taverna Nikolas"));
        set_path(&mut doc, paths::REVIEWS_TOTAL, json!(412));
        set_path(
            &mut doc,
            paths::STREET_VIEW,
            json!("https://example.com/thumbnail?panoid=x&w=360&h=120&yaw=1"),
        );

        let place = extract(&doc, &DEFAULT_DAY_ORDER);
        assert_eq!(place.lat, Some(39.6049844));
        assert_eq!(place.lng, Some(19.8945215));
        assert_eq!(place.name.as_deref(), Some("Taverna Nikolas"));
        assert_eq!(place.reviews_total, Some(412));
        assert_eq!(
            place.street_view.as_deref(),
            Some("https://example.com/thumbnail?panoid=x&w=1600&h=1600&yaw=1")
        );
        assert_eq!(place.subtitle, None);
        assert!(place.delivery_services.is_empty());
        assert!(place.working_hours.is_empty());
    }

    #[test]
    fn extract_never_panics_on_arbitrary_documents() {
        for doc in [
            Value::Null,
            json!({}),
            json!("just a string"),
            json!([]),
            json!([[[[]]]]),
            json!([1, 2, 3]),
        ] {
            let _ = extract(&doc, &DEFAULT_DAY_ORDER);
        }
    }
}
