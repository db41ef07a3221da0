//! Shaping of the raw array fragments (delivery services, working hours,
//! feature groups) into the structured types, plus image URL rewrites.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::extract::get_value;
use crate::types::{DeliveryService, FeatureGroup, FeatureItem, HoursInterval, WorkingDay};

lazy_static! {
    static ref STREET_VIEW_WIDTH_RE: Regex = Regex::new(r"&w=\d+").unwrap();
    static ref STREET_VIEW_HEIGHT_RE: Regex = Regex::new(r"&h=\d+").unwrap();
    static ref PLACE_IMAGE_SIZE_RE: Regex = Regex::new(r"=w\d+-h\d+").unwrap();
}

/// Rewrite the `&w=`/`&h=` query parameters of a street-view thumbnail URL
/// to the requested dimensions.
pub fn optimize_street_view_url(
    url: Option<String>,
    width: u32,
    height: u32,
) -> Option<String> {
    let url = url?;
    let url = STREET_VIEW_WIDTH_RE.replace(&url, format!("&w={width}"));
    let url = STREET_VIEW_HEIGHT_RE.replace(&url, format!("&h={height}"));
    Some(url.into_owned())
}

/// Rewrite the `=w{w}-h{h}` size segment of a place image URL to the
/// requested dimensions.
pub fn optimize_place_image_url(
    url: Option<String>,
    width: u32,
    height: u32,
) -> Option<String> {
    let url = url?;
    Some(
        PLACE_IMAGE_SIZE_RE
            .replace(&url, format!("=w{width}-h{height}"))
            .into_owned(),
    )
}

fn str_field(value: &Value, path: &[usize]) -> Option<String> {
    get_value(value, path)?.as_str().map(str::to_string)
}

/// Third-party ordering integrations. Each service row carries its display
/// text, logo and link at slightly different positions depending on the
/// integration, hence the ordered fallbacks.
pub fn delivery_services(data: Option<&Value>) -> Vec<DeliveryService> {
    let Some(services) = data.and_then(Value::as_array) else {
        return vec![];
    };

    services
        .iter()
        .map(|service| DeliveryService {
            service_text: str_field(service, &[0, 2, 1]).or_else(|| str_field(service, &[0, 0])),
            service_logo: str_field(service, &[0, 2, 0]),
            service_url: str_field(service, &[1, 2, 0])
                .or_else(|| str_field(service, &[1, 2, 1, 0])),
        })
        .collect()
}

fn hours_interval(time: &Value) -> Option<HoursInterval> {
    let slot = time.as_array()?;
    let part = |i: usize| slot.get(i).and_then(Value::as_u64).map(|v| v as u32);
    Some(HoursInterval {
        opening: part(0)? * 100 + part(1)?,
        closing: part(2)? * 100 + part(3)?,
    })
}

/// Per-day opening hours. A null hours array means closed all day; a single
/// all-zero interval means open around the clock; anything else becomes HHMM
/// intervals. Days are sorted by `day_order`, unknown day names first.
pub fn working_hours(data: Option<&Value>, day_order: &[&str]) -> Vec<WorkingDay> {
    let Some(days) = data.and_then(Value::as_array) else {
        return vec![];
    };

    let mut result: Vec<WorkingDay> = days
        .iter()
        .map(|day_data| {
            if day_data.is_null() {
                return WorkingDay {
                    day: None,
                    all_day_open: false,
                    all_day_closed: false,
                    working_hours: vec![],
                };
            }

            let day = str_field(day_data, &[0]);
            let hours = get_value(day_data, &[6]).and_then(Value::as_array);

            let mut all_day_open = false;
            let mut all_day_closed = false;
            let mut intervals = vec![];

            match hours {
                None => all_day_closed = true,
                Some(slots)
                    if slots.len() == 1
                        && slots[0]
                            .as_array()
                            .is_some_and(|s| s.iter().all(|v| v.as_u64() == Some(0))) =>
                {
                    all_day_open = true;
                }
                Some(slots) => {
                    intervals = slots.iter().filter_map(hours_interval).collect();
                }
            }

            WorkingDay {
                day,
                all_day_open,
                all_day_closed,
                working_hours: intervals,
            }
        })
        .collect();

    let rank = |day: &Option<String>| -> i64 {
        day.as_deref()
            .and_then(|d| day_order.iter().position(|o| *o == d))
            .map(|p| p as i64)
            .unwrap_or(-1)
    };
    result.sort_by_key(|d| rank(&d.day));
    result
}

fn payment_sub_options(option: &Value) -> Vec<String> {
    let Some(subs) = get_value(option, &[2, 4, 1, 0, 0]).and_then(Value::as_array) else {
        return vec![];
    };
    subs.iter()
        .filter_map(|sub| str_field(sub, &[2]).or_else(|| str_field(sub, &[1])))
        .collect()
}

fn merge_items(items: Vec<FeatureItem>) -> Vec<FeatureItem> {
    let mut merged: Vec<FeatureItem> = vec![];
    for item in items {
        match merged.iter_mut().find(|m| m.title == item.title) {
            Some(existing) => {
                if existing.description.is_empty() {
                    existing.description = item.description;
                }
                for option in item.available_options {
                    if !existing.available_options.contains(&option) {
                        existing.available_options.push(option);
                    }
                }
            }
            None => merged.push(item),
        }
    }
    merged
}

/// Amenity groups (service options, accessibility, payments, ...). The
/// "payments" group nests accepted card networks one level deeper. Items
/// repeated within a group are merged: options unioned, first non-empty
/// description kept.
pub fn features(data: Option<&Value>) -> Vec<FeatureGroup> {
    let Some(groups) = data.and_then(Value::as_array) else {
        return vec![];
    };

    groups
        .iter()
        .map(|group| {
            let feature_slug = str_field(group, &[0]);
            let feature_title = str_field(group, &[1]);
            let options = get_value(group, &[2])
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let items = options
                .iter()
                .map(|option| {
                    let available_options = if feature_slug.as_deref() == Some("payments") {
                        payment_sub_options(option)
                    } else {
                        vec![]
                    };
                    FeatureItem {
                        title: str_field(option, &[1]),
                        description: str_field(option, &[2, 2, 3]).unwrap_or_default(),
                        available_options,
                    }
                })
                .collect();

            FeatureGroup {
                feature_slug,
                feature_title,
                features: merge_items(items),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn street_view_url_gets_new_dimensions() {
        let url = "https://example.com/v1/thumbnail?panoid=abc&w=360&h=120&yaw=234.2&pitch=0";
        let out = optimize_street_view_url(Some(url.to_string()), 1600, 1600).unwrap();
        assert_eq!(
            out,
            "https://example.com/v1/thumbnail?panoid=abc&w=1600&h=1600&yaw=234.2&pitch=0"
        );
    }

    #[test]
    fn street_view_none_stays_none() {
        assert_eq!(optimize_street_view_url(None, 1600, 1600), None);
    }

    #[test]
    fn place_image_url_gets_new_dimensions() {
        let url = "https://example.com/p/AF1QipN=w140-h248-k-no";
        let out = optimize_place_image_url(Some(url.to_string()), 1600, 1600).unwrap();
        assert_eq!(out, "https://example.com/p/AF1QipN=w1600-h1600-k-no");
    }

    #[test]
    fn delivery_services_use_ordered_fallbacks() {
        let data = json!([
            [
                [null, null, ["logo-a", "Wolt"]],
                [null, null, ["https://wolt.example/order"]]
            ],
            [
                ["efood", null, null],
                [null, null, [null, ["https://efood.example/order"]]]
            ]
        ]);
        let services = delivery_services(Some(&data));
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service_text.as_deref(), Some("Wolt"));
        assert_eq!(services[0].service_logo.as_deref(), Some("logo-a"));
        assert_eq!(
            services[0].service_url.as_deref(),
            Some("https://wolt.example/order")
        );
        assert_eq!(services[1].service_text.as_deref(), Some("efood"));
        assert_eq!(services[1].service_logo, None);
        assert_eq!(
            services[1].service_url.as_deref(),
            Some("https://efood.example/order")
        );
    }

    #[test]
    fn delivery_services_absent_means_empty() {
        assert!(delivery_services(None).is_empty());
    }

    #[test]
    fn single_all_zero_interval_means_open_all_day() {
        let data = json!([["Τρίτη", 0, 0, 0, 0, 0, [[0, 0]]]]);
        let days = working_hours(Some(&data), &crate::extract::DEFAULT_DAY_ORDER);
        assert_eq!(days.len(), 1);
        assert!(days[0].all_day_open);
        assert!(!days[0].all_day_closed);
        assert!(days[0].working_hours.is_empty());
    }

    #[test]
    fn null_hours_mean_closed_all_day() {
        let data = json!([["Κυριακή", 0, 0, 0, 0, 0, null]]);
        let days = working_hours(Some(&data), &crate::extract::DEFAULT_DAY_ORDER);
        assert!(days[0].all_day_closed);
        assert!(!days[0].all_day_open);
    }

    #[test]
    fn intervals_become_hhmm_integers() {
        let data = json!([["Δευτέρα", 0, 0, 0, 0, 0, [[9, 0, 17, 30]]]]);
        let days = working_hours(Some(&data), &crate::extract::DEFAULT_DAY_ORDER);
        assert_eq!(
            days[0].working_hours,
            vec![HoursInterval { opening: 900, closing: 1730 }]
        );
    }

    #[test]
    fn days_sort_by_order_with_unknown_names_first() {
        let data = json!([
            ["Σάββατο", 0, 0, 0, 0, 0, [[10, 0, 14, 0]]],
            ["Mystery", 0, 0, 0, 0, 0, [[8, 0, 12, 0]]],
            ["Δευτέρα", 0, 0, 0, 0, 0, [[9, 0, 17, 0]]]
        ]);
        let days = working_hours(Some(&data), &crate::extract::DEFAULT_DAY_ORDER);
        let names: Vec<Option<&str>> = days.iter().map(|d| d.day.as_deref()).collect();
        assert_eq!(names, vec![Some("Mystery"), Some("Δευτέρα"), Some("Σάββατο")]);
    }

    #[test]
    fn payments_group_collects_sub_options() {
        let data = json!([
            [
                "payments",
                "Πληρωμές",
                [
                    [
                        null,
                        "Πιστωτικές κάρτες",
                        [
                            null,
                            null,
                            [null, null, null, ""],
                            null,
                            [null, [[[["x", "Visa-alt", "Visa"], ["y", "Mastercard"]]]]]
                        ]
                    ]
                ]
            ]
        ]);
        let groups = features(Some(&data));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].feature_slug.as_deref(), Some("payments"));
        assert_eq!(
            groups[0].features[0].available_options,
            vec!["Visa".to_string(), "Mastercard".to_string()]
        );
    }

    #[test]
    fn duplicate_feature_items_merge() {
        let data = json!([
            [
                "accessibility",
                "Προσβασιμότητα",
                [
                    [null, "Ράμπα", [null, null, [null, null, null, ""]]],
                    [null, "Ράμπα", [null, null, [null, null, null, "Είσοδος με ράμπα"]]]
                ]
            ]
        ]);
        let groups = features(Some(&data));
        assert_eq!(groups[0].features.len(), 1);
        assert_eq!(groups[0].features[0].description, "Είσοδος με ράμπα");
    }
}
