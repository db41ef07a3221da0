//! The crawl loop: pull a random unscrapped frontier entry, drive the
//! browser to it, classify the landing page, persist what it yields, and
//! mark the entry scrapped. Every entry is processed inside its own
//! storage transaction.

use std::time::Duration;

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserDriver, NetworkIdle, CONSENT_DECLINE_SELECTOR};
use crate::errors::CycleError;
use crate::extract::{self, DEFAULT_DAY_ORDER};
use crate::geo::point_in_polygon;
use crate::storage::FrontierStore;
use crate::types::{ExtractedPlace, FrontierEntry, LatLng, NewPlace};

lazy_static! {
    /// A landing URL of the place-detail shape (name plus `@lat,lng,zoomz/`).
    static ref PLACE_PAGE_RE: Regex =
        Regex::new(r"maps/place/[^/]+/@\d{1,2}\.\d+,\d{1,2}\.\d+,\d+z/").unwrap();

    /// Coordinates inside a place URL. The authoritative pair is the LAST
    /// match: the `!3d..!4d..` data segment, not the viewport center after `@`.
    static ref PLACE_COORDS_RE: Regex =
        Regex::new(r"(\d{1,2}\.\d+)(,|(!4d))(\d+\.\d+)!\d+").unwrap();

    /// Coordinates inside a result-feed link; here the FIRST match is the one
    /// that describes the place.
    static ref LINK_COORDS_RE: Regex =
        Regex::new(r"(\d{1,2}\.\d+)(,|(!4d))(\d+\.\d+)(!|,)\d+").unwrap();
}

pub fn is_place_url(url: &str) -> bool {
    PLACE_PAGE_RE.is_match(url)
}

fn coords_from_captures(caps: &regex::Captures<'_>) -> Option<LatLng> {
    let lat: f64 = caps[1].parse().ok()?;
    let lng: f64 = caps[4].parse().ok()?;
    Some(LatLng::new(lat, lng))
}

/// Coordinates of the place a detail-page URL points at.
pub fn place_coords(url: &str) -> Option<LatLng> {
    PLACE_COORDS_RE
        .captures_iter(url)
        .last()
        .and_then(|caps| coords_from_captures(&caps))
}

/// Coordinates of the place a results-feed link points at.
pub fn link_coords(url: &str) -> Option<LatLng> {
    LINK_COORDS_RE
        .captures(url)
        .and_then(|caps| coords_from_captures(&caps))
}

/// Pause pacing: after a random batch of iterations, sleep for a long random
/// interval so traffic does not look mechanical.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleSettings {
    pub min_batch: u32,
    pub max_batch: u32,
    pub min_pause_ms: u64,
    pub max_pause_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            min_batch: 100,
            max_batch: 150,
            min_pause_ms: 125_312,
            max_pause_ms: 304_150,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub consent_selector: String,
    pub network_idle: NetworkIdle,
    /// Delay range before each navigation, milliseconds.
    pub pre_nav_delay_ms: (u64, u64),
    /// Delay range between result-feed scrolls, milliseconds.
    pub scroll_delay_ms: (u64, u64),
    pub throttle: ThrottleSettings,
    pub day_order: Vec<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            consent_selector: CONSENT_DECLINE_SELECTOR.to_string(),
            network_idle: NetworkIdle::default(),
            pre_nav_delay_ms: (230, 731),
            scroll_delay_ms: (150, 700),
            throttle: ThrottleSettings::default(),
            day_order: DEFAULT_DAY_ORDER.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Tallies for one `run` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub processed: usize,
    pub skipped: usize,
    pub places_inserted: usize,
    pub places_existing: usize,
}

pub struct Orchestrator<S, B> {
    store: S,
    driver: B,
    geofences: Vec<Vec<LatLng>>,
    settings: CrawlSettings,
    cancel: CancellationToken,
}

// Half-open: the upper bound is never drawn.
fn jitter(range: (u64, u64)) -> u64 {
    rand::thread_rng().gen_range(range.0..range.1)
}

impl<S, B> Orchestrator<S, B>
where
    S: FrontierStore,
    B: BrowserDriver,
{
    pub fn new(
        store: S,
        driver: B,
        geofences: Vec<Vec<LatLng>>,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            driver,
            geofences,
            settings,
            cancel,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Crawl until the frontier is exhausted or cancellation is requested.
    ///
    /// Failures inside one iteration roll back that entry and move on; only
    /// a store failure at the selection point ends the run with an error.
    pub async fn run(&self) -> Result<CrawlSummary, S::Error> {
        let mut summary = CrawlSummary::default();
        let mut since_pause = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("cancellation requested, stopping crawl");
                break;
            }

            let Some(entry) = self.store.next_unscrapped().await? else {
                tracing::info!("frontier exhausted");
                break;
            };

            since_pause += 1;
            let batch = {
                let t = self.settings.throttle;
                rand::thread_rng().gen_range(t.min_batch..t.max_batch)
            };
            if since_pause > batch {
                let t = self.settings.throttle;
                let pause = jitter((t.min_pause_ms, t.max_pause_ms));
                tracing::info!(pause_ms = pause, "throttling between batches");
                tokio::time::sleep(Duration::from_millis(pause)).await;
                since_pause = 0;
            }

            match self.process_entry(&entry, &mut summary).await {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    summary.skipped += 1;
                    tracing::warn!(
                        entry_id = %entry.id.0,
                        url = %entry.url,
                        area = %entry.area,
                        category = %entry.category,
                        error = %err,
                        "crawl cycle failed, moving on"
                    );
                }
            }
        }

        Ok(summary)
    }

    async fn process_entry(
        &self,
        entry: &FrontierEntry,
        summary: &mut CrawlSummary,
    ) -> Result<(), CycleError> {
        let nav = |e: B::Error| CycleError::Navigation(e.to_string());
        let persist = |e: S::Error| CycleError::Persistence(e.to_string());

        tokio::time::sleep(Duration::from_millis(jitter(self.settings.pre_nav_delay_ms))).await;

        self.driver.new_page().await.map_err(nav)?;
        self.driver.close_other_pages().await.map_err(nav)?;
        self.driver.goto(&entry.url).await.map_err(nav)?;
        self.driver
            .dismiss_consent(&self.settings.consent_selector)
            .await
            .map_err(nav)?;
        self.driver
            .wait_for_network_idle(self.settings.network_idle)
            .await
            .map_err(nav)?;

        let current = self
            .driver
            .current_url()
            .await
            .map_err(|e| CycleError::Classification(e.to_string()))?;

        let decoded = urlencoding::decode(&current)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| current.clone());
        tracing::info!(
            entry_id = %entry.id.0,
            url = %decoded,
            area = %entry.area,
            category = %entry.category,
            "processing"
        );

        let mut tx = self.store.begin().await.map_err(persist)?;

        let outcome = if is_place_url(&current) {
            self.record_place_page(entry, &current, &mut tx, summary).await
        } else {
            self.record_search_results(entry, &mut tx, summary).await
        };

        let outcome = match outcome {
            Ok(()) => {
                let updated = self
                    .store
                    .mark_scrapped(entry.id, Some(&mut tx))
                    .await
                    .map_err(persist)?;
                if !updated {
                    tracing::warn!(
                        entry_id = %entry.id.0,
                        "entry was already scrapped, likely by a concurrent worker"
                    );
                }
                self.store.commit(tx).await.map_err(persist)
            }
            Err(err) => {
                if let Err(rb) = self.store.rollback(tx).await {
                    tracing::warn!(error = %rb, "rollback failed");
                }
                Err(err)
            }
        };

        if let Err(err) = self.driver.close_page().await {
            tracing::warn!(error = %err, "failed to close page");
        }

        outcome
    }

    /// The search redirected straight to a place-detail page: record the URL
    /// itself as a discovered place.
    async fn record_place_page(
        &self,
        entry: &FrontierEntry,
        current: &str,
        tx: &mut S::Transaction,
        summary: &mut CrawlSummary,
    ) -> Result<(), CycleError> {
        match place_coords(current) {
            Some(coords) => {
                let new_place = NewPlace {
                    url: current.to_string(),
                    area: entry.area.clone(),
                    category: entry.category.clone(),
                    lat: coords.lat,
                    lng: coords.lng,
                };
                let inserted = self
                    .store
                    .insert_place_if_absent(&new_place, Some(tx))
                    .await
                    .map_err(|e| CycleError::Persistence(e.to_string()))?;
                if inserted {
                    summary.places_inserted += 1;
                } else {
                    summary.places_existing += 1;
                }
            }
            None => {
                tracing::warn!(url = %current, "place URL has no parseable coordinates, not recording");
            }
        }

        Ok(())
    }

    /// A results feed: scroll it to the end, then record every linked place
    /// that falls inside one of the configured geofences.
    async fn record_search_results(
        &self,
        entry: &FrontierEntry,
        tx: &mut S::Transaction,
        summary: &mut CrawlSummary,
    ) -> Result<(), CycleError> {
        let links = self.collect_search_results().await?;

        for link in links {
            // Links without coordinates cannot be fenced, so they are dropped.
            let Some(coords) = link_coords(&link) else {
                continue;
            };
            if !self
                .geofences
                .iter()
                .any(|polygon| point_in_polygon(coords, polygon))
            {
                continue;
            }

            let new_place = NewPlace {
                url: link,
                area: entry.area.clone(),
                category: entry.category.clone(),
                lat: coords.lat,
                lng: coords.lng,
            };
            let inserted = self
                .store
                .insert_place_if_absent(&new_place, Some(tx))
                .await
                .map_err(|e| CycleError::Persistence(e.to_string()))?;
            if inserted {
                summary.places_inserted += 1;
            } else {
                summary.places_existing += 1;
            }
        }

        Ok(())
    }

    /// Scroll the results feed until its height stops growing, then read the
    /// rendered place links.
    async fn collect_search_results(&self) -> Result<Vec<String>, CycleError> {
        let nav = |e: B::Error| CycleError::Navigation(e.to_string());

        let mut height = self.driver.results_feed_height().await.map_err(nav)?;
        loop {
            self.driver.scroll_results_feed().await.map_err(nav)?;
            tokio::time::sleep(Duration::from_millis(jitter(self.settings.scroll_delay_ms))).await;
            self.driver
                .wait_for_network_idle(self.settings.network_idle)
                .await
                .map_err(nav)?;

            let new_height = self.driver.results_feed_height().await.map_err(nav)?;
            if new_height == height {
                break;
            }
            height = new_height;
        }

        self.driver.place_links().await.map_err(nav)
    }

    /// Deep-extract one place-detail URL: navigate to it, wait for the page
    /// to settle, and pull the embedded record.
    ///
    /// Returns None when the landing page's coordinates cannot be parsed or
    /// fall outside every configured geofence; such a page is never
    /// extracted.
    pub async fn probe_place(&self, url: &str) -> Result<Option<ExtractedPlace>, CycleError> {
        let nav = |e: B::Error| CycleError::Navigation(e.to_string());

        tokio::time::sleep(Duration::from_millis(jitter(self.settings.pre_nav_delay_ms))).await;

        self.driver.new_page().await.map_err(nav)?;
        self.driver.close_other_pages().await.map_err(nav)?;
        self.driver.goto(url).await.map_err(nav)?;
        self.driver
            .dismiss_consent(&self.settings.consent_selector)
            .await
            .map_err(nav)?;
        self.driver
            .wait_for_network_idle(self.settings.network_idle)
            .await
            .map_err(nav)?;

        let current = self
            .driver
            .current_url()
            .await
            .map_err(|e| CycleError::Classification(e.to_string()))?;

        let in_fence = place_coords(&current)
            .map(|coords| {
                self.geofences
                    .iter()
                    .any(|polygon| point_in_polygon(coords, polygon))
            })
            .unwrap_or(false);
        if !in_fence {
            tracing::info!(url = %current, "place is outside every geofence, not extracting");
            if let Err(err) = self.driver.close_page().await {
                tracing::warn!(error = %err, "failed to close page");
            }
            return Ok(None);
        }

        let document = self
            .driver
            .embedded_app_data()
            .await
            .map_err(|e| CycleError::Extraction(e.to_string()))?;
        let day_order: Vec<&str> = self.settings.day_order.iter().map(String::as_str).collect();
        let place = extract::extract(&document, &day_order);

        if let Err(err) = self.driver.close_page().await {
            tracing::warn!(error = %err, "failed to close page");
        }

        Ok(Some(place))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACE_URL: &str = "https://www.google.com/maps/place/Taverna+Nikolas/@39.6051234,19.8941111,17z/data=!3m1!4b1!4m6!3m5!1s0x135b5bd9:0xabc!8m2!3d39.6049844!4d19.8945215!16s%2Fg%2F11abc";

    #[test]
    fn place_page_urls_are_recognized() {
        assert!(is_place_url(PLACE_URL));
        assert!(!is_place_url(
            "https://www.google.com/maps/search/cafe/@39.60,19.89,15z?entry=ttu"
        ));
    }

    #[test]
    fn place_coords_come_from_the_last_match() {
        // The data segment, not the @viewport, carries the place position.
        let coords = place_coords(PLACE_URL).unwrap();
        assert_eq!(coords.lat, 39.6049844);
        assert_eq!(coords.lng, 19.8945215);
    }

    #[test]
    fn link_coords_come_from_the_first_match() {
        let coords = link_coords(PLACE_URL).unwrap();
        assert_eq!(coords.lat, 39.6051234);
        assert_eq!(coords.lng, 19.8941111);
    }

    #[test]
    fn urls_without_coordinates_yield_none() {
        assert_eq!(place_coords("https://www.google.com/maps"), None);
        assert_eq!(link_coords("https://www.google.com/maps"), None);
    }

    #[test]
    fn jitter_never_draws_the_upper_bound() {
        for _ in 0..200 {
            assert_eq!(jitter((5, 6)), 5);
        }
    }
}
