use std::convert::Infallible;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use crate::storage::FrontierStore;
use crate::types::{
    FrontierEntry, FrontierEntryId, NewPlace, PlaceId, PlaceRecord, SeedStats, SeedUrl,
    StoreCounts, UrlHash,
};

/// In-memory store with real transactional semantics: writes made under a
/// transaction are staged and only applied on commit, so rollback behavior is
/// observable in tests without a database.
#[derive(Default)]
pub struct MemoryFrontier {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    frontier: Vec<FrontierEntry>,
    places: Vec<PlaceRecord>,
}

/// Staged writes for one unit of work
#[derive(Default)]
pub struct MemoryTransaction {
    staged_places: Vec<PlaceRecord>,
    staged_scrapped: Vec<FrontierEntryId>,
}

impl MemoryFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all place rows, for assertions.
    pub fn places(&self) -> Vec<PlaceRecord> {
        self.inner.lock().unwrap().places.clone()
    }

    /// Snapshot of all frontier rows, for assertions.
    pub fn frontier(&self) -> Vec<FrontierEntry> {
        self.inner.lock().unwrap().frontier.clone()
    }

    fn place_record(place: &NewPlace) -> PlaceRecord {
        PlaceRecord {
            id: PlaceId::new(),
            hash: UrlHash::from_url(&place.url),
            url: place.url.clone(),
            area: place.area.clone(),
            category: place.category.clone(),
            lat: place.lat,
            lng: place.lng,
            scrapped: false,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl FrontierStore for MemoryFrontier {
    type Transaction = MemoryTransaction;
    type Error = Infallible;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        Ok(MemoryTransaction::default())
    }

    async fn commit(&self, tx: Self::Transaction) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        for place in tx.staged_places {
            if !inner.places.iter().any(|p| p.hash == place.hash) {
                inner.places.push(place);
            }
        }
        for id in tx.staged_scrapped {
            if let Some(entry) = inner.frontier.iter_mut().find(|e| e.id == id) {
                entry.scrapped = true;
            }
        }
        Ok(())
    }

    async fn rollback(&self, tx: Self::Transaction) -> Result<(), Self::Error> {
        drop(tx);
        Ok(())
    }

    async fn seed(&self, entries: &[SeedUrl]) -> Result<SeedStats, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        let mut stats = SeedStats::default();

        for entry in entries {
            let hash = UrlHash::from_url(&entry.url);
            if inner.frontier.iter().any(|e| e.hash == hash) {
                stats.skipped += 1;
                tracing::debug!(url = %entry.url, "search URL already seeded");
                continue;
            }
            inner.frontier.push(FrontierEntry {
                id: FrontierEntryId::new(),
                hash,
                url: entry.url.clone(),
                area: entry.area.clone(),
                category: entry.category.clone(),
                lat: entry.lat,
                lng: entry.lng,
                scrapped: false,
                created_at: Utc::now(),
            });
            stats.inserted += 1;
        }

        Ok(stats)
    }

    async fn truncate_frontier(&self) -> Result<(), Self::Error> {
        self.inner.lock().unwrap().frontier.clear();
        Ok(())
    }

    async fn next_unscrapped(&self) -> Result<Option<FrontierEntry>, Self::Error> {
        let inner = self.inner.lock().unwrap();
        let candidates: Vec<&FrontierEntry> =
            inner.frontier.iter().filter(|e| !e.scrapped).collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let pick = rand::thread_rng().gen_range(0..candidates.len());
        Ok(Some(candidates[pick].clone()))
    }

    async fn insert_place_if_absent(
        &self,
        place: &NewPlace,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error> {
        let record = Self::place_record(place);

        match tx {
            Some(tx) => {
                let inner = self.inner.lock().unwrap();
                let exists = inner.places.iter().any(|p| p.hash == record.hash)
                    || tx.staged_places.iter().any(|p| p.hash == record.hash);
                if exists {
                    return Ok(false);
                }
                tx.staged_places.push(record);
                Ok(true)
            }
            None => {
                let mut inner = self.inner.lock().unwrap();
                if inner.places.iter().any(|p| p.hash == record.hash) {
                    return Ok(false);
                }
                inner.places.push(record);
                Ok(true)
            }
        }
    }

    async fn mark_scrapped(
        &self,
        id: FrontierEntryId,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error> {
        match tx {
            Some(tx) => {
                let inner = self.inner.lock().unwrap();
                let updatable = inner
                    .frontier
                    .iter()
                    .any(|e| e.id == id && !e.scrapped)
                    && !tx.staged_scrapped.contains(&id);
                if updatable {
                    tx.staged_scrapped.push(id);
                }
                Ok(updatable)
            }
            None => {
                let mut inner = self.inner.lock().unwrap();
                match inner.frontier.iter_mut().find(|e| e.id == id && !e.scrapped) {
                    Some(entry) => {
                        entry.scrapped = true;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    async fn counts(&self) -> Result<StoreCounts, Self::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(StoreCounts {
            frontier_total: inner.frontier.len() as u64,
            frontier_unscrapped: inner.frontier.iter().filter(|e| !e.scrapped).count() as u64,
            places: inner.places.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_url(url: &str) -> SeedUrl {
        SeedUrl {
            url: url.to_string(),
            area: "a".to_string(),
            category: "c".to_string(),
            lat: 1.0,
            lng: 2.0,
        }
    }

    fn place(url: &str) -> NewPlace {
        NewPlace {
            url: url.to_string(),
            area: "a".to_string(),
            category: "c".to_string(),
            lat: 1.0,
            lng: 2.0,
        }
    }

    #[tokio::test]
    async fn reseeding_skips_duplicates() {
        let store = MemoryFrontier::new();
        let entries = vec![seed_url("u1"), seed_url("u2")];

        let first = store.seed(&entries).await.unwrap();
        assert_eq!(first, SeedStats { inserted: 2, skipped: 0 });

        let second = store.seed(&entries).await.unwrap();
        assert_eq!(second, SeedStats { inserted: 0, skipped: 2 });
        assert_eq!(store.counts().await.unwrap().frontier_total, 2);
    }

    #[tokio::test]
    async fn insert_place_is_idempotent() {
        let store = MemoryFrontier::new();
        assert!(store.insert_place_if_absent(&place("p1"), None).await.unwrap());
        assert!(!store.insert_place_if_absent(&place("p1"), None).await.unwrap());
        assert_eq!(store.places().len(), 1);
    }

    #[tokio::test]
    async fn insert_place_dedups_within_a_transaction() {
        let store = MemoryFrontier::new();
        let mut tx = store.begin().await.unwrap();
        assert!(store.insert_place_if_absent(&place("p1"), Some(&mut tx)).await.unwrap());
        assert!(!store.insert_place_if_absent(&place("p1"), Some(&mut tx)).await.unwrap());
        store.commit(tx).await.unwrap();
        assert_eq!(store.places().len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryFrontier::new();
        store.seed(&[seed_url("u1")]).await.unwrap();
        let entry = store.next_unscrapped().await.unwrap().unwrap();

        let mut tx = store.begin().await.unwrap();
        store.insert_place_if_absent(&place("p1"), Some(&mut tx)).await.unwrap();
        store.mark_scrapped(entry.id, Some(&mut tx)).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(store.places().len(), 0);
        assert!(!store.frontier()[0].scrapped);
    }

    #[tokio::test]
    async fn next_unscrapped_exhausts_to_none() {
        let store = MemoryFrontier::new();
        store.seed(&[seed_url("u1")]).await.unwrap();
        let entry = store.next_unscrapped().await.unwrap().unwrap();
        assert!(store.mark_scrapped(entry.id, None).await.unwrap());
        assert!(store.next_unscrapped().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_scrapped_reports_missing_rows() {
        let store = MemoryFrontier::new();
        assert!(!store.mark_scrapped(FrontierEntryId::new(), None).await.unwrap());
    }

    #[tokio::test]
    async fn marking_twice_reports_false_the_second_time() {
        let store = MemoryFrontier::new();
        store.seed(&[seed_url("u1")]).await.unwrap();
        let entry = store.next_unscrapped().await.unwrap().unwrap();
        assert!(store.mark_scrapped(entry.id, None).await.unwrap());
        assert!(!store.mark_scrapped(entry.id, None).await.unwrap());
    }
}
