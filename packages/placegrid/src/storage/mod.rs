use async_trait::async_trait;

use crate::types::{FrontierEntry, FrontierEntryId, NewPlace, SeedStats, SeedUrl, StoreCounts};

pub mod memory;
pub mod postgres;

pub use memory::MemoryFrontier;
pub use postgres::PgFrontierStore;

/// Persistent dedup ledger for search URLs (the frontier) and discovered
/// place URLs.
///
/// The store is the single source of truth for "has this URL been processed";
/// callers never cache scrapped state across iterations. Hash uniqueness
/// constraints at the storage layer, not in-process locking, are what make
/// concurrent callers safe.
///
/// A transaction brackets exactly one "process one frontier entry" unit of
/// work, so place inserts and the scrapped-flag flip land atomically.
#[async_trait]
pub trait FrontierStore: Send + Sync {
    type Transaction: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;
    async fn commit(&self, tx: Self::Transaction) -> Result<(), Self::Error>;
    async fn rollback(&self, tx: Self::Transaction) -> Result<(), Self::Error>;

    /// Insert frontier rows, skipping ones whose hash already exists.
    /// Duplicates are logged, never an error, so reseeding is idempotent.
    async fn seed(&self, entries: &[SeedUrl]) -> Result<SeedStats, Self::Error>;

    /// Clear all frontier rows. Destructive; only for explicit reseed runs.
    async fn truncate_frontier(&self) -> Result<(), Self::Error>;

    /// One frontier entry chosen uniformly at random among unscrapped rows,
    /// or None when the frontier is exhausted.
    async fn next_unscrapped(&self) -> Result<Option<FrontierEntry>, Self::Error>;

    /// Insert a place row keyed by hash(url). Returns whether it was newly
    /// created; an already-present row is a normal outcome, not a failure.
    async fn insert_place_if_absent(
        &self,
        place: &NewPlace,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error>;

    /// Flip `scrapped` for exactly one frontier row. Returns whether a row
    /// was actually updated, guarding against racing updates or deletes.
    async fn mark_scrapped(
        &self,
        id: FrontierEntryId,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error>;

    /// Row counts for the operator surface.
    async fn counts(&self) -> Result<StoreCounts, Self::Error>;
}
