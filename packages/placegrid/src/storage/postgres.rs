use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::storage::FrontierStore;
use crate::types::{
    FrontierEntry, FrontierEntryId, NewPlace, PlaceId, SeedStats, SeedUrl, StoreCounts, UrlHash,
};

pub struct PgFrontierStore {
    pool: PgPool,
}

impl PgFrontierStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema migrations bundled with this crate.
    pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> FrontierEntry {
    FrontierEntry {
        id: FrontierEntryId(row.get("id")),
        hash: UrlHash(row.get("hash")),
        url: row.get("url"),
        area: row.get("area"),
        category: row.get("category"),
        lat: row.get("lat"),
        lng: row.get("lng"),
        scrapped: row.get("scrapped"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl FrontierStore for PgFrontierStore {
    type Transaction = Transaction<'static, Postgres>;
    type Error = sqlx::Error;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        self.pool.begin().await
    }

    async fn commit(&self, tx: Self::Transaction) -> Result<(), Self::Error> {
        tx.commit().await
    }

    async fn rollback(&self, tx: Self::Transaction) -> Result<(), Self::Error> {
        tx.rollback().await
    }

    async fn seed(&self, entries: &[SeedUrl]) -> Result<SeedStats, Self::Error> {
        let mut stats = SeedStats::default();

        for entry in entries {
            let hash = UrlHash::from_url(&entry.url);
            let rows = sqlx::query(
                r#"
                INSERT INTO frontier_urls (id, hash, url, area, category, lat, lng, scrapped)
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
                ON CONFLICT (hash) DO NOTHING
                "#,
            )
            .bind(FrontierEntryId::new().0)
            .bind(hash.as_str())
            .bind(&entry.url)
            .bind(&entry.area)
            .bind(&entry.category)
            .bind(entry.lat)
            .bind(entry.lng)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if rows == 1 {
                stats.inserted += 1;
            } else {
                stats.skipped += 1;
                tracing::debug!(url = %entry.url, "search URL already seeded");
            }
        }

        Ok(stats)
    }

    async fn truncate_frontier(&self) -> Result<(), Self::Error> {
        sqlx::query("TRUNCATE TABLE frontier_urls")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn next_unscrapped(&self) -> Result<Option<FrontierEntry>, Self::Error> {
        // random() ordering keeps selection uniform, so the crawl exhibits no
        // geographic or category pattern.
        let row = sqlx::query(
            r#"
            SELECT id, hash, url, area, category, lat, lng, scrapped, created_at
            FROM frontier_urls
            WHERE scrapped = FALSE
            ORDER BY random()
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn insert_place_if_absent(
        &self,
        place: &NewPlace,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error> {
        let hash = UrlHash::from_url(&place.url);
        let query = sqlx::query(
            r#"
            INSERT INTO place_urls (id, hash, url, area, category, lat, lng, scrapped)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
            ON CONFLICT (hash) DO NOTHING
            "#,
        )
        .bind(PlaceId::new().0)
        .bind(hash.as_str())
        .bind(&place.url)
        .bind(&place.area)
        .bind(&place.category)
        .bind(place.lat)
        .bind(place.lng);

        let result = match tx {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };

        Ok(result.rows_affected() == 1)
    }

    async fn mark_scrapped(
        &self,
        id: FrontierEntryId,
        tx: Option<&mut Self::Transaction>,
    ) -> Result<bool, Self::Error> {
        // The scrapped guard keeps the returned bool honest when another
        // worker already flipped the flag.
        let query =
            sqlx::query("UPDATE frontier_urls SET scrapped = TRUE WHERE id = $1 AND scrapped = FALSE")
                .bind(id.0);

        let result = match tx {
            Some(tx) => query.execute(&mut **tx).await?,
            None => query.execute(&self.pool).await?,
        };

        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self) -> Result<StoreCounts, Self::Error> {
        let frontier_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM frontier_urls")
            .fetch_one(&self.pool)
            .await?;
        let frontier_unscrapped: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM frontier_urls WHERE scrapped = FALSE")
                .fetch_one(&self.pool)
                .await?;
        let places: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM place_urls")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreCounts {
            frontier_total: frontier_total as u64,
            frontier_unscrapped: frontier_unscrapped as u64,
            places: places as u64,
        })
    }
}
