//! [`DogStore`]: keyed breed → image table with batch upsert and full-scan reads.
//!
//! SQLite runs in WAL mode so the ingestion writer and HTTP readers can work
//! side by side; the pool serialises writers and `busy_timeout` absorbs the
//! short waits when a reader and a commit collide.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::{debug, info};

use dogmirror_core::Record;

use crate::error::StoreError;

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Insert new breeds, replace the image of existing ones. Rows whose image is
/// unchanged are left alone so they don't count as affected.
const UPSERT_SQL: &str = "\
    INSERT INTO dogs (breed, image, created_at, updated_at) \
    VALUES (?1, ?2, ?3, ?3) \
    ON CONFLICT(breed) DO UPDATE SET \
        image = excluded.image, \
        updated_at = excluded.updated_at \
    WHERE dogs.image <> excluded.image";

/// Cloneable handle to the persistent breed table.
#[derive(Debug, Clone)]
pub struct DogStore {
    pool: SqlitePool,
}

impl DogStore {
    /// Open (creating if needed) the SQLite file at `path` and apply migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Initialized sqlite store at {}", path.display());

        Ok(Self { pool })
    }

    /// Upsert a batch in a single transaction. Last write wins per breed,
    /// including duplicates inside `records`.
    ///
    /// Returns the number of distinct breeds inserted or whose image changed.
    pub async fn upsert_batch(&self, records: &[Record]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Collapse repeated breeds to their last image before writing.
        let latest: BTreeMap<&str, &str> = records
            .iter()
            .map(|r| (r.breed.as_str(), r.image.as_str()))
            .collect();

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut affected = 0u64;

        for (breed, image) in latest {
            let result = sqlx::query(UPSERT_SQL)
                .bind(breed)
                .bind(image)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            affected += result.rows_affected();
        }

        tx.commit().await?;
        debug!(batch = records.len(), affected, "batch upserted");
        Ok(affected)
    }

    /// Full scan of the table, ordered by breed.
    pub async fn snapshot(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT breed, image FROM dogs ORDER BY breed")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Number of stored breeds.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dogs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
