pub mod queries;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{LicenseFilter, LicenseRecord, NewLicense, StoredLicense};
use crate::store::LicenseStore;

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    data TEXT NOT NULL CHECK (json_valid(data)),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_license_domain
    ON documents (collection, json_extract(data, '$.license'), json_extract(data, '$.domain'));
CREATE INDEX IF NOT EXISTS idx_documents_domain
    ON documents (collection, json_extract(data, '$.domain'));
";

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open (creating if needed) the document database at `path`.
pub fn open_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
    });
    let pool = Pool::builder().max_size(8).build(manager)?;
    init_db(&*pool.get()?)?;
    Ok(pool)
}

/// Single-connection in-memory database. Every pooled in-memory connection is
/// its own database, hence the pool size of one.
pub fn open_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;
    init_db(&*pool.get()?)?;
    Ok(pool)
}

/// [`LicenseStore`] backed by the `licenses` collection of the document database.
#[derive(Clone)]
pub struct SqliteLicenseStore {
    pool: DbPool,
}

impl SqliteLicenseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run blocking SQLite work off the async executor.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| {
                tracing::error!(error = %e, "No connection to the license database");
                AppError::StoreUnavailable
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("License store task failed: {}", e)))?
    }
}

#[async_trait]
impl LicenseStore for SqliteLicenseStore {
    async fn insert(&self, license: NewLicense) -> Result<String> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = license.into_record(created_at.clone());
        let data = serde_json::to_value(&record)
            .map_err(|e| AppError::WriteFailure(format!("Failed to encode license: {}", e)))?;

        self.with_conn(move |conn| {
            queries::insert_document(conn, queries::LICENSES, &data, &created_at)
                .map_err(|e| AppError::WriteFailure(e.to_string()))
        })
        .await
    }

    async fn find_one(&self, filter: &LicenseFilter) -> Result<Option<StoredLicense>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let Some((id, doc)) =
                queries::find_one_document(conn, queries::LICENSES, &filter.predicates())?
            else {
                return Ok(None);
            };
            let record: LicenseRecord = serde_json::from_value(doc).map_err(|e| {
                AppError::Internal(format!("License document {} is malformed: {}", id, e))
            })?;
            Ok(Some(StoredLicense { id, record }))
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }
}
