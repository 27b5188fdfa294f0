use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::any::{AnyPool, AnyPoolOptions};

use crate::config;
use crate::types::Paste;
use crate::ApiResult;

const CREATE_PASTE_TABLE: &str = "CREATE TABLE IF NOT EXISTS paste ( \
     slug TEXT PRIMARY KEY, \
     title TEXT, \
     language TEXT, \
     content TEXT NOT NULL, \
     delete_key TEXT NOT NULL, \
     created_at BIGINT NOT NULL, \
     expires_at BIGINT NOT NULL \
 )";

// expires_at is range-scanned by the purge sweep
const CREATE_EXPIRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS paste_expires_at_idx ON paste (expires_at)";

/// Outcome of an insert attempt, so the caller can retry a taken slug.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertPaste {
    Inserted,
    SlugTaken,
}

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to a database by URL with a bounded connection pool. Pool
    /// exhaustion fails after the acquire timeout instead of queuing.
    pub async fn connect(config: &config::Database) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the paste table and its expiry index if missing.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(CREATE_PASTE_TABLE).execute(&mut conn).await?;
        sqlx::query(CREATE_EXPIRY_INDEX).execute(&mut conn).await?;
        Ok(())
    }

    /// Insert a paste, reporting a slug collision instead of failing on one.
    pub async fn insert_paste(&self, paste: &Paste) -> ApiResult<InsertPaste> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "INSERT INTO paste (slug, title, language, content, delete_key, created_at, \
             expires_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&paste.slug)
        .bind(paste.title.as_deref())
        .bind(paste.language.as_deref())
        .bind(&paste.content)
        .bind(&paste.delete_key)
        .bind(paste.created_at.timestamp())
        .bind(paste.expires_at.timestamp())
        .execute(&mut conn)
        .await;

        match result {
            Ok(_) => Ok(InsertPaste::Inserted),
            Err(err) if is_unique_violation(&err) => Ok(InsertPaste::SlugTaken),
            Err(err) => Err(err.into()),
        }
    }

    /// Get a paste by slug, expired or not.
    pub async fn get_paste(&self, slug: &str) -> ApiResult<Option<Paste>> {
        let mut conn = self.pool.acquire().await?;
        let paste = sqlx::query_as::<_, Paste>(
            "SELECT slug, title, language, content, delete_key, created_at, expires_at \
             FROM paste WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&mut conn)
        .await?;
        Ok(paste)
    }

    /// Delete a paste by slug. Reports whether a row was removed.
    pub async fn delete_paste(&self, slug: &str) -> ApiResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM paste WHERE slug = ?")
            .bind(slug)
            .execute(&mut conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every paste that expired before `now`. Returns the count.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> ApiResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM paste WHERE expires_at < ?")
            .bind(now.timestamp())
            .execute(&mut conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// The raw pool, for tests that starve it.
    #[cfg(test)]
    pub(crate) fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Result codes raised by a violated slug constraint: sqlite primary key
/// (1555), sqlite unique index (2067), postgres unique_violation (23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("1555" | "2067" | "23505"))
        }
        _ => false,
    }
}
