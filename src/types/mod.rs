use chrono::{DateTime, TimeZone, Utc};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};

pub mod api;

/// One stored paste. Timestamps are kept at second precision to match the
/// epoch-second columns they round-trip through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paste {
    pub slug: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: String,
    pub delete_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Paste {
    /// A paste is gone strictly after its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// The any driver decodes i64 but not chrono types, so rows are mapped by hand.
impl<'r> FromRow<'r, AnyRow> for Paste {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Paste {
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            language: row.try_get("language")?,
            content: row.try_get("content")?,
            delete_key: row.try_get("delete_key")?,
            created_at: datetime_column(row, "created_at")?,
            expires_at: datetime_column(row, "expires_at")?,
        })
    }
}

fn datetime_column(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let secs: i64 = row.try_get(column)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| sqlx::Error::ColumnDecode {
            index: column.to_owned(),
            source: format!("timestamp {secs} out of range").into(),
        })
}
