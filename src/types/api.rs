use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Paste;

#[derive(Debug, Deserialize)]
pub struct CreatePaste {
    pub content: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub expire_days: Option<u32>,
}

/// Response body for a freshly created paste. The delete key appears here
/// and nowhere else.
#[derive(Debug, Serialize)]
pub struct CreatedPaste {
    pub slug: String,
    pub url: String,
    pub delete_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Public view of a paste; never carries the delete key.
#[derive(Debug, Serialize)]
pub struct PasteInfo {
    pub slug: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Paste> for PasteInfo {
    fn from(paste: Paste) -> Self {
        PasteInfo {
            slug: paste.slug,
            title: paste.title,
            language: paste.language,
            content: paste.content,
            created_at: paste.created_at,
            expires_at: paste.expires_at,
        }
    }
}
