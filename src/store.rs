use chrono::{SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Limits;
use crate::db::{Database, InsertPaste};
use crate::slug;
use crate::types::Paste;
use crate::{ApiError, ApiResult};

/// Validation, slug assignment, and expiry bookkeeping on top of the
/// database. Built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct PasteStore {
    db: Database,
    limits: Limits,
}

impl PasteStore {
    pub fn new(db: Database, limits: Limits) -> Self {
        Self { db, limits }
    }

    /// Validate and persist a new paste, returning it with its assigned slug.
    pub async fn create(
        &self,
        content: String,
        title: Option<String>,
        language: Option<String>,
        expire_days: Option<u32>,
    ) -> ApiResult<Paste> {
        if content.trim().is_empty() {
            return Err(ApiError::EmptyContent);
        }
        if content.len() > self.limits.max_content_size {
            return Err(ApiError::ContentTooLarge {
                max: self.limits.max_content_size,
            });
        }
        let days = expire_days.unwrap_or(self.limits.default_expiry_days);
        if !self.limits.expiry_days.contains(&days) {
            return Err(ApiError::InvalidExpiry { days });
        }

        let created_at = Utc::now().trunc_subsecs(0);
        let expires_at = created_at
            .checked_add_signed(chrono::Duration::days(i64::from(days)))
            .ok_or_else(|| ApiError::InvalidExpiry { days })?;
        let paste = Paste {
            slug: String::new(),
            title: title.filter(|title| !title.is_empty()),
            language: language.filter(|language| !language.is_empty()),
            content,
            delete_key: Uuid::new_v4().to_string(),
            created_at,
            expires_at,
        };

        self.insert_with_slugs(paste, slug::candidates()).await
    }

    /// Try each candidate slug in order until the uniqueness constraint
    /// admits one. The constraint is the single point of truth, so two
    /// concurrent creators drawing the same slug cannot both win.
    async fn insert_with_slugs(
        &self,
        mut paste: Paste,
        candidates: impl Iterator<Item = String>,
    ) -> ApiResult<Paste> {
        for candidate in candidates {
            paste.slug = candidate;
            match self.db.insert_paste(&paste).await? {
                InsertPaste::Inserted => {
                    info!(
                        "new paste: slug='{slug}', expires_at='{expires_at}', size={size}",
                        slug = paste.slug,
                        expires_at = paste.expires_at,
                        size = paste.content.len()
                    );
                    return Ok(paste);
                }
                InsertPaste::SlugTaken => continue,
            }
        }

        Err(ApiError::SlugExhausted)
    }

    /// Fetch a live paste. Missing and expired slugs are indistinguishable
    /// to the caller.
    pub async fn fetch(&self, slug: &str) -> ApiResult<Paste> {
        let Some(paste) = self.db.get_paste(slug).await? else {
            return Err(ApiError::NotFound);
        };

        if paste.is_expired(Utc::now()) {
            // lazy removal; the paste is gone to the caller either way
            if let Err(err) = self.db.delete_paste(slug).await {
                warn!("failed to delete expired paste '{slug}': {err}");
            }
            return Err(ApiError::NotFound);
        }

        Ok(paste)
    }

    /// Delete a paste if the presented delete key matches its stored one.
    pub async fn delete(&self, slug: &str, delete_key: &str) -> ApiResult<()> {
        let paste = self.fetch(slug).await?;
        if paste.delete_key != delete_key {
            return Err(ApiError::WrongDeleteKey);
        }

        self.db.delete_paste(slug).await?;
        info!("deleted paste: slug='{slug}'");
        Ok(())
    }

    /// Physically remove every expired paste. Returns how many went.
    pub async fn purge_expired(&self) -> ApiResult<u64> {
        self.db.delete_expired(Utc::now()).await
    }
}
