use crate::models::{generate_token, Link, LinkStats, NewTransition, Transition};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use thiserror::Error;

/// Attempts made by `create_link` before giving up on token collisions
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short link or access key already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Map an insert failure, separating unique-constraint violations from the rest
pub(crate) fn map_insert_error(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Other(err.into()),
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes if absent)
    async fn init(&self) -> Result<()>;

    /// Insert a link with caller-provided tokens; a duplicate token yields `Conflict`
    async fn insert_link(
        &self,
        original_link: &str,
        short_link: &str,
        access_key: &str,
    ) -> StorageResult<Link>;

    /// Create a link with freshly generated tokens, retrying on collision
    async fn create_link(&self, original_link: &str) -> StorageResult<Link> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let short_link = generate_token();
            let access_key = generate_token();

            match self
                .insert_link(original_link, &short_link, &access_key)
                .await
            {
                Err(StorageError::Conflict) => {
                    tracing::warn!(attempt, "link token collision, regenerating");
                }
                other => return other,
            }
        }

        Err(StorageError::Other(anyhow!(
            "failed to generate unique link tokens after {MAX_TOKEN_ATTEMPTS} attempts"
        )))
    }

    async fn get_link_by_short_link(&self, short_link: &str) -> Result<Option<Link>>;

    async fn get_link_by_access_key(&self, access_key: &str) -> Result<Option<Link>>;

    /// Record one visit of `link`
    async fn create_transition(&self, link: &Link, transition: &NewTransition) -> Result<()>;

    /// Per-link totals and country breakdown, plus the store-wide referrer count
    async fn get_link_stats(&self, link: &Link) -> Result<LinkStats>;

    /// All transitions of `link`, oldest first
    async fn list_transitions(&self, link: &Link) -> Result<Vec<Transition>>;

    /// Close the underlying connection pool
    async fn close(&self);
}
