use crate::models::{Link, LinkStats, NewTransition, Transition, UNDEFINED_COUNTRY};
use crate::storage::trait_def::map_insert_error;
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_link TEXT NOT NULL,
                short_link TEXT NOT NULL UNIQUE,
                access_key TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL REFERENCES links(id),
                from_ip TEXT,
                from_country TEXT,
                from_city TEXT,
                to_ip TEXT,
                to_country TEXT,
                to_city TEXT,
                forwarded_from TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_transitions_link_id ON transitions(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert_link(
        &self,
        original_link: &str,
        short_link: &str,
        access_key: &str,
    ) -> StorageResult<Link> {
        let created_at = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO links (original_link, short_link, access_key, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(original_link)
        .bind(short_link)
        .bind(access_key)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_insert_error)?;

        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, original_link, short_link, access_key, created_at
            FROM links
            WHERE short_link = ?
            "#,
        )
        .bind(short_link)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(link)
    }

    async fn get_link_by_short_link(&self, short_link: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, original_link, short_link, access_key, created_at
            FROM links
            WHERE short_link = ?
            "#,
        )
        .bind(short_link)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_link_by_access_key(&self, access_key: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, original_link, short_link, access_key, created_at
            FROM links
            WHERE access_key = ?
            "#,
        )
        .bind(access_key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn create_transition(&self, link: &Link, transition: &NewTransition) -> Result<()> {
        let created_at = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO transitions (
                link_id, from_ip, from_country, from_city,
                to_ip, to_country, to_city, forwarded_from, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.id)
        .bind(transition.from_ip.as_deref())
        .bind(transition.from_country.as_deref())
        .bind(transition.from_city.as_deref())
        .bind(transition.to_ip.as_deref())
        .bind(transition.to_country.as_deref())
        .bind(transition.to_city.as_deref())
        .bind(transition.forwarded_from.as_deref())
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn get_link_stats(&self, link: &Link) -> Result<LinkStats> {
        let total_transitions = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transitions WHERE link_id = ?",
        )
        .bind(link.id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let transitions_by_country = sqlx::query_as::<_, (Option<String>, i64)>(
            r#"
            SELECT from_country, COUNT(*)
            FROM transitions
            WHERE link_id = ?
            GROUP BY from_country
            "#,
        )
        .bind(link.id)
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(|(country, count)| {
            (
                country.unwrap_or_else(|| UNDEFINED_COUNTRY.to_string()),
                count,
            )
        })
        .collect();

        // Counted over the whole store, not scoped to the link
        let transitions_from_referrer = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transitions WHERE forwarded_from IS NOT NULL",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(LinkStats {
            total_transitions,
            transitions_by_country,
            transitions_from_referrer,
        })
    }

    async fn list_transitions(&self, link: &Link) -> Result<Vec<Transition>> {
        let transitions = sqlx::query_as::<_, Transition>(
            r#"
            SELECT id, link_id, from_ip, from_country, from_city,
                   to_ip, to_country, to_city, forwarded_from, created_at
            FROM transitions
            WHERE link_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(link.id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(transitions)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
