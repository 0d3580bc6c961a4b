use crate::models::{Link, LinkStats, NewTransition, Transition, UNDEFINED_COUNTRY};
use crate::storage::trait_def::map_insert_error;
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id BIGSERIAL PRIMARY KEY,
                original_link TEXT NOT NULL,
                short_link TEXT NOT NULL UNIQUE,
                access_key TEXT NOT NULL UNIQUE,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transitions (
                id BIGSERIAL PRIMARY KEY,
                link_id BIGINT NOT NULL REFERENCES links(id),
                from_ip TEXT,
                from_country TEXT,
                from_city TEXT,
                to_ip TEXT,
                to_country TEXT,
                to_city TEXT,
                forwarded_from TEXT,
                created_at BIGINT NOT NULL
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

        let link = sqlx::query_as::<_, Link>(
            r#"
            INSERT INTO links (original_link, short_link, access_key, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, original_link, short_link, access_key, created_at
            "#,
        )
        .bind(original_link)
        .bind(short_link)
        .bind(access_key)
        .bind(created_at)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(map_insert_error)?;

        Ok(link)
    }

    async fn get_link_by_short_link(&self, short_link: &str) -> Result<Option<Link>> {
        let link = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, original_link, short_link, access_key, created_at
            FROM links
            WHERE short_link = $1
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
            WHERE access_key = $1
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
            "SELECT COUNT(*) FROM transitions WHERE link_id = $1",
        )
        .bind(link.id)
        .fetch_one(self.pool.as_ref())
        .await?;

        let transitions_by_country = sqlx::query_as::<_, (Option<String>, i64)>(
            r#"
            SELECT from_country, COUNT(*)
            FROM transitions
            WHERE link_id = $1
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
            WHERE link_id = $1
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
