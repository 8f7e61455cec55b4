use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use snooytbust_common::{BlacklistEntry, MediaPlatform};

use crate::traits::BlacklistStore;

/// Read-only view of the externally maintained `dtg_blacklist` table.
pub struct PgBlacklist {
    pool: PgPool,
}

impl PgBlacklist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and verify the database answers. Failure here is fatal.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklist {
    async fn find(
        &self,
        publisher_id: &str,
        platform: MediaPlatform,
    ) -> Result<Option<BlacklistEntry>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id::bigint FROM dtg_blacklist
             WHERE media_channel_id = $1 AND media_platform_id = $2
             LIMIT 1",
        )
        .bind(publisher_id)
        .bind(platform.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id.map(|id| BlacklistEntry { id }))
    }
}
