use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use sessionkeeper_application::ProxyPoolRepository;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{Proxy, ProxyAddress, ProxyHealth, ProxyStatus};

/// PostgreSQL-backed proxy pool.
#[derive(Clone)]
pub struct PostgresProxyPoolRepository {
    pool: PgPool,
}

impl PostgresProxyPoolRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds a proxy to the pool as free, leaving existing entries untouched.
    pub async fn register_proxy(&self, address: &ProxyAddress) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO proxies (address, status)
            VALUES ($1, 'free')
            ON CONFLICT (address) DO NOTHING
            "#,
        )
        .bind(address.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to register proxy '{address}': {error}"))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ProxyRow {
    address: String,
    status: String,
    last_used_ip: Option<String>,
    last_checked_at: Option<DateTime<Utc>>,
}

impl ProxyRow {
    fn into_proxy(self) -> AppResult<Proxy> {
        Ok(Proxy {
            address: ProxyAddress::new(self.address)?,
            status: ProxyStatus::parse(self.status.as_str())?,
            last_used_ip: self.last_used_ip,
            last_checked_at: self.last_checked_at,
        })
    }
}

#[async_trait]
impl ProxyPoolRepository for PostgresProxyPoolRepository {
    async fn find_free_proxy(&self) -> AppResult<Option<Proxy>> {
        let row = sqlx::query_as::<_, ProxyRow>(
            r#"
            SELECT address, status, last_used_ip, last_checked_at
            FROM proxies
            WHERE status = 'free'
            ORDER BY last_checked_at ASC NULLS FIRST, address
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find free proxy: {error}")))?;

        row.map(ProxyRow::into_proxy).transpose()
    }

    async fn compare_and_set_status(
        &self,
        address: &ProxyAddress,
        expected: Option<ProxyStatus>,
        status: ProxyStatus,
        health: Option<&ProxyHealth>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE proxies
            SET status = $2,
                last_used_ip = COALESCE($4, last_used_ip),
                last_checked_at = COALESCE($5, last_checked_at),
                updated_at = now()
            WHERE address = $1
                AND ($3::TEXT IS NULL OR status = $3)
            "#,
        )
        .bind(address.as_str())
        .bind(status.as_str())
        .bind(expected.map(|expected| expected.as_str()))
        .bind(health.and_then(|health| health.exit_ip.as_deref()))
        .bind(health.map(|health| health.observed_at))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to set proxy '{address}' to '{}': {error}",
                status.as_str()
            ))
        })?;

        Ok(result.rows_affected())
    }
}
