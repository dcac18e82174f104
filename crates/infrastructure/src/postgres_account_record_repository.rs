use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use sessionkeeper_application::AccountRecordRepository;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{AccountId, AccountRecord, AccountStatus};

/// PostgreSQL-backed repository for account records.
#[derive(Clone)]
pub struct PostgresAccountRecordRepository {
    pool: PgPool,
}

impl PostgresAccountRecordRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccountRecordRow {
    id: uuid::Uuid,
    category: String,
    status: String,
    identity: String,
}

impl AccountRecordRow {
    fn into_record(self) -> AppResult<AccountRecord> {
        Ok(AccountRecord::new(
            AccountId::from_uuid(self.id),
            self.category,
            AccountStatus::parse(self.status.as_str())?,
            self.identity,
        ))
    }
}

#[async_trait]
impl AccountRecordRepository for PostgresAccountRecordRepository {
    async fn find_by_status(
        &self,
        category: &str,
        status: AccountStatus,
    ) -> AppResult<Vec<AccountRecord>> {
        let rows = sqlx::query_as::<_, AccountRecordRow>(
            r#"
            SELECT id, category, status, identity
            FROM account_records
            WHERE category = $1 AND status = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(category)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list '{status}' account records in '{category}': {error}"
            ))
        })?;

        rows.into_iter().map(AccountRecordRow::into_record).collect()
    }

    async fn find_record(&self, category: &str, id: AccountId) -> AppResult<Option<AccountRecord>> {
        let row = sqlx::query_as::<_, AccountRecordRow>(
            r#"
            SELECT id, category, status, identity
            FROM account_records
            WHERE category = $1 AND id = $2
            "#,
        )
        .bind(category)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load account record '{id}' in '{category}': {error}"
            ))
        })?;

        row.map(AccountRecordRow::into_record).transpose()
    }

    async fn compare_and_set_status(
        &self,
        category: &str,
        id: AccountId,
        expected: Option<AccountStatus>,
        status: AccountStatus,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE account_records
            SET status = $3, updated_at = now()
            WHERE category = $1
                AND id = $2
                AND ($4::TEXT IS NULL OR status = $4)
            "#,
        )
        .bind(category)
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(expected.map(|expected| expected.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to set account record '{id}' in '{category}' to '{status}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }
}
