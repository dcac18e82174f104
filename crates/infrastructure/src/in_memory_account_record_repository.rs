use async_trait::async_trait;
use sessionkeeper_application::AccountRecordRepository;
use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{AccountId, AccountRecord, AccountStatus};
use tokio::sync::RwLock;

/// In-memory account record store for development runs and tests.
///
/// Records keep insertion order, which stands in for store order.
#[derive(Default)]
pub struct InMemoryAccountRecordRepository {
    records: RwLock<Vec<AccountRecord>>,
}

impl InMemoryAccountRecordRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one record.
    pub async fn upsert(&self, record: AccountRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|stored| stored.id == record.id) {
            Some(stored) => *stored = record,
            None => records.push(record),
        }
    }
}

#[async_trait]
impl AccountRecordRepository for InMemoryAccountRecordRepository {
    async fn find_by_status(
        &self,
        category: &str,
        status: AccountStatus,
    ) -> AppResult<Vec<AccountRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|record| record.category == category && record.status == status)
            .cloned()
            .collect())
    }

    async fn find_record(&self, category: &str, id: AccountId) -> AppResult<Option<AccountRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|record| record.category == category && record.id == id)
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        category: &str,
        id: AccountId,
        expected: Option<AccountStatus>,
        status: AccountStatus,
    ) -> AppResult<u64> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|record| {
            record.category == category
                && record.id == id
                && expected.is_none_or(|expected| record.status == expected)
        }) else {
            return Ok(0);
        };

        record.status = status;
        Ok(1)
    }
}
