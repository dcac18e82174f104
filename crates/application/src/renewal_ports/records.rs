use async_trait::async_trait;
use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{AccountId, AccountRecord, AccountStatus};

/// Repository port for account records awaiting session renewal.
#[async_trait]
pub trait AccountRecordRepository: Send + Sync {
    /// Lists records in one category with the given status, in store order.
    async fn find_by_status(
        &self,
        category: &str,
        status: AccountStatus,
    ) -> AppResult<Vec<AccountRecord>>;

    /// Returns one record by id.
    async fn find_record(&self, category: &str, id: AccountId) -> AppResult<Option<AccountRecord>>;

    /// Sets the record status when the current status matches `expected`.
    ///
    /// `None` for `expected` updates unconditionally. Returns the number of
    /// matched records, which is 0 or 1.
    async fn compare_and_set_status(
        &self,
        category: &str,
        id: AccountId,
        expected: Option<AccountStatus>,
        status: AccountStatus,
    ) -> AppResult<u64>;
}
