use std::sync::Arc;

use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{AccountRecord, AccountStatus};
use tracing::debug;

use crate::renewal_ports::{AccountRecordRepository, OperatorChannel};

/// Read-only scanner for records whose session needs renewal.
#[derive(Clone)]
pub struct EligibilityPoller {
    repository: Arc<dyn AccountRecordRepository>,
    operator: OperatorChannel,
    categories: Vec<String>,
    max_parallel: usize,
}

impl EligibilityPoller {
    /// Creates a poller over the given categories.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AccountRecordRepository>,
        operator: OperatorChannel,
        categories: Vec<String>,
        max_parallel: usize,
    ) -> Self {
        Self {
            repository,
            operator,
            categories,
            max_parallel,
        }
    }

    /// Returns claimable `used` records, at most the remaining capacity.
    ///
    /// Skips the store entirely when no capacity is left. Results keep
    /// category order, then store order.
    pub async fn poll(&self, active_jobs: usize) -> AppResult<Vec<AccountRecord>> {
        if active_jobs >= self.max_parallel {
            debug!(
                active_jobs,
                max_parallel = self.max_parallel,
                "renewal queue is full, skipping poll"
            );
            return Ok(Vec::new());
        }

        let remaining_capacity = self.max_parallel - active_jobs;
        let mut eligible = Vec::new();

        for category in &self.categories {
            let records = match self
                .repository
                .find_by_status(category.as_str(), AccountStatus::Used)
                .await
            {
                Ok(records) => records,
                Err(error) => {
                    let message =
                        format!("failed to load used records from '{category}': {error}");
                    self.operator
                        .report(message.as_str(), "poll_eligible_records")
                        .await;
                    return Err(error);
                }
            };

            debug!(
                category = %category,
                count = records.len(),
                "loaded used records"
            );
            eligible.extend(records);
        }

        eligible.truncate(remaining_capacity);
        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sessionkeeper_core::AppError;
    use sessionkeeper_domain::AccountStatus;

    use crate::renewal_ports::OperatorChannel;
    use crate::test_support::{FakeRecordRepository, RecordingNotifier, record};

    use super::EligibilityPoller;

    fn poller(
        repository: Arc<FakeRecordRepository>,
        notifier: Arc<RecordingNotifier>,
        max_parallel: usize,
    ) -> EligibilityPoller {
        EligibilityPoller::new(
            repository,
            OperatorChannel::new(notifier),
            vec!["accounts".to_owned(), "mobileaccounts".to_owned()],
            max_parallel,
        )
    }

    #[tokio::test]
    async fn full_capacity_skips_the_store() {
        let repository = Arc::new(FakeRecordRepository::with_records(vec![record(
            "accounts",
            AccountStatus::Used,
        )]));
        let poller = poller(repository.clone(), Arc::default(), 1);

        let records = poller
            .poll(1)
            .await
            .unwrap_or_else(|error| panic!("poll failed: {error}"));

        assert!(records.is_empty());
        assert_eq!(repository.find_by_status_calls().await, 0);
    }

    #[tokio::test]
    async fn poll_concatenates_categories_and_truncates_to_capacity() {
        let first = record("accounts", AccountStatus::Used);
        let second = record("mobileaccounts", AccountStatus::Used);
        let third = record("mobileaccounts", AccountStatus::Used);
        let repository = Arc::new(FakeRecordRepository::with_records(vec![
            first.clone(),
            record("accounts", AccountStatus::Free),
            second.clone(),
            third,
        ]));
        let poller = poller(repository.clone(), Arc::default(), 3);

        let records = poller
            .poll(1)
            .await
            .unwrap_or_else(|error| panic!("poll failed: {error}"));

        assert_eq!(records, vec![first, second]);
        assert_eq!(repository.find_by_status_calls().await, 2);
    }

    #[tokio::test]
    async fn poll_is_read_only_and_repeatable() {
        let repository = Arc::new(FakeRecordRepository::with_records(vec![
            record("accounts", AccountStatus::Used),
            record("mobileaccounts", AccountStatus::Used),
        ]));
        let poller = poller(repository.clone(), Arc::default(), 2);

        let first = poller
            .poll(0)
            .await
            .unwrap_or_else(|error| panic!("poll failed: {error}"));
        let second = poller
            .poll(0)
            .await
            .unwrap_or_else(|error| panic!("poll failed: {error}"));

        assert_eq!(first, second);
        assert!(
            repository
                .snapshot()
                .await
                .iter()
                .all(|stored| stored.status == AccountStatus::Used)
        );
    }

    #[tokio::test]
    async fn store_errors_are_reported_and_propagated() {
        let repository = Arc::new(FakeRecordRepository::default());
        repository.fail_queries(true).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(repository, notifier.clone(), 1);

        let result = poller.poll(0).await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
        let messages = notifier.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "poll_eligible_records");
    }
}
