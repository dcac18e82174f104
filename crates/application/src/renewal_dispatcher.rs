//! Bounded renewal dispatcher: claims eligible records, queues them as jobs and
//! drives each job through its workflow state machine.
//!
//! Capacity is held by explicit tokens. A token is taken when a record is
//! claimed and dropped with the job at its terminal outcome, so the number of
//! live jobs never exceeds `max_parallel`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{
    AccountCategory, AccountId, AccountRecord, AccountStatus, JobStage, ProxyAddress,
    RenewalOutcome,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::eligibility_poller::EligibilityPoller;
use crate::proxy_lease_service::ProxyLeaseManager;
use crate::renewal_ports::{
    AccountRecordRepository, OperatorChannel, OperatorNotifier, ProxyHealthProbe,
    ProxyPoolRepository, SessionRenewalExecutor,
};
use crate::retry_policy::{FailureClass, RetryCounters, RetryDecision, RetryPolicy};

mod capacity;
mod claim;
mod config;
mod execution;
mod queue;
mod worker;

pub use capacity::{CapacityBudget, CapacityToken};
pub use config::DispatcherConfig;
pub use execution::{JobDisposition, JobReport, JobTermination};

use queue::{JobQueue, RenewalJob};

/// Ports the dispatcher drives.
#[derive(Clone)]
pub struct RenewalPorts {
    /// Account record store.
    pub records: Arc<dyn AccountRecordRepository>,
    /// Leasable proxy pool.
    pub proxies: Arc<dyn ProxyPoolRepository>,
    /// Post-use proxy probe.
    pub probe: Arc<dyn ProxyHealthProbe>,
    /// External renewal workflow.
    pub executor: Arc<dyn SessionRenewalExecutor>,
    /// Operator-facing failure channel.
    pub notifier: Arc<dyn OperatorNotifier>,
}

/// Single-instance renewal dispatcher.
#[derive(Clone)]
pub struct RenewalDispatcher {
    config: DispatcherConfig,
    records: Arc<dyn AccountRecordRepository>,
    executor: Arc<dyn SessionRenewalExecutor>,
    poller: EligibilityPoller,
    proxies: ProxyLeaseManager,
    operator: OperatorChannel,
    policy: RetryPolicy,
    capacity: Arc<CapacityBudget>,
    queue: Arc<JobQueue>,
    claim_lock: Arc<Mutex<()>>,
}

impl RenewalDispatcher {
    /// Creates a dispatcher after validating its configuration.
    pub fn new(config: DispatcherConfig, ports: RenewalPorts) -> AppResult<Self> {
        config.validate()?;

        let operator = OperatorChannel::new(ports.notifier);
        let poller = EligibilityPoller::new(
            ports.records.clone(),
            operator.clone(),
            config.categories.clone(),
            config.max_parallel,
        );
        let proxies = ProxyLeaseManager::new(
            ports.proxies,
            ports.probe,
            operator.clone(),
            config.proxy_lease,
        );
        let policy = RetryPolicy::new(config.retry_limits, config.proxy_retry_delay);
        let capacity = Arc::new(CapacityBudget::new(config.max_parallel));

        Ok(Self {
            records: ports.records,
            executor: ports.executor,
            poller,
            proxies,
            operator,
            policy,
            capacity,
            queue: Arc::new(JobQueue::default()),
            claim_lock: Arc::new(Mutex::new(())),
            config,
        })
    }

    /// Returns the dispatcher configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Number of jobs holding a capacity token, queued or in flight.
    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.capacity.active()
    }

    /// Number of records that can still be claimed.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.remaining()
    }

    /// Number of jobs waiting for a worker slot, including delayed retries.
    pub async fn pending_jobs(&self) -> usize {
        self.queue.len().await
    }

    /// Restores one record to `used` if this dispatcher still owns it.
    ///
    /// Failures are reported and swallowed: the caller is already on a
    /// failure path.
    async fn restore_used(&self, record: &AccountRecord, context: &str) {
        match self
            .records
            .compare_and_set_status(
                record.category.as_str(),
                record.id,
                Some(AccountStatus::Updating),
                AccountStatus::Used,
            )
            .await
        {
            Ok(0) => {
                debug!(
                    record_id = %record.id,
                    category = %record.category,
                    "record no longer updating, nothing to restore"
                );
            }
            Ok(_) => {
                debug!(record_id = %record.id, category = %record.category, "restored record to used");
            }
            Err(error) => {
                warn!(
                    record_id = %record.id,
                    category = %record.category,
                    error = %error,
                    "failed to restore record to used"
                );
                let message = format!(
                    "failed to restore record '{}' in '{}' to used: {error}",
                    record.id, record.category
                );
                self.operator.report(message.as_str(), context).await;
            }
        }
    }
}
