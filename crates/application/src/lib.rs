//! Application services and ports for session renewal.

#![forbid(unsafe_code)]

mod eligibility_poller;
mod proxy_lease_service;
mod renewal_dispatcher;
mod renewal_ports;
mod retry_policy;

#[cfg(test)]
mod test_support;

pub use eligibility_poller::EligibilityPoller;
pub use proxy_lease_service::{ProxyLease, ProxyLeaseConfig, ProxyLeaseManager};
pub use renewal_dispatcher::{
    CapacityBudget, CapacityToken, DispatcherConfig, JobDisposition, JobReport, JobTermination,
    RenewalDispatcher, RenewalPorts,
};
pub use renewal_ports::{
    AccountRecordRepository, OperatorChannel, OperatorNotifier, ProxyHealthProbe,
    ProxyPoolRepository, SessionRenewalExecutor,
};
pub use retry_policy::{FailureClass, RetryCounters, RetryDecision, RetryLimits, RetryPolicy};
