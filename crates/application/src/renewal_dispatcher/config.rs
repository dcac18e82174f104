use crate::proxy_lease_service::ProxyLeaseConfig;
use crate::retry_policy::RetryLimits;

use super::*;

/// Upper bound for every configured interval, delay and timeout.
const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Runtime limits of one renewal dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum jobs holding capacity at once.
    pub max_parallel: usize,
    /// Interval between eligibility polls.
    pub poll_interval: Duration,
    /// Per-class retry budgets.
    pub retry_limits: RetryLimits,
    /// Delay before a job that found no proxy goes back to the queue.
    pub proxy_retry_delay: Duration,
    /// Proxy acquisition budget inside one attempt.
    pub proxy_lease: ProxyLeaseConfig,
    /// Deadline for one executor call.
    pub job_timeout: Duration,
    /// Record categories to poll, in order.
    pub categories: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            poll_interval: Duration::from_secs(20),
            retry_limits: RetryLimits::default(),
            proxy_retry_delay: Duration::from_secs(180),
            proxy_lease: ProxyLeaseConfig::default(),
            job_timeout: Duration::from_secs(15 * 60),
            categories: AccountCategory::ALL
                .iter()
                .map(|category| category.as_str().to_owned())
                .collect(),
        }
    }
}

impl DispatcherConfig {
    /// Validates limits and categories.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_parallel == 0 {
            return Err(AppError::Validation(
                "max_parallel must be greater than zero".to_owned(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(AppError::Validation(
                "poll_interval must be greater than zero".to_owned(),
            ));
        }

        if self.job_timeout.is_zero() {
            return Err(AppError::Validation(
                "job_timeout must be greater than zero".to_owned(),
            ));
        }

        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("proxy_retry_delay", self.proxy_retry_delay),
            ("job_timeout", self.job_timeout),
            ("proxy acquire backoff", self.proxy_lease.acquire_backoff),
        ] {
            if value > MAX_CONFIGURED_DURATION {
                return Err(AppError::Validation(format!(
                    "{name} must not exceed {} seconds",
                    MAX_CONFIGURED_DURATION.as_secs()
                )));
            }
        }

        if self.proxy_lease.acquire_attempts == 0 {
            return Err(AppError::Validation(
                "proxy acquire attempts must be greater than zero".to_owned(),
            ));
        }

        if self.categories.is_empty() {
            return Err(AppError::Validation(
                "at least one record category must be configured".to_owned(),
            ));
        }

        if self
            .categories
            .iter()
            .any(|category| category.trim().is_empty())
        {
            return Err(AppError::Validation(
                "record categories must not be empty".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::proxy_lease_service::ProxyLeaseConfig;

    use super::{DispatcherConfig, MAX_CONFIGURED_DURATION};

    #[test]
    fn default_config_is_valid() {
        let config = DispatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.categories, vec!["accounts", "mobileaccounts"]);
        assert_eq!(config.retry_limits.definite, 3);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = DispatcherConfig {
            max_parallel: 0,
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DispatcherConfig {
            categories: vec![" ".to_owned()],
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DispatcherConfig {
            job_timeout: Duration::ZERO,
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let config = DispatcherConfig {
            proxy_retry_delay: Duration::MAX,
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DispatcherConfig {
            proxy_lease: ProxyLeaseConfig {
                acquire_attempts: 5,
                acquire_backoff: MAX_CONFIGURED_DURATION + Duration::from_secs(1),
            },
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DispatcherConfig {
            job_timeout: MAX_CONFIGURED_DURATION,
            ..DispatcherConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
