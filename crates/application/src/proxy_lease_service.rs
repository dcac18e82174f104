use std::sync::Arc;
use std::time::Duration;

use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{ProxyAddress, ProxyHealth, ProxyStatus};
use tracing::{debug, info, warn};

use crate::renewal_ports::{OperatorChannel, ProxyHealthProbe, ProxyPoolRepository};

/// Acquisition budget for proxy leases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyLeaseConfig {
    /// Pool scans per acquisition before giving up.
    pub acquire_attempts: u32,
    /// Base backoff between scans, multiplied by the attempt number.
    pub acquire_backoff: Duration,
}

impl Default for ProxyLeaseConfig {
    fn default() -> Self {
        Self {
            acquire_attempts: 5,
            acquire_backoff: Duration::from_secs(2),
        }
    }
}

/// One proxy held by a renewal job until it is passed back to
/// [`ProxyLeaseManager::release`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "leased proxies must be released"]
pub struct ProxyLease {
    address: ProxyAddress,
}

impl ProxyLease {
    /// Returns the leased proxy address.
    pub fn address(&self) -> &ProxyAddress {
        &self.address
    }
}

/// Leases proxies from the pool and hands them back with fresh health data.
#[derive(Clone)]
pub struct ProxyLeaseManager {
    pool: Arc<dyn ProxyPoolRepository>,
    probe: Arc<dyn ProxyHealthProbe>,
    operator: OperatorChannel,
    config: ProxyLeaseConfig,
}

impl ProxyLeaseManager {
    /// Creates a lease manager.
    #[must_use]
    pub fn new(
        pool: Arc<dyn ProxyPoolRepository>,
        probe: Arc<dyn ProxyHealthProbe>,
        operator: OperatorChannel,
        config: ProxyLeaseConfig,
    ) -> Self {
        Self {
            pool,
            probe,
            operator,
            config: ProxyLeaseConfig {
                acquire_attempts: config.acquire_attempts.max(1),
                acquire_backoff: config.acquire_backoff,
            },
        }
    }

    /// Leases any free proxy, scanning the pool up to the configured budget.
    ///
    /// Returns [`AppError::NoProxyAvailable`] when every scan came back empty
    /// or lost the race for the proxy it found. Store errors propagate as-is.
    pub async fn acquire(&self) -> AppResult<ProxyLease> {
        let attempts = self.config.acquire_attempts;

        for attempt in 1..=attempts {
            if let Some(proxy) = self.pool.find_free_proxy().await? {
                let matched = self
                    .pool
                    .compare_and_set_status(
                        &proxy.address,
                        Some(ProxyStatus::Free),
                        ProxyStatus::Leased,
                        None,
                    )
                    .await?;

                if matched == 1 {
                    info!(proxy = %proxy.address, attempt, "leased proxy");
                    return Ok(ProxyLease {
                        address: proxy.address,
                    });
                }

                debug!(proxy = %proxy.address, attempt, "lost proxy lease race");
            } else {
                debug!(attempt, attempts, "no free proxy in pool");
            }

            if attempt < attempts {
                let delay = self.config.acquire_backoff.saturating_mul(attempt);
                tokio::time::sleep(delay).await;
            }
        }

        Err(AppError::NoProxyAvailable(format!(
            "no free proxy could be leased after {attempts} attempts"
        )))
    }

    /// Hands the proxy back to the pool as free.
    ///
    /// The post-use probe result is attached when the proxy answered. Probe
    /// and store failures are logged and reported, never returned.
    pub async fn release(&self, lease: ProxyLease) {
        let address = lease.address;

        let health = match self.probe.probe(&address).await {
            Ok(health) if health.is_reachable() => Some(health),
            Ok(_) => {
                warn!(proxy = %address, "proxy did not answer post-use probe");
                None
            }
            Err(error) => {
                warn!(proxy = %address, error = %error, "post-use proxy probe failed");
                None
            }
        };

        self.mark_free(&address, health.as_ref()).await;
    }

    async fn mark_free(&self, address: &ProxyAddress, health: Option<&ProxyHealth>) {
        match self
            .pool
            .compare_and_set_status(address, None, ProxyStatus::Free, health)
            .await
        {
            Ok(0) => {
                let message = format!("released proxy '{address}' no longer exists in the pool");
                warn!(proxy = %address, "{message}");
                self.operator.report(message.as_str(), "release_proxy").await;
            }
            Ok(_) => {
                debug!(
                    proxy = %address,
                    exit_ip = health.and_then(|value| value.exit_ip.as_deref()),
                    "released proxy"
                );
            }
            Err(error) => {
                let message = format!("failed to release proxy '{address}': {error}");
                warn!(proxy = %address, error = %error, "failed to release proxy");
                self.operator.report(message.as_str(), "release_proxy").await;
            }
        }
    }
}
