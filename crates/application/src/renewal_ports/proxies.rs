use async_trait::async_trait;
use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{Proxy, ProxyAddress, ProxyHealth, ProxyStatus};

/// Repository port for the leasable proxy pool.
#[async_trait]
pub trait ProxyPoolRepository: Send + Sync {
    /// Returns any proxy currently marked free.
    async fn find_free_proxy(&self) -> AppResult<Option<Proxy>>;

    /// Sets the proxy status when the current status matches `expected`.
    ///
    /// Health data, when given, replaces the stored last-known observation.
    /// Returns the number of matched proxies, which is 0 or 1.
    async fn compare_and_set_status(
        &self,
        address: &ProxyAddress,
        expected: Option<ProxyStatus>,
        status: ProxyStatus,
        health: Option<&ProxyHealth>,
    ) -> AppResult<u64>;
}

/// Port for the post-use reachability probe of one proxy.
#[async_trait]
pub trait ProxyHealthProbe: Send + Sync {
    /// Probes the proxy and reports the observed exit IP, if any.
    async fn probe(&self, address: &ProxyAddress) -> AppResult<ProxyHealth>;
}
