use std::collections::BTreeMap;

use async_trait::async_trait;
use sessionkeeper_application::ProxyPoolRepository;
use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{Proxy, ProxyAddress, ProxyHealth, ProxyStatus};
use tokio::sync::RwLock;

/// In-memory proxy pool for development runs and tests.
#[derive(Default)]
pub struct InMemoryProxyPoolRepository {
    proxies: RwLock<BTreeMap<String, Proxy>>,
}

impl InMemoryProxyPoolRepository {
    /// Creates a pool with every given address free.
    #[must_use]
    pub fn with_addresses(addresses: impl IntoIterator<Item = ProxyAddress>) -> Self {
        let proxies = addresses
            .into_iter()
            .map(|address| (address.as_str().to_owned(), Proxy::free(address)))
            .collect();

        Self {
            proxies: RwLock::new(proxies),
        }
    }

    /// Returns a copy of every proxy in address order.
    pub async fn list(&self) -> Vec<Proxy> {
        self.proxies.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ProxyPoolRepository for InMemoryProxyPoolRepository {
    async fn find_free_proxy(&self) -> AppResult<Option<Proxy>> {
        Ok(self
            .proxies
            .read()
            .await
            .values()
            .find(|proxy| proxy.status == ProxyStatus::Free)
            .cloned())
    }

    async fn compare_and_set_status(
        &self,
        address: &ProxyAddress,
        expected: Option<ProxyStatus>,
        status: ProxyStatus,
        health: Option<&ProxyHealth>,
    ) -> AppResult<u64> {
        let mut proxies = self.proxies.write().await;
        let Some(proxy) = proxies.get_mut(address.as_str()) else {
            return Ok(0);
        };

        if expected.is_some_and(|expected| proxy.status != expected) {
            return Ok(0);
        }

        proxy.status = status;
        if let Some(health) = health {
            if health.exit_ip.is_some() {
                proxy.last_used_ip = health.exit_ip.clone();
            }
            proxy.last_checked_at = Some(health.observed_at);
        }

        Ok(1)
    }
}
