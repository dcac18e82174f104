use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sessionkeeper_application::ProxyHealthProbe;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{ProxyAddress, ProxyHealth};
use tracing::debug;

/// Probes a proxy by fetching an IP-echo endpoint through it.
pub struct HttpProxyHealthProbe {
    check_url: String,
    timeout: Duration,
}

impl HttpProxyHealthProbe {
    /// Creates a probe against an endpoint answering `{ "ip": "..." }`.
    #[must_use]
    pub fn new(check_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            check_url: check_url.into(),
            timeout,
        }
    }

    fn client_for(&self, address: &ProxyAddress) -> AppResult<reqwest::Client> {
        let proxy = reqwest::Proxy::all(address.endpoint_url())
            .map_err(|error| {
                AppError::Validation(format!("invalid proxy endpoint '{address}': {error}"))
            })?
            .basic_auth(address.username(), address.password());

        reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build probe client for '{address}': {error}"))
            })
    }
}

#[derive(Debug, Deserialize)]
struct IpEchoResponse {
    ip: String,
}

#[async_trait]
impl ProxyHealthProbe for HttpProxyHealthProbe {
    async fn probe(&self, address: &ProxyAddress) -> AppResult<ProxyHealth> {
        let client = self.client_for(address)?;

        let response = match client.get(self.check_url.as_str()).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(proxy = %address, status = %response.status(), "proxy probe rejected");
                return Ok(ProxyHealth::unreachable());
            }
            Err(error) => {
                debug!(proxy = %address, error = %error, "proxy probe failed");
                return Ok(ProxyHealth::unreachable());
            }
        };

        match response.json::<IpEchoResponse>().await {
            Ok(body) if !body.ip.trim().is_empty() => Ok(ProxyHealth::reachable(body.ip.trim())),
            Ok(_) => Ok(ProxyHealth::unreachable()),
            Err(error) => {
                debug!(proxy = %address, error = %error, "proxy probe returned invalid body");
                Ok(ProxyHealth::unreachable())
            }
        }
    }
}
