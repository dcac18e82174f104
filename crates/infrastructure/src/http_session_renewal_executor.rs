use async_trait::async_trait;
use serde::Deserialize;
use sessionkeeper_application::SessionRenewalExecutor;
use sessionkeeper_core::{AppError, AppResult};
use sessionkeeper_domain::{ProxyAddress, RenewalOutcome};

/// HTTP client for the browser-automation service that performs renewals.
///
/// Sends `{ identity, proxy }` and expects `{ outcome, reason? }` where
/// `outcome` is one of the renewal markers.
pub struct HttpSessionRenewalExecutor {
    http_client: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl HttpSessionRenewalExecutor {
    /// Creates a new executor client.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            secret: secret.filter(|value| !value.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RenewalResponse {
    outcome: String,
    #[serde(default)]
    reason: Option<String>,
}

fn outcome_from_response(response: RenewalResponse) -> AppResult<RenewalOutcome> {
    RenewalOutcome::from_marker(response.outcome.as_str(), response.reason).ok_or_else(|| {
        AppError::Internal(format!(
            "renewal executor returned unknown outcome '{}'",
            response.outcome
        ))
    })
}

#[async_trait]
impl SessionRenewalExecutor for HttpSessionRenewalExecutor {
    async fn renew(&self, identity: &str, proxy: &ProxyAddress) -> AppResult<RenewalOutcome> {
        let mut request = self
            .http_client
            .post(self.endpoint.as_str())
            .json(&serde_json::json!({
                "identity": identity,
                "proxy": proxy.as_str(),
            }));
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Unavailable(format!("renewal executor transport error: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Unavailable(format!(
                "renewal executor failed with status {status}: {body}"
            )));
        }

        let body = response.json::<RenewalResponse>().await.map_err(|error| {
            AppError::Internal(format!("renewal executor returned invalid body: {error}"))
        })?;

        outcome_from_response(body)
    }
}
