use async_trait::async_trait;
use sessionkeeper_core::AppResult;
use sessionkeeper_domain::{ProxyAddress, RenewalOutcome};

/// Port for the external session renewal interaction.
///
/// Calls can take minutes and are not idempotent: a retry after a failure
/// may repeat side effects on the account.
#[async_trait]
pub trait SessionRenewalExecutor: Send + Sync {
    /// Renews the session of the account behind `identity` through `proxy`.
    ///
    /// An `Err` means the executor could not be driven or answered with an
    /// unexpected shape; reported failures come back as an outcome.
    async fn renew(&self, identity: &str, proxy: &ProxyAddress) -> AppResult<RenewalOutcome>;
}
