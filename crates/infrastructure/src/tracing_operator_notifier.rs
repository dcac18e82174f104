//! Operator notifier for development. Logs notifications to tracing output.

use async_trait::async_trait;
use sessionkeeper_application::OperatorNotifier;
use sessionkeeper_core::AppResult;
use tracing::warn;

/// Development notifier that logs operator messages.
#[derive(Clone, Default)]
pub struct TracingOperatorNotifier;

impl TracingOperatorNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OperatorNotifier for TracingOperatorNotifier {
    async fn notify(&self, message: &str, context: &str) -> AppResult<()> {
        warn!(context = context, "operator notification: {message}");
        Ok(())
    }
}
