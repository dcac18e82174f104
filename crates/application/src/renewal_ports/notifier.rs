use std::sync::Arc;

use async_trait::async_trait;
use sessionkeeper_core::AppResult;
use tracing::warn;

/// Port for operator-facing failure notifications.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    /// Delivers one message tagged with the originating context.
    async fn notify(&self, message: &str, context: &str) -> AppResult<()>;
}

/// Best-effort wrapper around an operator notifier.
///
/// Delivery failures are logged and swallowed so reporting never aborts the
/// caller.
#[derive(Clone)]
pub struct OperatorChannel {
    notifier: Arc<dyn OperatorNotifier>,
}

impl OperatorChannel {
    /// Creates a channel over one notifier.
    #[must_use]
    pub fn new(notifier: Arc<dyn OperatorNotifier>) -> Self {
        Self { notifier }
    }

    /// Reports one message, ignoring delivery failures.
    pub async fn report(&self, message: &str, context: &str) {
        if let Err(error) = self.notifier.notify(message, context).await {
            warn!(
                context = context,
                error = %error,
                "failed to deliver operator notification"
            );
        }
    }
}
