use async_trait::async_trait;
use sessionkeeper_application::OperatorNotifier;
use sessionkeeper_core::{AppError, AppResult, NonEmptyString};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Operator notifier posting to one Telegram chat through the Bot API.
pub struct TelegramOperatorNotifier {
    http_client: reqwest::Client,
    bot_token: NonEmptyString,
    chat_id: NonEmptyString,
}

impl TelegramOperatorNotifier {
    /// Creates a notifier for one bot and chat.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        bot_token: NonEmptyString,
        chat_id: NonEmptyString,
    ) -> Self {
        Self {
            http_client,
            bot_token,
            chat_id,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", self.bot_token.as_str())
    }
}

fn format_message(message: &str, context: &str) -> String {
    format!("[{context}] {message}")
}

#[async_trait]
impl OperatorNotifier for TelegramOperatorNotifier {
    async fn notify(&self, message: &str, context: &str) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.send_message_url())
            .json(&serde_json::json!({
                "chat_id": self.chat_id.as_str(),
                "text": format_message(message, context),
            }))
            .send()
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("telegram notification transport error: {error}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        Err(AppError::Unavailable(format!(
            "telegram notification failed with status {status}: {body}"
        )))
    }
}
