use super::INotifier;
use crate::config::WebhookSettings;
use nettu_reminders_domain::ReminderDelivery;
use reqwest::Client;
use std::time::Duration;
use tracing::error;

/// Posts every reminder as json to the configured webhook
pub struct WebhookNotifier {
    client: Client,
    settings: WebhookSettings,
}

impl WebhookNotifier {
    pub fn new(settings: WebhookSettings, timeout_millis: i64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_millis.max(0) as u64))
            .build()
            .unwrap_or_else(|e| {
                error!("Unable to build webhook client, using the default one. Err: {:?}", e);
                Client::new()
            });
        Self { client, settings }
    }
}

#[async_trait::async_trait]
impl INotifier for WebhookNotifier {
    async fn send(&self, delivery: &ReminderDelivery) -> anyhow::Result<()> {
        self.client
            .post(&self.settings.url)
            .header("nettu-reminders-webhook-key", &self.settings.key)
            .json(delivery)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
