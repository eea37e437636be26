mod webhook;

use nettu_reminders_domain::{format_datetime, ReminderDelivery};
use tracing::info;

pub use webhook::WebhookNotifier;

/// Delivers a claimed reminder to its recipient.
///
/// An `Err` means the attempt failed and the reminder will be retried
/// until its tries are used up.
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    async fn send(&self, delivery: &ReminderDelivery) -> anyhow::Result<()>;
}

/// Used when no webhook is configured. Every delivery succeeds.
pub struct LogNotifier {}

#[async_trait::async_trait]
impl INotifier for LogNotifier {
    async fn send(&self, delivery: &ReminderDelivery) -> anyhow::Result<()> {
        info!(
            "Reminder {} for {:?} of user {} scheduled at {}",
            delivery.kind,
            delivery.subject,
            delivery.owner_id,
            format_datetime(delivery.scheduled_at, &chrono_tz::UTC)
        );
        Ok(())
    }
}
