use crate::shared::usecase::UseCase;
use futures::future::join_all;
use nettu_reminders_domain::{ReminderDelivery, ScheduledNotification};
use nettu_reminders_infra::{DueNotificationsQuery, NettuContext, ScheduledNotificationRepoError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, warn};

/// Delivers the `ScheduledNotification`s that are due.
///
/// Any number of dispatchers can run this at the same time against the same
/// store. Every due notification is claimed before it is delivered and only
/// the dispatcher that won the claim delivers it.
#[derive(Debug)]
pub struct DispatchScheduledNotificationsUseCase {}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

/// What happened to the due notifications of one dispatch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub sent: usize,
    /// Failed and will be tried again
    pub retried: usize,
    /// Failed for the last time
    pub abandoned: usize,
    /// Claimed by another dispatcher first
    pub skipped: usize,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.sent + self.retried + self.abandoned + self.skipped == 0
    }
}

async fn deliver(notification: &ScheduledNotification, ctx: &NettuContext) -> bool {
    let delivery = ReminderDelivery::from(notification);
    let max_duration = Duration::from_millis(ctx.config.delivery_timeout_millis.max(0) as u64);
    match timeout(max_duration, ctx.notifier.send(&delivery)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(
                "Delivery of reminder {} failed. Err: {:?}",
                notification.id, e
            );
            false
        }
        Err(_) => {
            warn!(
                "Delivery of reminder {} timed out after {} millis",
                notification.id, ctx.config.delivery_timeout_millis
            );
            false
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DispatchScheduledNotificationsUseCase {
    type Response = DispatchReport;

    type Error = UseCaseError;

    const NAME: &'static str = "DispatchScheduledNotifications";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        let repo = &ctx.repos.scheduled_notifications;
        let now = ctx.sys.get_timestamp_millis();
        let query = DueNotificationsQuery {
            now_ts: now,
            limit: ctx.config.dispatch_batch_size,
            max_tries: ctx.config.notification_max_tries,
            stale_claim_before_ts: now - ctx.config.claim_stale_after_millis,
        };

        let due = repo.find_due(&query).await.map_err(|e| {
            error!("Unable to find due reminders. Err: {:?}", e);
            UseCaseError::StorageError
        })?;

        let mut report = DispatchReport::default();
        let mut claimed = Vec::with_capacity(due.len());
        for notification in due {
            match repo
                .claim(
                    &notification.id,
                    now,
                    query.max_tries,
                    query.stale_claim_before_ts,
                )
                .await
            {
                Ok(notification) => claimed.push(notification),
                Err(ScheduledNotificationRepoError::AlreadyClaimed) => report.skipped += 1,
                Err(e) => {
                    error!(
                        "Unable to claim reminder {}. Err: {:?}",
                        notification.id, e
                    );
                    report.skipped += 1;
                }
            }
        }

        let outcomes = join_all(claimed.iter().map(|n| deliver(n, ctx))).await;

        for (notification, delivered) in claimed.iter().zip(outcomes) {
            // Fences the transition to the claim taken above
            let claimed_at = notification.claimed_at_ts.unwrap_or(now);
            if delivered {
                let sent_at = ctx.sys.get_timestamp_millis();
                if let Err(e) = repo.mark_sent(&notification.id, claimed_at, sent_at).await {
                    error!(
                        "Reminder {} was delivered but could not be marked as sent. Err: {:?}",
                        notification.id, e
                    );
                }
                report.sent += 1;
            } else {
                if let Err(e) = repo.mark_failed_attempt(&notification.id, claimed_at).await {
                    error!(
                        "Unable to record failed delivery of reminder {}. Err: {:?}",
                        notification.id, e
                    );
                }
                if notification.tries + 1 >= query.max_tries {
                    warn!(
                        "Giving up on reminder {} after {} tries",
                        notification.id,
                        notification.tries + 1
                    );
                    report.abandoned += 1;
                } else {
                    report.retried += 1;
                }
            }
        }

        Ok(report)
    }
}
