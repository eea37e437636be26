use super::{IScheduledNotificationRepo, RepoResult, ScheduledNotificationRepoError};
use crate::repos::shared::{
    inmemory_repo::*, query_structs::DueNotificationsQuery, repo::DeleteResult,
};
use nettu_reminders_domain::{NotificationSubject, ScheduledNotification, ID};
use std::sync::Mutex;

pub struct InMemoryScheduledNotificationRepo {
    notifications: Mutex<Vec<ScheduledNotification>>,
}

impl InMemoryScheduledNotificationRepo {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(vec![]),
        }
    }
}

fn belongs_to(n: &ScheduledNotification, subject: &NotificationSubject, owner_id: &ID) -> bool {
    n.subject == *subject && n.owner_id == *owner_id
}

#[async_trait::async_trait]
impl IScheduledNotificationRepo for InMemoryScheduledNotificationRepo {
    async fn create(&self, notification: &ScheduledNotification) -> RepoResult<()> {
        let mut notifications = self.notifications.lock().unwrap();
        if notifications
            .iter()
            .any(|n| !n.sent && n.same_slot(notification))
        {
            return Err(ScheduledNotificationRepoError::DuplicateConstraintViolation);
        }
        notifications.push(notification.clone());
        Ok(())
    }

    async fn delete_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<DeleteResult> {
        Ok(delete_by(&self.notifications, |n| {
            belongs_to(n, subject, owner_id)
        }))
    }

    async fn replace_pending_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
        notifications: &[ScheduledNotification],
    ) -> RepoResult<Vec<ScheduledNotification>> {
        // One lock for the whole replacement so that no reader sees it half done
        let mut stored = self.notifications.lock().unwrap();
        stored.retain(|n| n.sent || !belongs_to(n, subject, owner_id));

        let sent_kinds = stored
            .iter()
            .filter(|n| belongs_to(n, subject, owner_id))
            .map(|n| n.kind)
            .collect::<Vec<_>>();
        let replacements = notifications
            .iter()
            .filter(|n| !sent_kinds.contains(&n.kind))
            .cloned()
            .collect::<Vec<_>>();
        stored.extend(replacements.iter().cloned());

        Ok(replacements)
    }

    async fn find(&self, notification_id: &ID) -> RepoResult<Option<ScheduledNotification>> {
        Ok(find(notification_id, &self.notifications))
    }

    async fn find_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<Vec<ScheduledNotification>> {
        Ok(find_by(&self.notifications, |n| {
            belongs_to(n, subject, owner_id)
        }))
    }

    async fn find_due(
        &self,
        query: &DueNotificationsQuery,
    ) -> RepoResult<Vec<ScheduledNotification>> {
        let mut due = find_by(&self.notifications, |n| {
            n.is_due(query.now_ts, query.max_tries, query.stale_claim_before_ts)
        });
        due.sort_by_key(|n| n.scheduled_at_ts);
        due.truncate(query.limit);
        Ok(due)
    }

    async fn claim(
        &self,
        notification_id: &ID,
        now_ts: i64,
        max_tries: i64,
        stale_claim_before_ts: i64,
    ) -> RepoResult<ScheduledNotification> {
        find_and_update(notification_id, &self.notifications, |n| {
            n.claim(now_ts, max_tries, stale_claim_before_ts)
        })
        .ok_or(ScheduledNotificationRepoError::AlreadyClaimed)
    }

    async fn mark_sent(
        &self,
        notification_id: &ID,
        claimed_at_ts: i64,
        sent_at_ts: i64,
    ) -> RepoResult<()> {
        find_and_update(notification_id, &self.notifications, |n| {
            n.mark_sent(claimed_at_ts, sent_at_ts)
        });
        Ok(())
    }

    async fn mark_failed_attempt(
        &self,
        notification_id: &ID,
        claimed_at_ts: i64,
    ) -> RepoResult<()> {
        find_and_update(notification_id, &self.notifications, |n| {
            n.mark_failed_attempt(claimed_at_ts)
        });
        Ok(())
    }
}
