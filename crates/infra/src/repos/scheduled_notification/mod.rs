mod inmemory;
mod postgres;

use crate::repos::shared::{query_structs::DueNotificationsQuery, repo::DeleteResult};
pub use inmemory::InMemoryScheduledNotificationRepo;
use nettu_reminders_domain::{NotificationSubject, ScheduledNotification, ID};
pub use postgres::PostgresScheduledNotificationRepo;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduledNotificationRepoError {
    #[error("A pending notification of the same kind already exists for the subject and owner")]
    DuplicateConstraintViolation,
    #[error("The notification is already claimed")]
    AlreadyClaimed,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, ScheduledNotificationRepoError>;

/// Durable queue of `ScheduledNotification`s.
///
/// `claim` is the only concurrency control: it is a single compare-and-set, so
/// of any number of dispatchers claiming the same notification exactly one wins.
/// `mark_sent` and `mark_failed_attempt` only act on the claim taken at
/// `claimed_at_ts`. They are no-ops for notifications that have been deleted,
/// or whose claim has been taken over, in the meantime.
#[async_trait::async_trait]
pub trait IScheduledNotificationRepo: Send + Sync {
    /// Fails with `DuplicateConstraintViolation` if a pending notification already
    /// exists in the same slot (subject, owner and kind)
    async fn create(&self, notification: &ScheduledNotification) -> RepoResult<()>;
    /// Removes every notification of the subject and owner, regardless of state
    async fn delete_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<DeleteResult>;
    /// Atomically removes every unsent notification of the subject and owner and
    /// stores `notifications` instead. Kinds that have already been sent are kept
    /// and not stored again. Returns the stored notifications.
    async fn replace_pending_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
        notifications: &[ScheduledNotification],
    ) -> RepoResult<Vec<ScheduledNotification>>;
    async fn find(&self, notification_id: &ID) -> RepoResult<Option<ScheduledNotification>>;
    async fn find_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<Vec<ScheduledNotification>>;
    /// Claimable notifications, earliest `scheduled_at_ts` first
    async fn find_due(&self, query: &DueNotificationsQuery)
        -> RepoResult<Vec<ScheduledNotification>>;
    /// Fails with `AlreadyClaimed` if another dispatcher holds a live claim, the
    /// notification is sent or abandoned, or it no longer exists
    async fn claim(
        &self,
        notification_id: &ID,
        now_ts: i64,
        max_tries: i64,
        stale_claim_before_ts: i64,
    ) -> RepoResult<ScheduledNotification>;
    async fn mark_sent(
        &self,
        notification_id: &ID,
        claimed_at_ts: i64,
        sent_at_ts: i64,
    ) -> RepoResult<()>;
    async fn mark_failed_attempt(&self, notification_id: &ID, claimed_at_ts: i64)
        -> RepoResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_context;
    use nettu_reminders_domain::{Booking, ReminderKind, User};

    const NOW: i64 = 1_613_862_000_000;
    const MAX_TRIES: i64 = 3;

    fn due_query(now_ts: i64) -> DueNotificationsQuery {
        DueNotificationsQuery {
            now_ts,
            limit: 100,
            max_tries: MAX_TRIES,
            stale_claim_before_ts: now_ts - 1000 * 60,
        }
    }

    struct TestContext {
        repo: std::sync::Arc<dyn IScheduledNotificationRepo>,
        user: User,
        booking: Booking,
    }

    async fn setup() -> TestContext {
        let ctx = setup_context().await;
        let user = User::new("UTC");
        ctx.repos.users.insert(&user).await.unwrap();
        let booking = Booking::new(user.id, NOW + 1000, NOW + 2000, NOW);
        TestContext {
            repo: ctx.repos.scheduled_notifications.clone(),
            user,
            booking,
        }
    }

    /// The store may be shared with other tests, so only look at what this test created
    async fn find_own_due(ctx: &TestContext, query: &DueNotificationsQuery) -> Vec<ScheduledNotification> {
        ctx.repo
            .find_due(query)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.subject == ctx.booking.subject())
            .collect()
    }

    fn notification(ctx: &TestContext, kind: ReminderKind, scheduled_at_ts: i64) -> ScheduledNotification {
        ScheduledNotification::new(ctx.user.id, ctx.booking.subject(), kind, scheduled_at_ts, NOW)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_pending_kind() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();

        let duplicate = notification(&ctx, ReminderKind::Started, NOW + 10);
        assert!(matches!(
            ctx.repo.create(&duplicate).await,
            Err(ScheduledNotificationRepoError::DuplicateConstraintViolation)
        ));

        let other_kind = notification(&ctx, ReminderKind::OneHourBefore, NOW);
        ctx.repo.create(&other_kind).await.unwrap();

        // Once sent the slot is free again
        ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_sent(&n.id, NOW, NOW).await.unwrap();
        ctx.repo.create(&duplicate).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_subject_removes_all_states() {
        let ctx = setup().await;
        let sent = notification(&ctx, ReminderKind::TwoHoursBefore, NOW);
        let claimed = notification(&ctx, ReminderKind::OneHourBefore, NOW);
        let pending = notification(&ctx, ReminderKind::Started, NOW + 1000);
        for n in &[&sent, &claimed, &pending] {
            ctx.repo.create(n).await.unwrap();
        }
        ctx.repo.claim(&sent.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_sent(&sent.id, NOW, NOW).await.unwrap();
        ctx.repo.claim(&claimed.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();

        let other_booking = Booking::new(ctx.user.id, NOW, NOW + 1, NOW);
        let other = ScheduledNotification::new(
            ctx.user.id,
            other_booking.subject(),
            ReminderKind::Started,
            NOW,
            NOW,
        );
        ctx.repo.create(&other).await.unwrap();

        let res = ctx
            .repo
            .delete_by_subject(&ctx.booking.subject(), &ctx.user.id)
            .await
            .unwrap();
        assert_eq!(res.deleted_count, 3);
        assert!(ctx
            .repo
            .find_by_subject(&ctx.booking.subject(), &ctx.user.id)
            .await
            .unwrap()
            .is_empty());
        assert!(ctx.repo.find(&other.id).await.unwrap().is_some());

        // Finishing a deleted in flight notification is not an error
        assert!(ctx.repo.mark_sent(&claimed.id, NOW, NOW).await.is_ok());
        assert!(ctx.repo.mark_failed_attempt(&claimed.id, NOW).await.is_ok());
        assert!(ctx.repo.find(&claimed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_pending_keeps_sent_kinds() {
        let ctx = setup().await;
        let sent = notification(&ctx, ReminderKind::TwoHoursBefore, NOW);
        let pending = notification(&ctx, ReminderKind::Started, NOW + 1000);
        ctx.repo.create(&sent).await.unwrap();
        ctx.repo.create(&pending).await.unwrap();
        ctx.repo.claim(&sent.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_sent(&sent.id, NOW, NOW).await.unwrap();

        let replacements = vec![
            notification(&ctx, ReminderKind::TwoHoursBefore, NOW + 5000),
            notification(&ctx, ReminderKind::Started, NOW + 9000),
        ];
        let stored = ctx
            .repo
            .replace_pending_by_subject(&ctx.booking.subject(), &ctx.user.id, &replacements)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, ReminderKind::Started);
        assert_eq!(stored[0].scheduled_at_ts, NOW + 9000);

        let mut all = ctx
            .repo
            .find_by_subject(&ctx.booking.subject(), &ctx.user.id)
            .await
            .unwrap();
        all.sort_by_key(|n| n.scheduled_at_ts);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, sent.id);
        assert!(all[0].sent);
        assert_eq!(all[1].id, replacements[1].id);
    }

    #[tokio::test]
    async fn test_find_due_orders_and_limits() {
        let ctx = setup().await;
        let late = notification(&ctx, ReminderKind::Started, NOW);
        let early = notification(&ctx, ReminderKind::TwoHoursBefore, NOW - 2000);
        let middle = notification(&ctx, ReminderKind::OneHourBefore, NOW - 1000);
        let future = notification(&ctx, ReminderKind::FiveMinutesBefore, NOW + 1);
        for n in &[&late, &early, &middle, &future] {
            ctx.repo.create(n).await.unwrap();
        }

        let due = find_own_due(&ctx, &due_query(NOW)).await;
        let ids = due.iter().map(|n| n.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);

        let mut query = due_query(NOW);
        query.limit = 2;
        let due = ctx.repo.find_due(&query).await.unwrap();
        assert_eq!(due.len(), 2);
        assert!(due[0].scheduled_at_ts <= due[1].scheduled_at_ts);
    }

    #[tokio::test]
    async fn test_find_due_skips_claimed_sent_and_abandoned() {
        let ctx = setup().await;
        let claimed = notification(&ctx, ReminderKind::TwoHoursBefore, NOW);
        let sent = notification(&ctx, ReminderKind::OneHourBefore, NOW);
        let abandoned = notification(&ctx, ReminderKind::Started, NOW);
        for n in &[&claimed, &sent, &abandoned] {
            ctx.repo.create(n).await.unwrap();
        }
        ctx.repo.claim(&claimed.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.claim(&sent.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_sent(&sent.id, NOW, NOW).await.unwrap();
        for _ in 0..MAX_TRIES {
            ctx.repo.claim(&abandoned.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
            ctx.repo.mark_failed_attempt(&abandoned.id, NOW).await.unwrap();
        }

        assert!(find_own_due(&ctx, &due_query(NOW)).await.is_empty());

        let abandoned = ctx.repo.find(&abandoned.id).await.unwrap().unwrap();
        assert_eq!(abandoned.tries, MAX_TRIES);
        assert!(!abandoned.sent);
        assert!(!abandoned.processing);
    }

    #[tokio::test]
    async fn test_stale_claims_become_due_again() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();
        ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();

        let query = due_query(NOW + 1000);
        assert!(find_own_due(&ctx, &query).await.is_empty());
        assert!(matches!(
            ctx.repo.claim(&n.id, NOW + 1000, MAX_TRIES, query.stale_claim_before_ts).await,
            Err(ScheduledNotificationRepoError::AlreadyClaimed)
        ));

        // Past the grace period the claim is taken over
        let later = NOW + 1000 * 60 * 10;
        let query = due_query(later);
        let due = find_own_due(&ctx, &query).await;
        assert_eq!(due.len(), 1);
        let reclaimed = ctx
            .repo
            .claim(&n.id, later, MAX_TRIES, query.stale_claim_before_ts)
            .await
            .unwrap();
        assert_eq!(reclaimed.claimed_at_ts, Some(later));
    }

    #[tokio::test]
    async fn test_abandoned_notification_cannot_be_claimed() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();
        for _ in 0..MAX_TRIES - 1 {
            ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
            ctx.repo.mark_failed_attempt(&n.id, NOW).await.unwrap();
        }

        // A second dispatcher lists the notification as due before the last attempt
        let listed = find_own_due(&ctx, &due_query(NOW)).await;
        assert_eq!(listed.len(), 1);

        ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_failed_attempt(&n.id, NOW).await.unwrap();

        assert!(matches!(
            ctx.repo.claim(&listed[0].id, NOW + 1, MAX_TRIES, NOW - 1).await,
            Err(ScheduledNotificationRepoError::AlreadyClaimed)
        ));
        let abandoned = ctx.repo.find(&n.id).await.unwrap().unwrap();
        assert_eq!(abandoned.tries, MAX_TRIES);
        assert!(!abandoned.processing);
        assert!(!abandoned.sent);
    }

    #[tokio::test]
    async fn test_superseded_claim_holder_cannot_release_the_takeover() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();
        let first = ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();

        let later = NOW + 1000 * 60 * 10;
        let query = due_query(later);
        let second = ctx
            .repo
            .claim(&n.id, later, MAX_TRIES, query.stale_claim_before_ts)
            .await
            .unwrap();

        // The slow first holder reports back after the takeover
        let first_claimed_at = first.claimed_at_ts.unwrap();
        ctx.repo
            .mark_failed_attempt(&n.id, first_claimed_at)
            .await
            .unwrap();
        ctx.repo
            .mark_sent(&n.id, first_claimed_at, later)
            .await
            .unwrap();
        let held = ctx.repo.find(&n.id).await.unwrap().unwrap();
        assert!(held.processing);
        assert!(!held.sent);
        assert_eq!(held.tries, 0);
        assert_eq!(held.claimed_at_ts, Some(later));

        assert!(matches!(
            ctx.repo
                .claim(&n.id, later + 1, MAX_TRIES, query.stale_claim_before_ts)
                .await,
            Err(ScheduledNotificationRepoError::AlreadyClaimed)
        ));

        ctx.repo
            .mark_sent(&n.id, second.claimed_at_ts.unwrap(), later + 2)
            .await
            .unwrap();
        let sent = ctx.repo.find(&n.id).await.unwrap().unwrap();
        assert!(sent.sent);
        assert_eq!(sent.sent_at_ts, Some(later + 2));
    }

    #[tokio::test]
    async fn test_claim_unknown_notification() {
        let ctx = setup().await;
        assert!(matches!(
            ctx.repo.claim(&ID::new(), NOW, MAX_TRIES, NOW - 1).await,
            Err(ScheduledNotificationRepoError::AlreadyClaimed)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_only_one_concurrent_claim_wins() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();

        let handles = (0..16)
            .map(|_| {
                let repo = ctx.repo.clone();
                let id = n.id;
                tokio::spawn(async move { repo.claim(&id, NOW, MAX_TRIES, NOW - 1).await.is_ok() })
            })
            .collect::<Vec<_>>();
        let winners = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|res| *res.as_ref().expect("Claim task to finish"))
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_mark_sent_and_failed_attempt_transitions() {
        let ctx = setup().await;
        let n = notification(&ctx, ReminderKind::Started, NOW);
        ctx.repo.create(&n).await.unwrap();

        // Nothing happens to unclaimed notifications
        ctx.repo.mark_failed_attempt(&n.id, NOW).await.unwrap();
        assert_eq!(ctx.repo.find(&n.id).await.unwrap().unwrap().tries, 0);

        ctx.repo.claim(&n.id, NOW, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_failed_attempt(&n.id, NOW).await.unwrap();
        let failed = ctx.repo.find(&n.id).await.unwrap().unwrap();
        assert_eq!(failed.tries, 1);
        assert!(!failed.processing);
        assert_eq!(failed.scheduled_at_ts, NOW);

        ctx.repo.claim(&n.id, NOW + 10, MAX_TRIES, NOW - 1).await.unwrap();
        ctx.repo.mark_sent(&n.id, NOW + 10, NOW + 20).await.unwrap();
        let sent = ctx.repo.find(&n.id).await.unwrap().unwrap();
        assert!(sent.sent);
        assert!(!sent.processing);
        assert_eq!(sent.tries, 1);
        assert_eq!(sent.sent_at_ts, Some(NOW + 20));
    }
}
