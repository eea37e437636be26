use super::{IScheduledNotificationRepo, RepoResult, ScheduledNotificationRepoError};
use crate::repos::shared::{query_structs::DueNotificationsQuery, repo::DeleteResult};
use nettu_reminders_domain::{NotificationSubject, ReminderKind, ScheduledNotification, ID};
use sqlx::{types::Uuid, FromRow, PgPool, Postgres, Transaction};
use std::convert::TryFrom;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresScheduledNotificationRepo {
    pool: PgPool,
}

impl PostgresScheduledNotificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for ScheduledNotificationRepoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Self::DuplicateConstraintViolation
            }
            _ => Self::Storage(anyhow::Error::new(e)),
        }
    }
}

#[derive(Debug, FromRow)]
struct ScheduledNotificationRaw {
    notification_uid: Uuid,
    owner_uid: Uuid,
    kind: String,
    subject_type: String,
    subject_id: Uuid,
    scheduled_at: i64,
    processing: bool,
    claimed_at: Option<i64>,
    sent: bool,
    sent_at: Option<i64>,
    tries: i64,
    created: i64,
}

impl TryFrom<ScheduledNotificationRaw> for ScheduledNotification {
    type Error = anyhow::Error;

    fn try_from(raw: ScheduledNotificationRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.notification_uid.into(),
            owner_id: raw.owner_uid.into(),
            kind: raw.kind.parse::<ReminderKind>()?,
            subject: NotificationSubject::from_parts(&raw.subject_type, raw.subject_id.into())?,
            scheduled_at_ts: raw.scheduled_at,
            processing: raw.processing,
            claimed_at_ts: raw.claimed_at,
            sent: raw.sent,
            sent_at_ts: raw.sent_at,
            tries: raw.tries,
            created_ts: raw.created,
        })
    }
}

fn into_domain(raws: Vec<ScheduledNotificationRaw>) -> RepoResult<Vec<ScheduledNotification>> {
    raws.into_iter()
        .map(|raw| ScheduledNotification::try_from(raw).map_err(ScheduledNotificationRepoError::from))
        .collect()
}

async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    n: &ScheduledNotification,
) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO scheduled_notifications
        (notification_uid, owner_uid, kind, subject_type, subject_id, scheduled_at, processing, claimed_at, sent, sent_at, tries, created)
        VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(n.id.inner())
    .bind(n.owner_id.inner())
    .bind(n.kind.as_str())
    .bind(n.subject.subject_type())
    .bind(n.subject.subject_id().inner())
    .bind(n.scheduled_at_ts)
    .bind(n.processing)
    .bind(n.claimed_at_ts)
    .bind(n.sent)
    .bind(n.sent_at_ts)
    .bind(n.tries)
    .bind(n.created_ts)
    .execute(&mut *tx)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl IScheduledNotificationRepo for PostgresScheduledNotificationRepo {
    async fn create(&self, notification: &ScheduledNotification) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        insert(&mut tx, notification).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<DeleteResult> {
        let res = sqlx::query(
            r#"
            DELETE FROM scheduled_notifications
            WHERE subject_type = $1 AND subject_id = $2 AND owner_uid = $3
            "#,
        )
        .bind(subject.subject_type())
        .bind(subject.subject_id().inner())
        .bind(owner_id.inner())
        .execute(&self.pool)
        .await?;

        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }

    async fn replace_pending_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
        notifications: &[ScheduledNotification],
    ) -> RepoResult<Vec<ScheduledNotification>> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent replacements of the same subject
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!(
                "{}:{}:{}",
                subject.subject_type(),
                subject.subject_id(),
                owner_id
            ))
            .execute(&mut tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM scheduled_notifications
            WHERE subject_type = $1 AND subject_id = $2 AND owner_uid = $3 AND NOT sent
            "#,
        )
        .bind(subject.subject_type())
        .bind(subject.subject_id().inner())
        .bind(owner_id.inner())
        .execute(&mut tx)
        .await?;

        let sent_kinds: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT kind FROM scheduled_notifications
            WHERE subject_type = $1 AND subject_id = $2 AND owner_uid = $3 AND sent
            "#,
        )
        .bind(subject.subject_type())
        .bind(subject.subject_id().inner())
        .bind(owner_id.inner())
        .fetch_all(&mut tx)
        .await?;

        let replacements = notifications
            .iter()
            .filter(|n| !sent_kinds.iter().any(|(kind,)| kind == n.kind.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        for n in &replacements {
            insert(&mut tx, n).await?;
        }

        tx.commit().await?;
        Ok(replacements)
    }

    async fn find(&self, notification_id: &ID) -> RepoResult<Option<ScheduledNotification>> {
        let raw = sqlx::query_as::<_, ScheduledNotificationRaw>(
            r#"
            SELECT * FROM scheduled_notifications
            WHERE notification_uid = $1
            "#,
        )
        .bind(notification_id.inner())
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => Ok(Some(ScheduledNotification::try_from(raw)?)),
            None => Ok(None),
        }
    }

    async fn find_by_subject(
        &self,
        subject: &NotificationSubject,
        owner_id: &ID,
    ) -> RepoResult<Vec<ScheduledNotification>> {
        let raws = sqlx::query_as::<_, ScheduledNotificationRaw>(
            r#"
            SELECT * FROM scheduled_notifications
            WHERE subject_type = $1 AND subject_id = $2 AND owner_uid = $3
            ORDER BY scheduled_at
            "#,
        )
        .bind(subject.subject_type())
        .bind(subject.subject_id().inner())
        .bind(owner_id.inner())
        .fetch_all(&self.pool)
        .await?;

        into_domain(raws)
    }

    async fn find_due(
        &self,
        query: &DueNotificationsQuery,
    ) -> RepoResult<Vec<ScheduledNotification>> {
        let raws = sqlx::query_as::<_, ScheduledNotificationRaw>(
            r#"
            SELECT * FROM scheduled_notifications
            WHERE NOT sent
            AND tries < $2
            AND scheduled_at <= $1
            AND (NOT processing OR claimed_at IS NULL OR claimed_at <= $3)
            ORDER BY scheduled_at
            LIMIT $4
            "#,
        )
        .bind(query.now_ts)
        .bind(query.max_tries)
        .bind(query.stale_claim_before_ts)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        into_domain(raws)
    }

    async fn claim(
        &self,
        notification_id: &ID,
        now_ts: i64,
        max_tries: i64,
        stale_claim_before_ts: i64,
    ) -> RepoResult<ScheduledNotification> {
        let raw = sqlx::query_as::<_, ScheduledNotificationRaw>(
            r#"
            UPDATE scheduled_notifications
            SET processing = TRUE,
            claimed_at = $2
            WHERE notification_uid = $1
            AND NOT sent
            AND tries < $4
            AND (NOT processing OR claimed_at IS NULL OR claimed_at <= $3)
            RETURNING *
            "#,
        )
        .bind(notification_id.inner())
        .bind(now_ts)
        .bind(stale_claim_before_ts)
        .bind(max_tries)
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => Ok(ScheduledNotification::try_from(raw)?),
            None => Err(ScheduledNotificationRepoError::AlreadyClaimed),
        }
    }

    async fn mark_sent(
        &self,
        notification_id: &ID,
        claimed_at_ts: i64,
        sent_at_ts: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET sent = TRUE,
            processing = FALSE,
            claimed_at = NULL,
            sent_at = GREATEST($2, scheduled_at)
            WHERE notification_uid = $1 AND processing AND NOT sent AND claimed_at = $3
            "#,
        )
        .bind(notification_id.inner())
        .bind(sent_at_ts)
        .bind(claimed_at_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed_attempt(
        &self,
        notification_id: &ID,
        claimed_at_ts: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET processing = FALSE,
            claimed_at = NULL,
            tries = tries + 1
            WHERE notification_uid = $1 AND processing AND NOT sent AND claimed_at = $2
            "#,
        )
        .bind(notification_id.inner())
        .bind(claimed_at_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
