use crate::{
    reminder::ReminderKind,
    shared::entity::{Entity, ID},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a `ScheduledNotification` is about. The reference is weak: the
/// subject's lifecycle is owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum NotificationSubject {
    Booking(ID),
}

#[derive(Error, Debug)]
pub enum InvalidSubjectError {
    #[error("Subject type: {0} is not known")]
    UnknownType(String),
}

impl NotificationSubject {
    pub fn subject_type(&self) -> &'static str {
        match self {
            Self::Booking(_) => "booking",
        }
    }

    pub fn subject_id(&self) -> &ID {
        match self {
            Self::Booking(id) => id,
        }
    }

    pub fn from_parts(subject_type: &str, subject_id: ID) -> Result<Self, InvalidSubjectError> {
        match subject_type {
            "booking" => Ok(Self::Booking(subject_id)),
            _ => Err(InvalidSubjectError::UnknownType(subject_type.to_string())),
        }
    }
}

/// The state a `ScheduledNotification` is in from the point of view of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Pending,
    Claimed,
    Sent,
    /// Delivery failed too many times and the notification will never be retried
    Abandoned,
}

/// A reminder waiting to be delivered, or already delivered, to `owner_id`
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNotification {
    pub id: ID,
    pub owner_id: ID,
    pub kind: ReminderKind,
    pub subject: NotificationSubject,
    /// The notification is not due before this timestamp
    pub scheduled_at_ts: i64,
    /// Set while a dispatcher holds the notification
    pub processing: bool,
    /// When the current claim was taken. Claims older than the grace period
    /// are treated as left behind by a crashed dispatcher.
    pub claimed_at_ts: Option<i64>,
    pub sent: bool,
    pub sent_at_ts: Option<i64>,
    /// Number of failed delivery attempts
    pub tries: i64,
    pub created_ts: i64,
}

impl ScheduledNotification {
    pub fn new(
        owner_id: ID,
        subject: NotificationSubject,
        kind: ReminderKind,
        scheduled_at_ts: i64,
        now_ts: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            owner_id,
            kind,
            subject,
            scheduled_at_ts,
            processing: false,
            claimed_at_ts: None,
            sent: false,
            sent_at_ts: None,
            tries: 0,
            created_ts: now_ts,
        }
    }

    pub fn state(&self, max_tries: i64) -> NotificationState {
        if self.sent {
            NotificationState::Sent
        } else if self.processing {
            NotificationState::Claimed
        } else if self.tries >= max_tries {
            NotificationState::Abandoned
        } else {
            NotificationState::Pending
        }
    }

    fn has_stale_claim(&self, stale_claim_before_ts: i64) -> bool {
        self.processing
            && self
                .claimed_at_ts
                .map(|claimed_at| claimed_at <= stale_claim_before_ts)
                .unwrap_or(true)
    }

    /// Whether a dispatcher is allowed to claim the notification right now
    pub fn is_due(&self, now_ts: i64, max_tries: i64, stale_claim_before_ts: i64) -> bool {
        !self.sent
            && self.tries < max_tries
            && self.scheduled_at_ts <= now_ts
            && (!self.processing || self.has_stale_claim(stale_claim_before_ts))
    }

    /// Takes the claim if nobody else holds a live one and the notification
    /// is neither sent nor abandoned
    pub fn claim(&mut self, now_ts: i64, max_tries: i64, stale_claim_before_ts: i64) -> bool {
        if self.sent
            || self.tries >= max_tries
            || (self.processing && !self.has_stale_claim(stale_claim_before_ts))
        {
            return false;
        }
        self.processing = true;
        self.claimed_at_ts = Some(now_ts);
        true
    }

    /// Whether the claim taken at `claimed_at_ts` is still the one held
    fn holds_claim(&self, claimed_at_ts: i64) -> bool {
        !self.sent && self.processing && self.claimed_at_ts == Some(claimed_at_ts)
    }

    /// Only the current claim holder can complete. Returns false when there is nothing to do.
    pub fn mark_sent(&mut self, claimed_at_ts: i64, sent_at_ts: i64) -> bool {
        if !self.holds_claim(claimed_at_ts) {
            return false;
        }
        self.sent = true;
        self.processing = false;
        self.claimed_at_ts = None;
        self.sent_at_ts = Some(std::cmp::max(sent_at_ts, self.scheduled_at_ts));
        true
    }

    /// Releases the claim and counts the failed attempt. Returns false when
    /// there is nothing to do or the claim has been taken over.
    pub fn mark_failed_attempt(&mut self, claimed_at_ts: i64) -> bool {
        if !self.holds_claim(claimed_at_ts) {
            return false;
        }
        self.processing = false;
        self.claimed_at_ts = None;
        self.tries += 1;
        true
    }

    /// Whether both notifications remind the same owner about the same subject with the same kind
    pub fn same_slot(&self, other: &Self) -> bool {
        self.subject == other.subject && self.owner_id == other.owner_id && self.kind == other.kind
    }
}

impl Entity for ScheduledNotification {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// What the delivery capability gets to know about a due `ScheduledNotification`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDelivery {
    pub notification_id: ID,
    pub kind: ReminderKind,
    pub subject: NotificationSubject,
    pub owner_id: ID,
    pub scheduled_at: i64,
}

impl From<&ScheduledNotification> for ReminderDelivery {
    fn from(n: &ScheduledNotification) -> Self {
        Self {
            notification_id: n.id,
            kind: n.kind,
            subject: n.subject,
            owner_id: n.owner_id,
            scheduled_at: n.scheduled_at_ts,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MAX_TRIES: i64 = 3;
    const STALE_BEFORE: i64 = 0;

    fn notification(scheduled_at_ts: i64) -> ScheduledNotification {
        ScheduledNotification::new(
            ID::new(),
            NotificationSubject::Booking(ID::new()),
            ReminderKind::OneHourBefore,
            scheduled_at_ts,
            0,
        )
    }

    #[test]
    fn new_notification_is_pending() {
        let n = notification(100);
        assert_eq!(n.state(MAX_TRIES), NotificationState::Pending);
        assert_eq!(n.tries, 0);
        assert!(!n.sent && !n.processing);
        assert!(n.sent_at_ts.is_none());
    }

    #[test]
    fn it_is_due_from_scheduled_time() {
        let n = notification(100);
        assert!(!n.is_due(99, MAX_TRIES, STALE_BEFORE));
        assert!(n.is_due(100, MAX_TRIES, STALE_BEFORE));
        assert!(n.is_due(101, MAX_TRIES, STALE_BEFORE));
    }

    #[test]
    fn claim_is_exclusive_until_stale() {
        let mut n = notification(100);
        assert!(n.claim(100, MAX_TRIES, STALE_BEFORE));
        assert_eq!(n.state(MAX_TRIES), NotificationState::Claimed);
        assert!(!n.claim(101, MAX_TRIES, STALE_BEFORE));
        assert!(!n.is_due(101, MAX_TRIES, STALE_BEFORE));

        // The claim taken at 100 is considered stale when the threshold passes it
        assert!(n.is_due(500, MAX_TRIES, 100));
        assert!(n.claim(500, MAX_TRIES, 100));
        assert_eq!(n.claimed_at_ts, Some(500));
    }

    #[test]
    fn sent_is_terminal() {
        let mut n = notification(100);
        assert!(!n.mark_sent(150, 150));
        assert!(n.claim(150, MAX_TRIES, STALE_BEFORE));
        assert!(n.mark_sent(150, 150));
        assert_eq!(n.state(MAX_TRIES), NotificationState::Sent);
        assert_eq!(n.sent_at_ts, Some(150));
        assert!(!n.processing);
        assert!(!n.is_due(1000, MAX_TRIES, 1000));
        assert!(!n.claim(1000, MAX_TRIES, 1000));
        assert!(!n.mark_failed_attempt(150));
        assert!(!n.mark_sent(150, 2000));
        assert_eq!(n.sent_at_ts, Some(150));
    }

    #[test]
    fn sent_at_is_never_before_scheduled_at() {
        let mut n = notification(100);
        n.claim(100, MAX_TRIES, STALE_BEFORE);
        n.mark_sent(100, 90);
        assert_eq!(n.sent_at_ts, Some(100));
    }

    #[test]
    fn failed_attempts_are_counted_until_abandoned() {
        let mut n = notification(100);
        for attempt in 1..=MAX_TRIES {
            assert!(n.is_due(100, MAX_TRIES, STALE_BEFORE));
            assert!(n.claim(100, MAX_TRIES, STALE_BEFORE));
            assert!(n.mark_failed_attempt(100));
            assert_eq!(n.tries, attempt);
            assert!(!n.processing);
        }
        assert_eq!(n.state(MAX_TRIES), NotificationState::Abandoned);
        assert!(!n.is_due(i64::MAX, MAX_TRIES, STALE_BEFORE));
        assert!(!n.sent);
    }

    #[test]
    fn abandoned_cannot_be_claimed() {
        let mut n = notification(100);
        n.tries = MAX_TRIES;
        assert!(!n.claim(200, MAX_TRIES, STALE_BEFORE));
        assert!(!n.processing);
        assert_eq!(n.state(MAX_TRIES), NotificationState::Abandoned);
    }

    #[test]
    fn tries_only_increase_while_claimed() {
        let mut n = notification(100);
        assert!(!n.mark_failed_attempt(100));
        assert_eq!(n.tries, 0);
    }

    #[test]
    fn superseded_claim_cannot_complete() {
        let mut n = notification(100);
        assert!(n.claim(100, MAX_TRIES, STALE_BEFORE));
        // Taken over after the first claim went stale
        assert!(n.claim(500, MAX_TRIES, 100));

        assert!(!n.mark_failed_attempt(100));
        assert!(!n.mark_sent(100, 600));
        assert!(n.processing);
        assert_eq!(n.claimed_at_ts, Some(500));
        assert_eq!(n.tries, 0);

        assert!(n.mark_sent(500, 600));
        assert_eq!(n.state(MAX_TRIES), NotificationState::Sent);
    }

    #[test]
    fn same_slot_compares_subject_owner_and_kind() {
        let n = notification(100);
        let mut other = n.clone();
        other.id = ID::new();
        assert!(n.same_slot(&other));
        other.kind = ReminderKind::Started;
        assert!(!n.same_slot(&other));
    }

    #[test]
    fn subject_parts() {
        let id = ID::new();
        let subject = NotificationSubject::from_parts("booking", id).unwrap();
        assert_eq!(subject, NotificationSubject::Booking(id));
        assert!(NotificationSubject::from_parts("invoice", id).is_err());
    }
}
