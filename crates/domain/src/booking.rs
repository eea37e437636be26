use crate::{
    scheduled_notification::NotificationSubject,
    shared::entity::{Entity, ID},
};

/// A `Booking` is the reminder-bearing entity. Its timestamps are UTC millis.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: ID,
    pub user_id: ID,
    pub start_ts: i64,
    pub end_ts: i64,
    pub created: i64,
    pub updated: i64,
}

impl Booking {
    pub fn new(user_id: ID, start_ts: i64, end_ts: i64, now_ts: i64) -> Self {
        Self {
            id: Default::default(),
            user_id,
            start_ts,
            end_ts,
            created: now_ts,
            updated: now_ts,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start_ts < self.end_ts
    }

    pub fn duration(&self) -> i64 {
        self.end_ts - self.start_ts
    }

    /// The reference that `ScheduledNotification`s use to point back to this `Booking`
    pub fn subject(&self) -> NotificationSubject {
        NotificationSubject::Booking(self.id)
    }
}

impl Entity for Booking {
    fn id(&self) -> &ID {
        &self.id
    }
}
