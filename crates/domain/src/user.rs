use crate::shared::entity::{Entity, ID};

/// The owner of `Booking`s and the receiver of their `ScheduledNotification`s.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ID,
    /// IANA timezone identifier, e.g. "Europe/Oslo". It is stored as given
    /// and only interpreted when converting between local and UTC time.
    pub timezone: String,
}

impl User {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            id: Default::default(),
            timezone: timezone.into(),
        }
    }
}

impl Entity for User {
    fn id(&self) -> &ID {
        &self.id
    }
}
