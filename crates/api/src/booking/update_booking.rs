use super::subscribers::SyncRemindersOnBookingUpdated;
use crate::shared::usecase::{Subscriber, UseCase};
use chrono::NaiveDateTime;
use nettu_reminders_domain::{to_utc, Booking, TimeConversionError, ID};
use nettu_reminders_infra::NettuContext;
use tracing::error;

/// Moves a `Booking`. Only the owner can update it, and a missing start or
/// end keeps its current value.
#[derive(Debug)]
pub struct UpdateBookingUseCase {
    pub user_id: ID,
    pub booking_id: ID,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    UserNotFound(ID),
    InvalidTimezone(String),
    NonexistentLocalTime(NaiveDateTime),
    InvalidTimespan,
    StorageError,
}

impl From<TimeConversionError> for UseCaseError {
    fn from(e: TimeConversionError) -> Self {
        match e {
            TimeConversionError::InvalidTimezone(tz) => Self::InvalidTimezone(tz),
            TimeConversionError::NonexistentLocalTime(local, _) => {
                Self::NonexistentLocalTime(local)
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateBookingUseCase {
    type Response = Booking;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateBooking";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        let mut booking = match ctx.repos.bookings.find(&self.booking_id).await {
            Some(booking) if booking.user_id == self.user_id => booking,
            _ => return Err(UseCaseError::NotFound(self.booking_id)),
        };
        let user = ctx
            .repos
            .users
            .find(&self.user_id)
            .await
            .ok_or(UseCaseError::UserNotFound(self.user_id))?;

        if let Some(start) = &self.start {
            booking.start_ts = to_utc(start, &user.timezone)?;
        }
        if let Some(end) = &self.end {
            booking.end_ts = to_utc(end, &user.timezone)?;
        }
        if !booking.is_valid() {
            return Err(UseCaseError::InvalidTimespan);
        }
        booking.updated = ctx.sys.get_timestamp_millis();

        ctx.repos.bookings.save(&booking).await.map_err(|e| {
            error!("Unable to save booking: {:?}. Err: {:?}", booking, e);
            UseCaseError::StorageError
        })?;

        Ok(booking)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(SyncRemindersOnBookingUpdated)]
    }
}
