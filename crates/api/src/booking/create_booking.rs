use super::subscribers::CreateRemindersOnBookingCreated;
use crate::shared::usecase::{Subscriber, UseCase};
use chrono::NaiveDateTime;
use nettu_reminders_domain::{to_utc, Booking, TimeConversionError, ID};
use nettu_reminders_infra::NettuContext;
use tracing::error;

/// Creates a `Booking` for a `User`. The start and end are wall clock
/// times in the timezone of the `User`.
#[derive(Debug)]
pub struct CreateBookingUseCase {
    pub user_id: ID,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
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
impl UseCase for CreateBookingUseCase {
    type Response = Booking;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateBooking";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        let user = ctx
            .repos
            .users
            .find(&self.user_id)
            .await
            .ok_or(UseCaseError::UserNotFound(self.user_id))?;

        let start_ts = to_utc(&self.start, &user.timezone)?;
        let end_ts = to_utc(&self.end, &user.timezone)?;

        let booking = Booking::new(user.id, start_ts, end_ts, ctx.sys.get_timestamp_millis());
        if !booking.is_valid() {
            return Err(UseCaseError::InvalidTimespan);
        }

        ctx.repos.bookings.insert(&booking).await.map_err(|e| {
            error!("Unable to insert booking: {:?}. Err: {:?}", booking, e);
            UseCaseError::StorageError
        })?;

        Ok(booking)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(CreateRemindersOnBookingCreated)]
    }
}
