use super::subscribers::DeleteRemindersOnBookingDeleted;
use crate::shared::usecase::{Subscriber, UseCase};
use nettu_reminders_domain::{Booking, ID};
use nettu_reminders_infra::NettuContext;
use tracing::error;

#[derive(Debug)]
pub struct DeleteBookingUseCase {
    pub user_id: ID,
    pub booking_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteBookingUseCase {
    type Response = Booking;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteBooking";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        match ctx.repos.bookings.find(&self.booking_id).await {
            Some(booking) if booking.user_id == self.user_id => {
                // The reminders are only purged once the booking is really gone
                match ctx.repos.bookings.delete(&booking.id).await {
                    Some(_) => Ok(booking),
                    None => {
                        error!("Booking {} was found but could not be deleted", booking.id);
                        Err(UseCaseError::StorageError)
                    }
                }
            }
            _ => Err(UseCaseError::NotFound(self.booking_id)),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(DeleteRemindersOnBookingDeleted)]
    }
}
