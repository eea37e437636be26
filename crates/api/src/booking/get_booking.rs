use crate::shared::usecase::UseCase;
use nettu_reminders_domain::{Booking, ID};
use nettu_reminders_infra::NettuContext;

#[derive(Debug)]
pub struct GetBookingUseCase {
    pub user_id: ID,
    pub booking_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetBookingUseCase {
    type Response = Booking;

    type Error = UseCaseError;

    const NAME: &'static str = "GetBooking";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        match ctx.repos.bookings.find(&self.booking_id).await {
            Some(booking) if booking.user_id == self.user_id => Ok(booking),
            _ => Err(UseCaseError::NotFound(self.booking_id)),
        }
    }
}
