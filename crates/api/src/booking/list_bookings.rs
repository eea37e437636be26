use crate::shared::usecase::UseCase;
use nettu_reminders_domain::{Booking, ID};
use nettu_reminders_infra::NettuContext;

/// The bookings of a user, earliest start first
#[derive(Debug)]
pub struct ListBookingsUseCase {
    pub user_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    UserNotFound(ID),
}

#[async_trait::async_trait(?Send)]
impl UseCase for ListBookingsUseCase {
    type Response = Vec<Booking>;

    type Error = UseCaseError;

    const NAME: &'static str = "ListBookings";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        if ctx.repos.users.find(&self.user_id).await.is_none() {
            return Err(UseCaseError::UserNotFound(self.user_id));
        }
        let mut bookings = ctx.repos.bookings.find_by_user(&self.user_id).await;
        bookings.sort_by_key(|b| b.start_ts);
        Ok(bookings)
    }
}
