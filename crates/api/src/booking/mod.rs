mod create_booking;
mod delete_booking;
mod get_booking;
mod list_bookings;
mod subscribers;
mod sync_booking_reminders;
mod update_booking;

pub use create_booking::CreateBookingUseCase;
pub use delete_booking::DeleteBookingUseCase;
pub use get_booking::GetBookingUseCase;
pub use list_bookings::ListBookingsUseCase;
pub use sync_booking_reminders::{
    on_entity_created, on_entity_deleted, on_entity_updated, BookingOperation,
    SyncBookingRemindersUseCase,
};
pub use update_booking::UpdateBookingUseCase;

pub mod errors {
    pub use super::create_booking::UseCaseError as CreateBookingError;
    pub use super::delete_booking::UseCaseError as DeleteBookingError;
    pub use super::get_booking::UseCaseError as GetBookingError;
    pub use super::list_bookings::UseCaseError as ListBookingsError;
    pub use super::sync_booking_reminders::UseCaseError as SyncBookingRemindersError;
    pub use super::update_booking::UseCaseError as UpdateBookingError;
}
