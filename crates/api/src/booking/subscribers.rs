use super::{
    create_booking::CreateBookingUseCase,
    delete_booking::DeleteBookingUseCase,
    sync_booking_reminders::{on_entity_created, on_entity_deleted, on_entity_updated},
    update_booking::UpdateBookingUseCase,
};
use crate::shared::usecase::Subscriber;
use nettu_reminders_domain::Booking;
use nettu_reminders_infra::NettuContext;
use tracing::warn;

pub struct CreateRemindersOnBookingCreated;

#[async_trait::async_trait(?Send)]
impl Subscriber<CreateBookingUseCase> for CreateRemindersOnBookingCreated {
    async fn notify(&self, e: &Booking, ctx: &NettuContext) {
        // Sideeffect, the booking change stands either way
        if on_entity_created(e, ctx).await.is_err() {
            warn!(
                "Reminders of booking {} may be out of date after it was created",
                e.id
            );
        }
    }
}

pub struct SyncRemindersOnBookingUpdated;

#[async_trait::async_trait(?Send)]
impl Subscriber<UpdateBookingUseCase> for SyncRemindersOnBookingUpdated {
    async fn notify(&self, e: &Booking, ctx: &NettuContext) {
        // Sideeffect, the booking change stands either way
        if on_entity_updated(e, ctx).await.is_err() {
            warn!(
                "Reminders of booking {} may be out of date after it was updated",
                e.id
            );
        }
    }
}

pub struct DeleteRemindersOnBookingDeleted;

#[async_trait::async_trait(?Send)]
impl Subscriber<DeleteBookingUseCase> for DeleteRemindersOnBookingDeleted {
    async fn notify(&self, e: &Booking, ctx: &NettuContext) {
        // Sideeffect, the booking change stands either way
        if on_entity_deleted(e, ctx).await.is_err() {
            warn!(
                "Reminders of booking {} may be out of date after it was deleted",
                e.id
            );
        }
    }
}
