mod inmemory;
mod postgres;

pub use inmemory::InMemoryBookingRepo;
use nettu_reminders_domain::{Booking, ID};
pub use postgres::PostgresBookingRepo;

#[async_trait::async_trait]
pub trait IBookingRepo: Send + Sync {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn save(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn find(&self, booking_id: &ID) -> Option<Booking>;
    async fn find_by_user(&self, user_id: &ID) -> Vec<Booking>;
    async fn delete(&self, booking_id: &ID) -> Option<Booking>;
}
