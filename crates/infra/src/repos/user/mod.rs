mod inmemory;
mod postgres;

pub use inmemory::InMemoryUserRepo;
use nettu_reminders_domain::{User, ID};
pub use postgres::PostgresUserRepo;

/// Provides the `User`s owning bookings, most importantly their timezone
#[async_trait::async_trait]
pub trait IUserRepo: Send + Sync {
    async fn insert(&self, user: &User) -> anyhow::Result<()>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    async fn delete(&self, user_id: &ID) -> Option<User>;
    async fn find(&self, user_id: &ID) -> Option<User>;
}
