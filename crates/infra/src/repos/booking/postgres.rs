use super::IBookingRepo;
use nettu_reminders_domain::{Booking, ID};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BookingRaw {
    booking_uid: Uuid,
    user_uid: Uuid,
    start_ts: i64,
    end_ts: i64,
    created: i64,
    updated: i64,
}

impl From<BookingRaw> for Booking {
    fn from(raw: BookingRaw) -> Self {
        Self {
            id: raw.booking_uid.into(),
            user_id: raw.user_uid.into(),
            start_ts: raw.start_ts,
            end_ts: raw.end_ts,
            created: raw.created,
            updated: raw.updated,
        }
    }
}

#[async_trait::async_trait]
impl IBookingRepo for PostgresBookingRepo {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings(booking_uid, user_uid, start_ts, end_ts, created, updated)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id.inner())
        .bind(booking.user_id.inner())
        .bind(booking.start_ts)
        .bind(booking.end_ts)
        .bind(booking.created)
        .bind(booking.updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, booking: &Booking) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET start_ts = $2,
            end_ts = $3,
            updated = $4
            WHERE booking_uid = $1
            "#,
        )
        .bind(booking.id.inner())
        .bind(booking.start_ts)
        .bind(booking.end_ts)
        .bind(booking.updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, booking_id: &ID) -> Option<Booking> {
        match sqlx::query_as::<_, BookingRaw>(
            r#"
            SELECT * FROM bookings AS b
            WHERE b.booking_uid = $1
            "#,
        )
        .bind(booking_id.inner())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(booking) => booking.map(|b| b.into()),
            Err(e) => {
                error!("Unable to find booking: {}. Err: {:?}", booking_id, e);
                None
            }
        }
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<Booking> {
        sqlx::query_as::<_, BookingRaw>(
            r#"
            SELECT * FROM bookings AS b
            WHERE b.user_uid = $1
            ORDER BY b.start_ts
            "#,
        )
        .bind(user_id.inner())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|b| b.into())
        .collect()
    }

    async fn delete(&self, booking_id: &ID) -> Option<Booking> {
        match sqlx::query_as::<_, BookingRaw>(
            r#"
            DELETE FROM bookings AS b
            WHERE b.booking_uid = $1
            RETURNING *
            "#,
        )
        .bind(booking_id.inner())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(booking) => booking.map(|b| b.into()),
            Err(e) => {
                error!("Unable to delete booking: {}. Err: {:?}", booking_id, e);
                None
            }
        }
    }
}
