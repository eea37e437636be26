use crate::shared::usecase::{execute, UseCase};
use nettu_reminders_domain::{
    format_datetime, parse_timezone, Booking, ScheduledNotification, TimeConversionError, ID,
};
use nettu_reminders_infra::{NettuContext, ScheduledNotificationRepoError};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BookingOperation {
    Created,
    Updated,
    Deleted,
}

/// Reconciles the `ScheduledNotification`s of a `Booking` with its current start time
#[derive(Debug)]
pub struct SyncBookingRemindersUseCase<'a> {
    pub booking: &'a Booking,
    pub operation: BookingOperation,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    UserNotFound(ID),
    InvalidTimezone(String),
    StorageError,
}

impl<'a> SyncBookingRemindersUseCase<'a> {
    /// The full intended reminder set for the booking as of now
    async fn plan(&self, ctx: &NettuContext) -> Result<Vec<ScheduledNotification>, UseCaseError> {
        let user = ctx
            .repos
            .users
            .find(&self.booking.user_id)
            .await
            .ok_or(UseCaseError::UserNotFound(self.booking.user_id))?;
        let tz = parse_timezone(&user.timezone).map_err(|e| match e {
            TimeConversionError::InvalidTimezone(tz) => UseCaseError::InvalidTimezone(tz),
            TimeConversionError::NonexistentLocalTime(_, tz) => UseCaseError::InvalidTimezone(tz),
        })?;

        let now = ctx.sys.get_timestamp_millis();
        let planned = ctx
            .config
            .reminder_plan
            .compute_offsets(self.booking.start_ts, now)
            .into_iter()
            .map(|(kind, fire_ts)| {
                debug!(
                    "Planned reminder {} for booking {} at {}",
                    kind,
                    self.booking.id,
                    format_datetime(fire_ts, &tz)
                );
                ScheduledNotification::new(
                    self.booking.user_id,
                    self.booking.subject(),
                    kind,
                    fire_ts,
                    now,
                )
            })
            .collect();

        Ok(planned)
    }

    async fn create_all(
        &self,
        planned: Vec<ScheduledNotification>,
        ctx: &NettuContext,
    ) -> Result<Vec<ScheduledNotification>, UseCaseError> {
        let mut stored = Vec::with_capacity(planned.len());
        for notification in planned {
            match ctx.repos.scheduled_notifications.create(&notification).await {
                Ok(()) => stored.push(notification),
                Err(ScheduledNotificationRepoError::DuplicateConstraintViolation) => {
                    debug!(
                        "Reminder {} for booking {} is already scheduled",
                        notification.kind, self.booking.id
                    );
                }
                Err(e) => {
                    error!(
                        "Unable to store reminder {} for booking {}. Err: {:?}",
                        notification.kind, self.booking.id, e
                    );
                    return Err(UseCaseError::StorageError);
                }
            }
        }
        Ok(stored)
    }
}

#[async_trait::async_trait(?Send)]
impl<'a> UseCase for SyncBookingRemindersUseCase<'a> {
    /// The `ScheduledNotification`s stored by this run
    type Response = Vec<ScheduledNotification>;

    type Error = UseCaseError;

    const NAME: &'static str = "SyncBookingReminders";

    async fn execute(&mut self, ctx: &NettuContext) -> Result<Self::Response, Self::Error> {
        let subject = self.booking.subject();
        match self.operation {
            BookingOperation::Created => {
                let planned = self.plan(ctx).await?;
                self.create_all(planned, ctx).await
            }
            BookingOperation::Updated => {
                let planned = self.plan(ctx).await?;
                ctx.repos
                    .scheduled_notifications
                    .replace_pending_by_subject(&subject, &self.booking.user_id, &planned)
                    .await
                    .map_err(|e| {
                        error!(
                            "Unable to replace reminders for booking {}. Err: {:?}",
                            self.booking.id, e
                        );
                        UseCaseError::StorageError
                    })
            }
            BookingOperation::Deleted => {
                ctx.repos
                    .scheduled_notifications
                    .delete_by_subject(&subject, &self.booking.user_id)
                    .await
                    .map_err(|e| {
                        error!(
                            "Unable to delete reminders for booking {}. Err: {:?}",
                            self.booking.id, e
                        );
                        UseCaseError::StorageError
                    })?;
                Ok(Vec::new())
            }
        }
    }
}

pub async fn on_entity_created(
    booking: &Booking,
    ctx: &NettuContext,
) -> Result<Vec<ScheduledNotification>, UseCaseError> {
    let usecase = SyncBookingRemindersUseCase {
        booking,
        operation: BookingOperation::Created,
    };
    execute(usecase, ctx).await
}

pub async fn on_entity_updated(
    booking: &Booking,
    ctx: &NettuContext,
) -> Result<Vec<ScheduledNotification>, UseCaseError> {
    let usecase = SyncBookingRemindersUseCase {
        booking,
        operation: BookingOperation::Updated,
    };
    execute(usecase, ctx).await
}

pub async fn on_entity_deleted(booking: &Booking, ctx: &NettuContext) -> Result<(), UseCaseError> {
    let usecase = SyncBookingRemindersUseCase {
        booking,
        operation: BookingOperation::Deleted,
    };
    execute(usecase, ctx).await.map(|_| ())
}
