mod booking;
mod date;
mod reminder;
mod scheduled_notification;
mod shared;
mod user;

pub use booking::Booking;
pub use date::{format_datetime, parse_timezone, to_local, to_utc, TimeConversionError};
pub use reminder::{InvalidReminderKindError, ReminderKind, ReminderOffset, ReminderPlan};
pub use scheduled_notification::{
    InvalidSubjectError, NotificationState, NotificationSubject, ReminderDelivery,
    ScheduledNotification,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use user::User;
