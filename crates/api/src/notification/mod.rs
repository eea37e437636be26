mod dispatch_scheduled_notifications;

pub use dispatch_scheduled_notifications::{
    DispatchReport, DispatchScheduledNotificationsUseCase, UseCaseError as DispatchError,
};
