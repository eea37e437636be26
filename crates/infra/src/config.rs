use nettu_reminders_domain::ReminderPlan;
use std::{fmt::Display, str::FromStr};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    /// Sent along with every request so that the receiver can verify the sender
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// The reminders every `Booking` gets
    pub reminder_plan: ReminderPlan,
    /// How often a dispatcher looks for due `ScheduledNotification`s
    pub dispatch_poll_interval_millis: i64,
    /// Upper bound of `ScheduledNotification`s handled in a single poll
    pub dispatch_batch_size: usize,
    /// Number of dispatcher loops started by this process
    pub dispatch_workers: usize,
    /// A `ScheduledNotification` that failed this many times is abandoned
    pub notification_max_tries: i64,
    /// A delivery attempt running longer than this counts as failed
    pub delivery_timeout_millis: i64,
    /// A claim held longer than this is assumed to belong to a crashed dispatcher
    /// and the `ScheduledNotification` can be claimed again.
    pub claim_stale_after_millis: i64,
    /// Where reminders are delivered. Reminders are only logged if this is not set.
    pub webhook: Option<WebhookSettings>,
}

fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default value: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let port = parse_env_or("PORT", 5000);
        let webhook = match std::env::var("REMINDER_WEBHOOK_URL") {
            Ok(url) => {
                let key = std::env::var("REMINDER_WEBHOOK_KEY").unwrap_or_else(|_| {
                    warn!("REMINDER_WEBHOOK_KEY is not set, webhook requests will carry an empty key.");
                    String::new()
                });
                Some(WebhookSettings { url, key })
            }
            Err(_) => {
                info!("Did not find REMINDER_WEBHOOK_URL environment variable. Reminders will only be logged.");
                None
            }
        };

        Self {
            port,
            reminder_plan: ReminderPlan::default(),
            dispatch_poll_interval_millis: parse_env_or("DISPATCH_POLL_INTERVAL_MILLIS", 1000 * 10),
            dispatch_batch_size: parse_env_or("DISPATCH_BATCH_SIZE", 100),
            dispatch_workers: parse_env_or("DISPATCH_WORKERS", 1),
            notification_max_tries: parse_env_or("NOTIFICATION_MAX_TRIES", 3),
            delivery_timeout_millis: parse_env_or("DELIVERY_TIMEOUT_MILLIS", 1000 * 10),
            claim_stale_after_millis: parse_env_or("CLAIM_STALE_AFTER_MILLIS", 1000 * 60 * 5), // 5 minutes
            webhook,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
