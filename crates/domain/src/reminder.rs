use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

const MINUTE_MILLIS: i64 = 1000 * 60;
const HOUR_MILLIS: i64 = MINUTE_MILLIS * 60;

/// The kinds of reminders a `User` can receive about a `Booking`.
/// Adding a kind means adding a variant here and an entry in the `ReminderPlan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderKind {
    #[serde(rename = "T-2h")]
    TwoHoursBefore,
    #[serde(rename = "T-1h")]
    OneHourBefore,
    #[serde(rename = "T-5m")]
    FiveMinutesBefore,
    #[serde(rename = "T-0")]
    Started,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoHoursBefore => "T-2h",
            Self::OneHourBefore => "T-1h",
            Self::FiveMinutesBefore => "T-5m",
            Self::Started => "T-0",
        }
    }
}

impl Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InvalidReminderKindError {
    #[error("Reminder kind: {0} is not known")]
    Unknown(String),
}

impl FromStr for ReminderKind {
    type Err = InvalidReminderKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T-2h" => Ok(Self::TwoHoursBefore),
            "T-1h" => Ok(Self::OneHourBefore),
            "T-5m" => Ok(Self::FiveMinutesBefore),
            "T-0" => Ok(Self::Started),
            _ => Err(InvalidReminderKindError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderOffset {
    pub kind: ReminderKind,
    /// How long before the start of the `Booking` this reminder fires
    pub millis_before: i64,
}

impl ReminderOffset {
    pub fn new(kind: ReminderKind, millis_before: i64) -> Self {
        Self {
            kind,
            millis_before,
        }
    }
}

/// The table of reminders every `Booking` gets
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderPlan {
    offsets: Vec<ReminderOffset>,
}

impl ReminderPlan {
    pub fn new(offsets: Vec<ReminderOffset>) -> Self {
        Self { offsets }
    }

    pub fn offsets(&self) -> &[ReminderOffset] {
        &self.offsets
    }

    /// Computes the fire timestamp of every reminder in the plan for a
    /// `Booking` starting at `start_ts` and keeps the ones strictly after `now_ts`.
    ///
    /// The arithmetic is done on absolute UTC millis, so "two hours before" is
    /// always two real hours, whatever DST transitions lie in between.
    pub fn compute_offsets(&self, start_ts: i64, now_ts: i64) -> Vec<(ReminderKind, i64)> {
        self.offsets
            .iter()
            .map(|offset| (offset.kind, start_ts - offset.millis_before))
            .filter(|(_, fire_ts)| *fire_ts > now_ts)
            .collect()
    }
}

impl Default for ReminderPlan {
    fn default() -> Self {
        Self::new(vec![
            ReminderOffset::new(ReminderKind::TwoHoursBefore, 2 * HOUR_MILLIS),
            ReminderOffset::new(ReminderKind::OneHourBefore, HOUR_MILLIS),
            ReminderOffset::new(ReminderKind::FiveMinutesBefore, 5 * MINUTE_MILLIS),
            ReminderOffset::new(ReminderKind::Started, 0),
        ])
    }
}
