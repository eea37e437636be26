use chrono::{prelude::*, LocalResult};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeConversionError {
    #[error("The timezone: `{0}` is not a valid IANA timezone")]
    InvalidTimezone(String),
    #[error("The local time: {0} does not exist in the timezone: {1}")]
    NonexistentLocalTime(NaiveDateTime, String),
}

pub fn parse_timezone(timezone: &str) -> Result<Tz, TimeConversionError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| TimeConversionError::InvalidTimezone(timezone.to_string()))
}

/// The wall clock time a `User` in `timezone` sees at the UTC timestamp `ts`
pub fn to_local(ts: i64, timezone: &str) -> Result<NaiveDateTime, TimeConversionError> {
    let tz = parse_timezone(timezone)?;
    Ok(tz.timestamp_millis(ts).naive_local())
}

/// Converts a wall clock time in `timezone` to a UTC timestamp in millis.
///
/// Local times repeated when the clocks are set back resolve to the earliest
/// instant. Local times skipped when the clocks are set forward do not exist
/// and are rejected.
pub fn to_utc(local: &NaiveDateTime, timezone: &str) -> Result<i64, TimeConversionError> {
    let tz = parse_timezone(timezone)?;
    match tz.from_local_datetime(local) {
        LocalResult::Single(datetime) => Ok(datetime.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp_millis()),
        LocalResult::None => Err(TimeConversionError::NonexistentLocalTime(
            *local,
            timezone.to_string(),
        )),
    }
}

pub fn format_datetime(ts: i64, tz: &Tz) -> String {
    tz.timestamp_millis(ts).format("%F %T %Z").to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd(year, month, day).and_hms(hour, minute, 0)
    }

    fn utc_ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
        Utc.ymd(year, month, day)
            .and_hms(hour, minute, 0)
            .timestamp_millis()
    }

    #[test]
    fn it_rejects_unknown_timezones() {
        for tz in &["Mars/Olympus_Mons", "", "europe/oslo", "GMT+25"] {
            assert_eq!(
                parse_timezone(tz),
                Err(TimeConversionError::InvalidTimezone(tz.to_string()))
            );
            assert!(to_local(0, tz).is_err());
            assert!(to_utc(&local(2021, 1, 1, 0, 0), tz).is_err());
        }
    }

    #[test]
    fn it_converts_to_local_time() {
        let ts = utc_ts(2021, 6, 1, 10, 0);
        assert_eq!(to_local(ts, "UTC").unwrap(), local(2021, 6, 1, 10, 0));
        // Summer time in Oslo is UTC+2
        assert_eq!(
            to_local(ts, "Europe/Oslo").unwrap(),
            local(2021, 6, 1, 12, 0)
        );
        // Winter time in Oslo is UTC+1
        assert_eq!(
            to_local(utc_ts(2021, 1, 1, 10, 0), "Europe/Oslo").unwrap(),
            local(2021, 1, 1, 11, 0)
        );
    }

    #[test]
    fn it_converts_to_utc() {
        assert_eq!(
            to_utc(&local(2021, 6, 1, 12, 0), "Europe/Oslo").unwrap(),
            utc_ts(2021, 6, 1, 10, 0)
        );
        assert_eq!(
            to_utc(&local(2021, 1, 1, 9, 0), "America/New_York").unwrap(),
            utc_ts(2021, 1, 1, 14, 0)
        );
    }

    #[test]
    fn it_picks_earliest_instant_for_repeated_local_times() {
        // 2021-10-31 03:00 CEST in Oslo the clocks were set back to 02:00 CET
        assert_eq!(
            to_utc(&local(2021, 10, 31, 2, 30), "Europe/Oslo").unwrap(),
            utc_ts(2021, 10, 31, 0, 30)
        );
    }

    #[test]
    fn it_rejects_skipped_local_times() {
        // 2021-03-28 02:00 CET in Oslo the clocks were set forward to 03:00 CEST
        let skipped = local(2021, 3, 28, 2, 30);
        assert_eq!(
            to_utc(&skipped, "Europe/Oslo"),
            Err(TimeConversionError::NonexistentLocalTime(
                skipped,
                "Europe/Oslo".into()
            ))
        );
    }

    #[test]
    fn local_round_trip_outside_transitions() {
        let ts = utc_ts(2021, 3, 28, 12, 15);
        let wall_clock = to_local(ts, "Australia/Sydney").unwrap();
        assert_eq!(to_utc(&wall_clock, "Australia/Sydney").unwrap(), ts);
    }
}
