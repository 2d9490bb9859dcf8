use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::{Europe::Prague, Tz};

use crate::prelude::*;

/// Timezone in which the distribution operator defines calendar days.
pub const TIMEZONE: Tz = Prague;

/// Local calendar day of metering samples.
///
/// Spans from `00:00` up to the last quarter-hour slot at `23:45`.
#[derive(Copy, Clone, Eq, PartialEq)]
#[must_use]
pub struct DayWindow {
    pub date: NaiveDate,

    /// Inclusive.
    pub start: DateTime<Tz>,

    /// Inclusive, the start of the last 15-minute slot.
    pub end: DateTime<Tz>,
}

impl Debug for DayWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?}..={:?})", self.date, self.start, self.end)
    }
}

impl DayWindow {
    /// Window of the local day `offset_days` back from `now`.
    pub fn days_before(now: DateTime<Utc>, offset_days: u32) -> Result<Self> {
        let today = now.with_timezone(&TIMEZONE).date_naive();
        let date = today
            .checked_sub_days(Days::new(offset_days.into()))
            .with_context(|| format!("{offset_days} days before {today} is out of range"))?;
        Self::on(date)
    }

    pub fn on(date: NaiveDate) -> Result<Self> {
        Ok(Self {
            date,
            start: Self::localize(date, NaiveTime::MIN)?,
            end: Self::localize(date, NaiveTime::from_hms_opt(23, 45, 0).context("invalid time")?)?,
        })
    }

    /// Start bound in the format the metering API expects.
    #[must_use]
    pub fn from_param(&self) -> String {
        Self::format_utc(self.start)
    }

    /// End bound in the format the metering API expects.
    #[must_use]
    pub fn to_param(&self) -> String {
        Self::format_utc(self.end)
    }

    fn localize(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
        // Ambiguous local times resolve to the earlier instant.
        TIMEZONE
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .with_context(|| format!("`{date} {time}` does not exist in {TIMEZONE}"))
    }

    fn format_utc(timestamp: DateTime<Tz>) -> String {
        timestamp.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn summer_day_ok() -> Result {
        let window = DayWindow::days_before(utc("2024-07-16T08:30:00Z"), 1)?;
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(window.from_param(), "2024-07-14T22:00:00.000Z");
        assert_eq!(window.to_param(), "2024-07-15T21:45:00.000Z");
        Ok(())
    }

    #[test]
    fn winter_day_ok() -> Result {
        let window = DayWindow::days_before(utc("2024-01-10T12:00:00Z"), 1)?;
        assert_eq!(window.from_param(), "2024-01-08T23:00:00.000Z");
        assert_eq!(window.to_param(), "2024-01-09T22:45:00.000Z");
        Ok(())
    }

    #[test]
    fn spring_forward_ok() -> Result {
        let window = DayWindow::days_before(utc("2024-04-01T06:00:00Z"), 1)?;
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(window.from_param(), "2024-03-30T23:00:00.000Z");
        assert_eq!(window.to_param(), "2024-03-31T21:45:00.000Z");
        Ok(())
    }

    #[test]
    fn fall_back_ok() -> Result {
        let window = DayWindow::days_before(utc("2024-10-28T06:00:00Z"), 1)?;
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 10, 27).unwrap());
        assert_eq!(window.from_param(), "2024-10-26T22:00:00.000Z");
        assert_eq!(window.to_param(), "2024-10-27T22:45:00.000Z");
        Ok(())
    }

    #[test]
    fn local_date_differs_from_utc_date_ok() -> Result {
        // 23:30 UTC on the 15th is already the 16th in Prague.
        let window = DayWindow::days_before(utc("2024-07-15T23:30:00Z"), 1)?;
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        Ok(())
    }

    #[test]
    fn zero_offset_is_today_ok() -> Result {
        let window = DayWindow::days_before(utc("2024-07-15T10:00:00Z"), 0)?;
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        Ok(())
    }
}
