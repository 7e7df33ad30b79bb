use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};

use crate::error::MarketError;

/// Answers "is the market open right now". The orchestrator gates every
/// tick on this unless the force-open override is set.
pub trait MarketCalendar: Send + Sync {
    fn is_open(&self, now: DateTime<Utc>) -> Result<bool, MarketError>;
}

/// Calendar that is always open. Used for the force-open override and in
/// tests.
pub struct AlwaysOpen;

impl MarketCalendar for AlwaysOpen {
    fn is_open(&self, _now: DateTime<Utc>) -> Result<bool, MarketError> {
        Ok(true)
    }
}

/// NYSE regular-session calendar: Monday through Friday, 9:30-16:00
/// US/Eastern, excluding market holidays.
///
/// The holiday table is baked in per year; asking about a year outside the
/// table fails `CalendarUnavailable` rather than silently guessing.
pub struct NyseCalendar;

/// Full market holidays (observed dates) per year.
const HOLIDAYS_2025: [(u32, u32); 10] = [
    (1, 1),   // New Year's Day
    (1, 20),  // Martin Luther King Jr. Day
    (2, 17),  // Washington's Birthday
    (4, 18),  // Good Friday
    (5, 26),  // Memorial Day
    (6, 19),  // Juneteenth
    (7, 4),   // Independence Day
    (9, 1),   // Labor Day
    (11, 27), // Thanksgiving
    (12, 25), // Christmas
];

const HOLIDAYS_2026: [(u32, u32); 10] = [
    (1, 1),
    (1, 19),
    (2, 16),
    (4, 3),
    (5, 25),
    (6, 19),
    (7, 3), // July 4th falls on a Saturday, observed Friday
    (9, 7),
    (11, 26),
    (12, 25),
];

impl NyseCalendar {
    fn holidays(year: i32) -> Result<&'static [(u32, u32)], MarketError> {
        match year {
            2025 => Ok(&HOLIDAYS_2025),
            2026 => Ok(&HOLIDAYS_2026),
            _ => Err(MarketError::CalendarUnavailable(format!(
                "no holiday table for {year}"
            ))),
        }
    }

    /// Nth occurrence of a weekday within a month (1-based).
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, nth: u32) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset = (7 + weekday.num_days_from_monday() as i64
            - first.weekday().num_days_from_monday() as i64)
            % 7;
        first.checked_add_days(chrono::Days::new(
            (offset + 7 * (nth as i64 - 1)) as u64,
        ))
    }

    /// UTC offset of US/Eastern in hours at the given instant.
    /// DST runs from 2:00 EST on the second Sunday of March (07:00 UTC)
    /// to 2:00 EDT on the first Sunday of November (06:00 UTC).
    fn eastern_offset_hours(now: DateTime<Utc>) -> Result<i64, MarketError> {
        let year = now.year();
        let dst_start = Self::nth_weekday(year, 3, Weekday::Sun, 2)
            .and_then(|d| Utc.with_ymd_and_hms(year, 3, d.day(), 7, 0, 0).single())
            .ok_or_else(|| {
                MarketError::CalendarUnavailable(format!("bad DST start for {year}"))
            })?;
        let dst_end = Self::nth_weekday(year, 11, Weekday::Sun, 1)
            .and_then(|d| Utc.with_ymd_and_hms(year, 11, d.day(), 6, 0, 0).single())
            .ok_or_else(|| MarketError::CalendarUnavailable(format!("bad DST end for {year}")))?;

        if now >= dst_start && now < dst_end {
            Ok(-4)
        } else {
            Ok(-5)
        }
    }
}

impl MarketCalendar for NyseCalendar {
    fn is_open(&self, now: DateTime<Utc>) -> Result<bool, MarketError> {
        let offset = Self::eastern_offset_hours(now)?;
        let eastern = now + chrono::Duration::hours(offset);
        let date = eastern.date_naive();

        match date.weekday() {
            Weekday::Sat | Weekday::Sun => return Ok(false),
            _ => {}
        }

        let holidays = Self::holidays(date.year())?;
        if holidays.contains(&(date.month(), date.day())) {
            return Ok(false);
        }

        let minute_of_day = eastern.hour() * 60 + eastern.minute();
        // 9:30 inclusive to 16:00 exclusive.
        Ok((570..960).contains(&minute_of_day))
    }
}
