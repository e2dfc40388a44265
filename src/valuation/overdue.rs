use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::config::EngineConfig;
use crate::errors::Result;

/// civil calendar at a fixed utc offset, used to count whole overdue days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCalendar {
    offset: FixedOffset,
}

impl ReferenceCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.reference_offset()?))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// calendar date of an instant in this calendar
    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// whole calendar days `now`'s date is past `due`'s date, zero when not past due
    pub fn days_past(&self, due: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
        if now <= due {
            return 0;
        }
        let days = (self.civil_date(now) - self.civil_date(due)).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ist() -> ReferenceCalendar {
        ReferenceCalendar::from_config(&EngineConfig::standard()).unwrap()
    }

    #[test]
    fn test_not_past_due() {
        let due = Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap();
        assert_eq!(ist().days_past(due, due), 0);
        assert_eq!(ist().days_past(due, due - Duration::days(3)), 0);
    }

    #[test]
    fn test_same_civil_day_counts_zero() {
        let due = Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap();
        assert_eq!(ist().days_past(due, due + Duration::hours(1)), 0);
    }

    #[test]
    fn test_crossing_reference_midnight() {
        // 18:00Z is 23:30 IST, 19:00Z is 00:30 IST the next day
        let due = Utc.with_ymd_and_hms(2024, 1, 29, 18, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 29, 19, 0, 0).unwrap();
        assert_eq!(ist().days_past(due, now), 1);

        let utc = ReferenceCalendar::new(FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.days_past(due, now), 0);
    }

    #[test]
    fn test_whole_days() {
        let due = Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap();
        assert_eq!(ist().days_past(due, due + Duration::days(3)), 3);
        assert_eq!(
            ist().civil_date(due),
            NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()
        );
    }
}
