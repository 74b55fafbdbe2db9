//! Calendar boundaries in the site's fixed UTC offset

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Offset, TimeZone, Timelike, Utc,
};

/// Day, hour and weekday arithmetic in one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    /// `None` when the offset is a day or more.
    pub fn new(utc_offset_minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local(at).date_naive()
    }

    /// Calendar day plus hour, identifying one hour slot.
    pub fn hour_slot(&self, at: DateTime<Utc>) -> (NaiveDate, u32) {
        let local = self.local(at);
        (local.date_naive(), local.hour())
    }

    /// 0 = Sunday … 6 = Saturday
    pub fn weekday(&self, at: DateTime<Utc>) -> u8 {
        self.local(at).weekday().num_days_from_sunday() as u8
    }

    pub fn hour_of_day(&self, at: DateTime<Utc>) -> u8 {
        self.local(at).hour() as u8
    }

    /// Local midnight starting the day that contains `at`.
    pub fn start_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.day_of(at)
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| self.offset.from_local_datetime(&midnight).single())
            .map_or(at, |midnight| midnight.with_timezone(&Utc))
    }

    /// Same local wall-clock time `months` calendar months earlier, clamped
    /// to the end of shorter months.
    pub fn months_before(&self, at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
        self.local(at)
            .checked_sub_months(Months::new(months))
            .map_or_else(
                || at - Duration::days(31 * i64::from(months)),
                |earlier| earlier.with_timezone(&Utc),
            )
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}
