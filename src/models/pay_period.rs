//! Pay period model and calendar arithmetic.
//!
//! A regular pay period runs Saturday through Friday. Periods are clamped to
//! the calendar year they belong to, so the first period of a year starts on
//! January 1 and the last can end on December 31 regardless of weekday.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};

/// Date format the report site expects.
pub const SITE_DATE_FORMAT: &str = "%m/%d/%Y";

/// An inclusive date range a report is generated for.
///
/// # Example
///
/// ```
/// use timecard_reconciler::models::PayPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayPeriod::new(
///     NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
/// );
///
/// assert!(period.contains_date(NaiveDate::from_ymd_opt(2025, 7, 8).unwrap()));
/// assert_eq!(period.site_dates(), ("07/05/2025".to_string(), "07/11/2025".to_string()));
/// assert_eq!(period.week_number(), 28);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// The start date of the pay period (inclusive).
    pub start_date: NaiveDate,
    /// The end date of the pay period (inclusive).
    pub end_date: NaiveDate,
}

impl PayPeriod {
    /// Creates a period from its inclusive bounds.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// January 1 of `end_date`'s year through `end_date`.
    pub fn year_to_date(end_date: NaiveDate) -> Self {
        Self::new(year_start(end_date.year()), end_date)
    }

    /// Checks if a given date falls within this pay period (inclusive).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// The week the period's hours are filed under.
    pub fn week_number(&self) -> u32 {
        week_number(self.end_date)
    }

    /// The year the period's hours are filed under.
    pub fn year(&self) -> i32 {
        self.end_date.year()
    }

    /// Start and end formatted as `MM/DD/YYYY`.
    pub fn site_dates(&self) -> (String, String) {
        (
            self.start_date.format(SITE_DATE_FORMAT).to_string(),
            self.end_date.format(SITE_DATE_FORMAT).to_string(),
        )
    }

    /// Splits a period that straddles New Year into its two calendar-year
    /// parts. Periods within one year are returned unchanged.
    ///
    /// ```
    /// use timecard_reconciler::models::PayPeriod;
    /// use chrono::NaiveDate;
    ///
    /// let period = PayPeriod::new(
    ///     NaiveDate::from_ymd_opt(2025, 12, 27).unwrap(),
    ///     NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
    /// );
    /// let parts = period.split_at_year_end();
    /// assert_eq!(parts.len(), 2);
    /// assert_eq!(parts[0].end_date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    /// assert_eq!(parts[1].start_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    /// ```
    pub fn split_at_year_end(&self) -> Vec<PayPeriod> {
        if self.start_date.year() == self.end_date.year() {
            return vec![*self];
        }
        vec![
            PayPeriod::new(self.start_date, year_end(self.start_date.year())),
            PayPeriod::new(year_start(self.end_date.year()), self.end_date),
        ]
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}

/// January 1 of `year`.
pub fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// December 31 of `year`.
pub fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// The week number hours ending on `date` are filed under.
///
/// This is the ISO week, except that a late-December date which ISO already
/// counts as week 1 of the next year is filed as week 53 so it never
/// overwrites the first week of its own year.
///
/// ```
/// use timecard_reconciler::models::week_number;
/// use chrono::NaiveDate;
///
/// // 2025-12-31 is a Wednesday in ISO week 1 of 2026.
/// assert_eq!(week_number(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()), 53);
/// assert_eq!(week_number(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()), 1);
/// ```
pub fn week_number(date: NaiveDate) -> u32 {
    let week = date.iso_week().week();
    if date.month() == 12 && week == 1 {
        53
    } else {
        week
    }
}

/// Walks back from `date` (inclusive) to the nearest `weekday`.
pub fn on_or_before(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(back))
}

/// The pay period that most recently completed as of `today`: the period
/// ending on the last Friday no later than yesterday.
///
/// ```
/// use timecard_reconciler::models::current_pay_period;
/// use chrono::NaiveDate;
///
/// // Monday 2025-07-14 -> Saturday 07-05 .. Friday 07-11
/// let period = current_pay_period(NaiveDate::from_ymd_opt(2025, 7, 14).unwrap());
/// assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2025, 7, 5).unwrap());
/// assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2025, 7, 11).unwrap());
/// ```
pub fn current_pay_period(today: NaiveDate) -> PayPeriod {
    let end = on_or_before(today - Duration::days(1), Weekday::Fri);
    PayPeriod::new(end - Duration::days(6), end)
}

/// The end of the year-to-date window for reconciling `year` as of `today`.
///
/// For the current year this is the last Friday no later than yesterday; for
/// a past year it is December 31. Returns `Ok(None)` when no pay period of
/// `year` has completed yet, and [`ReconcileError::InvalidYear`] when the year
/// has not started.
pub fn ytd_period_end(today: NaiveDate, year: i32) -> ReconcileResult<Option<NaiveDate>> {
    let yesterday = today - Duration::days(1);
    if year > yesterday.year() {
        return Err(ReconcileError::InvalidYear { year, today });
    }
    if year < yesterday.year() {
        return Ok(Some(year_end(year)));
    }
    let end = on_or_before(yesterday, Weekday::Fri);
    Ok((end >= year_start(year)).then_some(end))
}

/// Iterates pay periods backward from `period_end` to January 1.
///
/// The first period ends on `period_end` and starts on the Saturday on or
/// before it. Each following period ends the day before the previous one
/// started. Every period is clamped to January 1, and the iterator stops
/// after yielding the period that starts on January 1.
///
/// ```
/// use timecard_reconciler::models::backfill_periods;
/// use chrono::NaiveDate;
///
/// let end = NaiveDate::from_ymd_opt(2025, 1, 17).unwrap();
/// let periods: Vec<_> = backfill_periods(end).collect();
/// assert_eq!(periods.len(), 3);
/// assert_eq!(periods[2].start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
/// assert_eq!(periods[2].end_date, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
/// ```
pub fn backfill_periods(period_end: NaiveDate) -> BackfillPeriods {
    BackfillPeriods {
        next_end: Some(period_end),
        year_start: year_start(period_end.year()),
    }
}

/// Iterator returned by [`backfill_periods`].
#[derive(Debug, Clone)]
pub struct BackfillPeriods {
    next_end: Option<NaiveDate>,
    year_start: NaiveDate,
}

impl Iterator for BackfillPeriods {
    type Item = PayPeriod;

    fn next(&mut self) -> Option<PayPeriod> {
        let end = self.next_end.take()?;
        if end < self.year_start {
            return None;
        }
        let start = on_or_before(end, Weekday::Sat).max(self.year_start);
        if start > self.year_start {
            self.next_end = Some(start - Duration::days(1));
        }
        Some(PayPeriod::new(start, end))
    }
}
