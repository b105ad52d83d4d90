//! Date range resolution: (reference date, granularity) → inclusive range.
//!
//! Pure calendar arithmetic, no I/O. Ranges are always calendar-aligned:
//! quarters are Jan-Mar, Apr-Jun, Jul-Sep, Oct-Dec.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::granularity::{quarter_of_month, Granularity};

/// Inclusive date range, start ≤ end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolve the range covered by `granularity` around `reference`.
    pub fn resolve(reference: NaiveDate, granularity: Granularity) -> DateRange {
        match granularity {
            Granularity::Day => DateRange {
                start: reference,
                end: reference,
            },
            Granularity::Month => {
                let start = first_of_month(reference.year(), reference.month());
                let next = if reference.month() == 12 {
                    first_of_month(reference.year() + 1, 1)
                } else {
                    first_of_month(reference.year(), reference.month() + 1)
                };
                DateRange {
                    start,
                    end: next - Duration::days(1),
                }
            }
            Granularity::Quarter => {
                let quarter = quarter_of_month(reference.month());
                let first_month = 3 * (quarter - 1) + 1;
                let start = first_of_month(reference.year(), first_month);
                let next = if quarter == 4 {
                    first_of_month(reference.year() + 1, 1)
                } else {
                    first_of_month(reference.year(), first_month + 3)
                };
                DateRange {
                    start,
                    end: next - Duration::days(1),
                }
            }
            Granularity::Year => DateRange {
                start: first_of_month(reference.year(), 1),
                end: NaiveDate::from_ymd_opt(reference.year(), 12, 31).unwrap(),
            },
        }
    }

    /// Number of calendar days in the range (inclusive both ends).
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `date` falls inside the range (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Iterate every day of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let n = self.num_days() as usize;
        self.start.iter_days().take(n)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Month is always 1-12 here, so construction cannot fail.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}
