//! Daily file enumeration with the max-files guard.
//!
//! Turns a resolved date range into the ordered list of object keys to
//! fetch. The guard bounds worst-case load before any network call: a
//! mistaken multi-year request fails here, not after hundreds of downloads.

use crate::domain::DateRange;
use crate::error::PipelineError;
use crate::storage::sales_object_key;
use chrono::NaiveDate;

/// One expected daily sales object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayObject {
    pub date: NaiveDate,
    pub key: String,
}

/// Enumerate the per-day objects for `range`, ascending by date.
///
/// Fails with `TooManyFiles` when the range spans more days than
/// `max_files`; no partial enumeration is returned in that case.
pub fn enumerate_day_objects(
    range: &DateRange,
    max_files: usize,
) -> Result<Vec<DayObject>, PipelineError> {
    if range.end < range.start {
        return Err(PipelineError::Internal(format!(
            "inverted date range: {} to {}",
            range.start, range.end
        )));
    }

    let requested = range.num_days() as usize;
    if requested > max_files {
        return Err(PipelineError::TooManyFiles {
            requested,
            limit: max_files,
        });
    }

    Ok(range
        .days()
        .map(|date| DayObject {
            date,
            key: sales_object_key(date),
        })
        .collect())
}
