//! Domain types: granularity, date ranges, and record shapes.

pub mod granularity;
pub mod range;
pub mod records;

pub use granularity::{quarter_of_month, Granularity, ParseGranularityError};
pub use range::DateRange;
pub use records::{FilterCriteria, JoinedRecord, ProductRecord, SaleRecord};
