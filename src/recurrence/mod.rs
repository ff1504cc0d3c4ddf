//! Recurrence rules and the calendar arithmetic for expanding them into dates.

mod expander;
mod legacy;
mod occurrence;
mod rule;

pub use expander::{Occurrences, expand};
pub use legacy::{LegacyFrequency, UnknownFrequencyLabel};
pub use occurrence::{next_occurrence, one_year_after};
pub use rule::{FrequencyColumns, FrequencyRule};
