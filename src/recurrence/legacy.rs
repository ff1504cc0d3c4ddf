//! Coarse frequency labels from the older account-level recurring marker.
//!
//! Older rows only record a label such as "monthly" instead of a
//! [FrequencyRule](crate::FrequencyRule). These labels are only used for display-only
//! projections.

use std::{fmt::Display, str::FromStr};

use time::{Date, Duration};

use crate::recurrence::occurrence::add_months;

/// A coarse recurrence label without an anchor day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyFrequency {
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every calendar month.
    Monthly,
    /// Every 3 calendar months.
    Quarterly,
    /// Every calendar year.
    Yearly,
}

/// The label was not one of the known [LegacyFrequency] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a supported frequency label")]
pub struct UnknownFrequencyLabel(pub String);

impl FromStr for LegacyFrequency {
    type Err = UnknownFrequencyLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(UnknownFrequencyLabel(s.to_owned())),
        }
    }
}

impl Display for LegacyFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        };

        write!(f, "{label}")
    }
}

impl LegacyFrequency {
    /// The `n`-th occurrence counting from `start`, where the 0-th occurrence is `start`.
    ///
    /// Month based labels are computed from `start` rather than from the previous
    /// occurrence, so a series starting on the 31st returns to the 31st after a short month.
    pub fn nth_occurrence(&self, start: Date, n: u32) -> Option<Date> {
        match self {
            Self::Weekly => start.checked_add(Duration::weeks(n as i64)),
            Self::Biweekly => start.checked_add(Duration::weeks(2 * n as i64)),
            Self::Monthly => add_months(start, n),
            Self::Quarterly => add_months(start, n.checked_mul(3)?),
            Self::Yearly => add_months(start, n.checked_mul(12)?),
        }
    }
}
