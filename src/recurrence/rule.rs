//! The recurrence rule attached to a recurring transaction.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Month, Weekday};

use crate::{Error, recurrence::occurrence::days_in_month};

/// How often a recurring transaction repeats, and which day it lands on.
///
/// Rules are validated on construction, so a `FrequencyRule` always describes a
/// schedule that has at least one occurrence per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrequencyForm", into = "FrequencyForm")]
pub enum FrequencyRule {
    /// Repeats every week on `weekday`.
    Weekly {
        /// The day of the week the transaction happens on.
        weekday: Weekday,
    },
    /// Repeats every calendar month on `day_of_month`, or the last day of shorter months.
    Monthly {
        /// The day of the month, 1-31.
        day_of_month: u8,
    },
    /// Repeats every year on `day_of_month` of `month`.
    Yearly {
        /// The month of the year.
        month: Month,
        /// The day of the month, 1 up to the longest length of `month`.
        day_of_month: u8,
    },
}

impl FrequencyRule {
    /// A rule for a transaction that repeats every week on `weekday`.
    pub fn weekly(weekday: Weekday) -> Self {
        Self::Weekly { weekday }
    }

    /// A rule for a transaction that repeats every month on `day_of_month`.
    ///
    /// # Errors
    /// Returns [Error::InvalidFrequencyRule] if `day_of_month` is not in 1-31.
    pub fn monthly(day_of_month: u8) -> Result<Self, Error> {
        if !(1..=31).contains(&day_of_month) {
            return Err(Error::InvalidFrequencyRule(format!(
                "day of month {day_of_month} is not between 1 and 31"
            )));
        }

        Ok(Self::Monthly { day_of_month })
    }

    /// A rule for a transaction that repeats every year on `day_of_month` of `month`.
    ///
    /// `month` is the month number, 1-12. February 29 is allowed and falls on
    /// February 28 in common years.
    ///
    /// # Errors
    /// Returns [Error::InvalidFrequencyRule] if `month` is not in 1-12, or if `day_of_month`
    /// can never occur in that month (e.g. April 31).
    pub fn yearly(month: u8, day_of_month: u8) -> Result<Self, Error> {
        let month = Month::try_from(month).map_err(|_| {
            Error::InvalidFrequencyRule(format!("month {month} is not between 1 and 12"))
        })?;

        // 2000 was a leap year, so this is the longest the month can be.
        let max_day = days_in_month(2000, month);

        if day_of_month == 0 || day_of_month > max_day {
            return Err(Error::InvalidFrequencyRule(format!(
                "day of month {day_of_month} is not between 1 and {max_day} for {month}"
            )));
        }

        Ok(Self::Yearly {
            month,
            day_of_month,
        })
    }

    /// The discriminator for this rule.
    pub fn frequency_type(&self) -> FrequencyType {
        match self {
            Self::Weekly { .. } => FrequencyType::Weekly,
            Self::Monthly { .. } => FrequencyType::Monthly,
            Self::Yearly { .. } => FrequencyType::Yearly,
        }
    }

    /// Split the rule into the nullable columns used to store it.
    pub fn to_columns(&self) -> FrequencyColumns {
        let frequency_type = Some(self.frequency_type().to_string());

        match *self {
            Self::Weekly { weekday } => FrequencyColumns {
                frequency_type,
                week_day: Some(weekday_name(weekday).to_owned()),
                ..Default::default()
            },
            Self::Monthly { day_of_month } => FrequencyColumns {
                frequency_type,
                month_day: Some(day_of_month),
                ..Default::default()
            },
            Self::Yearly {
                month,
                day_of_month,
            } => FrequencyColumns {
                frequency_type,
                year_month: Some(u8::from(month)),
                year_day: Some(day_of_month),
                ..Default::default()
            },
        }
    }
}

/// The kind of a [FrequencyRule], stored in the `frequency_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyType {
    /// See [FrequencyRule::Weekly].
    Weekly,
    /// See [FrequencyRule::Monthly].
    Monthly,
    /// See [FrequencyRule::Yearly].
    Yearly,
}

impl FromStr for FrequencyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(Error::InvalidFrequencyRule(format!(
                "unsupported frequency type \"{other}\""
            ))),
        }
    }
}

impl Display for FrequencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };

        write!(f, "{name}")
    }
}

/// A recurrence rule as stored in the transaction table.
///
/// Exactly the columns belonging to `frequency_type` are populated for a recurring
/// transaction, and all columns are `NULL` for a one-off transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyColumns {
    /// `weekly`, `monthly` or `yearly`.
    pub frequency_type: Option<String>,
    /// Lowercase weekday name for weekly rules.
    pub week_day: Option<String>,
    /// Day of the month for monthly rules.
    pub month_day: Option<u8>,
    /// Month number for yearly rules.
    pub year_month: Option<u8>,
    /// Day of the month for yearly rules.
    pub year_day: Option<u8>,
}

impl FrequencyColumns {
    /// Rebuild the rule from its columns.
    ///
    /// Returns `Ok(None)` when no frequency type is stored.
    ///
    /// # Errors
    /// Returns [Error::InvalidFrequencyRule] if the frequency type is unknown or its
    /// anchor columns are missing or out of range.
    pub fn into_rule(self) -> Result<Option<FrequencyRule>, Error> {
        let Some(frequency_type) = self.frequency_type else {
            return Ok(None);
        };

        let rule = match frequency_type.parse()? {
            FrequencyType::Weekly => {
                let name = self.week_day.ok_or_else(|| missing_field("week_day"))?;
                FrequencyRule::weekly(parse_weekday(&name)?)
            }
            FrequencyType::Monthly => {
                FrequencyRule::monthly(self.month_day.ok_or_else(|| missing_field("month_day"))?)?
            }
            FrequencyType::Yearly => FrequencyRule::yearly(
                self.year_month.ok_or_else(|| missing_field("year_month"))?,
                self.year_day.ok_or_else(|| missing_field("year_day"))?,
            )?,
        };

        Ok(Some(rule))
    }
}

fn missing_field(field: &str) -> Error {
    Error::InvalidFrequencyRule(format!("missing {field}"))
}

/// The JSON representation of a [FrequencyRule].
///
/// ```json
/// {"type": "weekly", "weekday": "monday"}
/// {"type": "monthly", "day_of_month": 31}
/// {"type": "yearly", "month": 2, "day_of_month": 29}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrequencyForm {
    /// See [FrequencyRule::Weekly].
    Weekly {
        /// Weekday name, e.g. "monday".
        weekday: String,
    },
    /// See [FrequencyRule::Monthly].
    Monthly {
        /// Day of the month, 1-31.
        day_of_month: u8,
    },
    /// See [FrequencyRule::Yearly].
    Yearly {
        /// Month number, 1-12.
        month: u8,
        /// Day of the month.
        day_of_month: u8,
    },
}

impl TryFrom<FrequencyForm> for FrequencyRule {
    type Error = Error;

    fn try_from(form: FrequencyForm) -> Result<Self, Self::Error> {
        match form {
            FrequencyForm::Weekly { weekday } => Ok(Self::weekly(parse_weekday(&weekday)?)),
            FrequencyForm::Monthly { day_of_month } => Self::monthly(day_of_month),
            FrequencyForm::Yearly {
                month,
                day_of_month,
            } => Self::yearly(month, day_of_month),
        }
    }
}

impl From<FrequencyRule> for FrequencyForm {
    fn from(rule: FrequencyRule) -> Self {
        match rule {
            FrequencyRule::Weekly { weekday } => Self::Weekly {
                weekday: weekday_name(weekday).to_owned(),
            },
            FrequencyRule::Monthly { day_of_month } => Self::Monthly { day_of_month },
            FrequencyRule::Yearly {
                month,
                day_of_month,
            } => Self::Yearly {
                month: u8::from(month),
                day_of_month,
            },
        }
    }
}

/// Parse a weekday from its English name, ignoring case. Three letter
/// abbreviations such as "mon" are accepted too.
///
/// # Errors
/// Returns [Error::InvalidFrequencyRule] for anything else.
pub fn parse_weekday(name: &str) -> Result<Weekday, Error> {
    let weekday = match name.trim().to_lowercase().as_str() {
        "monday" | "mon" => Weekday::Monday,
        "tuesday" | "tue" => Weekday::Tuesday,
        "wednesday" | "wed" => Weekday::Wednesday,
        "thursday" | "thu" => Weekday::Thursday,
        "friday" | "fri" => Weekday::Friday,
        "saturday" | "sat" => Weekday::Saturday,
        "sunday" | "sun" => Weekday::Sunday,
        other => {
            return Err(Error::InvalidFrequencyRule(format!(
                "\"{other}\" is not a day of the week"
            )));
        }
    };

    Ok(weekday)
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "monday",
        Weekday::Tuesday => "tuesday",
        Weekday::Wednesday => "wednesday",
        Weekday::Thursday => "thursday",
        Weekday::Friday => "friday",
        Weekday::Saturday => "saturday",
        Weekday::Sunday => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::{Month, Weekday};

    use crate::{
        Error,
        recurrence::rule::{FrequencyColumns, FrequencyRule, parse_weekday},
    };

    #[test]
    fn monthly_rejects_days_outside_one_to_thirty_one() {
        assert!(matches!(
            FrequencyRule::monthly(0),
            Err(Error::InvalidFrequencyRule(_))
        ));
        assert!(matches!(
            FrequencyRule::monthly(32),
            Err(Error::InvalidFrequencyRule(_))
        ));
        assert_eq!(
            FrequencyRule::monthly(31),
            Ok(FrequencyRule::Monthly { day_of_month: 31 })
        );
    }

    #[test]
    fn yearly_rejects_impossible_dates() {
        assert!(FrequencyRule::yearly(13, 1).is_err());
        assert!(FrequencyRule::yearly(4, 31).is_err());
        assert!(FrequencyRule::yearly(2, 30).is_err());
        assert_eq!(
            FrequencyRule::yearly(2, 29),
            Ok(FrequencyRule::Yearly {
                month: Month::February,
                day_of_month: 29
            })
        );
    }

    #[test]
    fn parse_weekday_ignores_case() {
        assert_eq!(parse_weekday("Monday"), Ok(Weekday::Monday));
        assert_eq!(parse_weekday(" SUN "), Ok(Weekday::Sunday));
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn deserializes_tagged_json() {
        let rule: FrequencyRule =
            serde_json::from_value(json!({"type": "weekly", "weekday": "friday"})).unwrap();
        assert_eq!(rule, FrequencyRule::weekly(Weekday::Friday));

        let rule: FrequencyRule =
            serde_json::from_value(json!({"type": "yearly", "month": 12, "day_of_month": 25}))
                .unwrap();
        assert_eq!(rule, FrequencyRule::yearly(12, 25).unwrap());
    }

    #[test]
    fn deserializing_validates_fields() {
        let result: Result<FrequencyRule, _> =
            serde_json::from_value(json!({"type": "monthly", "day_of_month": 40}));
        assert!(result.is_err());

        let result: Result<FrequencyRule, _> =
            serde_json::from_value(json!({"type": "fortnightly"}));
        assert!(result.is_err());
    }

    #[test]
    fn serializes_weekday_by_name() {
        let value = serde_json::to_value(FrequencyRule::weekly(Weekday::Tuesday)).unwrap();

        assert_eq!(value, json!({"type": "weekly", "weekday": "tuesday"}));
    }

    #[test]
    fn columns_only_populate_the_active_variant() {
        let columns = FrequencyRule::yearly(3, 15).unwrap().to_columns();

        assert_eq!(
            columns,
            FrequencyColumns {
                frequency_type: Some("yearly".to_owned()),
                week_day: None,
                month_day: None,
                year_month: Some(3),
                year_day: Some(15),
            }
        );
    }

    #[test]
    fn columns_rebuild_the_rule() {
        let rule = FrequencyRule::weekly(Weekday::Wednesday);

        assert_eq!(rule.to_columns().into_rule(), Ok(Some(rule)));
        assert_eq!(FrequencyColumns::default().into_rule(), Ok(None));
    }

    #[test]
    fn columns_with_missing_anchor_are_invalid() {
        let columns = FrequencyColumns {
            frequency_type: Some("monthly".to_owned()),
            ..Default::default()
        };

        assert!(matches!(
            columns.into_rule(),
            Err(Error::InvalidFrequencyRule(_))
        ));
    }
}
