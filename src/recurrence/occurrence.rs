//! Calendar arithmetic for finding the next occurrence of a recurring transaction.

use time::{Date, Duration, Month};

use crate::recurrence::rule::FrequencyRule;

/// The first date strictly after `current` that matches `rule`.
///
/// - Weekly rules move to the next matching weekday, a full week ahead if `current`
///   already falls on it.
/// - Monthly rules move one calendar month ahead of `current` and land on the rule's
///   day of the month, or on the last day of the month if it is shorter.
/// - Yearly rules move one year ahead of `current` and land on the rule's month and
///   day, clamped the same way (February 29 becomes February 28 in common years).
///
/// Returns `None` only when the next occurrence would fall past the last date the
/// calendar supports.
pub fn next_occurrence(current: Date, rule: &FrequencyRule) -> Option<Date> {
    match *rule {
        FrequencyRule::Weekly { weekday } => {
            let current_day = current.weekday().number_days_from_monday() as i64;
            let target_day = weekday.number_days_from_monday() as i64;
            let days_ahead = match (target_day - current_day).rem_euclid(7) {
                0 => 7,
                days => days,
            };

            current.checked_add(Duration::days(days_ahead))
        }
        FrequencyRule::Monthly { day_of_month } => {
            let (year, month) = match current.month() {
                Month::December => (current.year().checked_add(1)?, Month::January),
                month => (current.year(), month.next()),
            };

            clamped_date(year, month, day_of_month)
        }
        FrequencyRule::Yearly {
            month,
            day_of_month,
        } => clamped_date(current.year().checked_add(1)?, month, day_of_month),
    }
}

/// Move `date` forward by `months` calendar months, keeping its day of the month
/// where possible and clamping to the end of shorter months.
pub fn add_months(date: Date, months: u32) -> Option<Date> {
    let month_index = u8::from(date.month()) as i64 - 1 + months as i64;
    let year = date.year() as i64 + month_index.div_euclid(12);
    let month = Month::try_from((month_index.rem_euclid(12) + 1) as u8).ok()?;

    clamped_date(i32::try_from(year).ok()?, month, date.day())
}

/// The date one calendar year after `date`, with February 29 becoming February 28.
pub fn one_year_after(date: Date) -> Option<Date> {
    add_months(date, 12)
}

/// The number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: Month) -> u8 {
    month.length(year)
}

fn clamped_date(year: i32, month: Month, day_of_month: u8) -> Option<Date> {
    let day = day_of_month.min(days_in_month(year, month));

    Date::from_calendar_date(year, month, day).ok()
}

#[cfg(test)]
mod tests {
    use time::{Duration, Weekday, macros::date};

    use crate::recurrence::{
        occurrence::{add_months, days_in_month, next_occurrence, one_year_after},
        rule::FrequencyRule,
    };

    const WEEKDAYS: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    #[test]
    fn weekly_is_strictly_later_and_at_most_a_week_away() {
        let start = date!(2024 - 01 - 01);

        for offset in 0..14 {
            let current = start + Duration::days(offset);

            for weekday in WEEKDAYS {
                let next = next_occurrence(current, &FrequencyRule::weekly(weekday)).unwrap();

                assert!(next > current, "{next} should be after {current}");
                assert!(next - current <= Duration::days(7));
                assert_eq!(next.weekday(), weekday);
            }
        }
    }

    #[test]
    fn weekly_on_the_same_weekday_skips_a_full_week() {
        // 2024-01-01 is a Monday.
        let monday = date!(2024 - 01 - 01);

        let next = next_occurrence(monday, &FrequencyRule::weekly(Weekday::Monday));

        assert_eq!(next, Some(date!(2024 - 01 - 08)));
    }

    #[test]
    fn monthly_clamps_to_the_end_of_short_months() {
        let rule = FrequencyRule::monthly(31).unwrap();

        let february = next_occurrence(date!(2024 - 01 - 31), &rule).unwrap();
        let march = next_occurrence(february, &rule).unwrap();
        let april = next_occurrence(march, &rule).unwrap();

        assert_eq!(february, date!(2024 - 02 - 29));
        assert_eq!(march, date!(2024 - 03 - 31));
        assert_eq!(april, date!(2024 - 04 - 30));
    }

    #[test]
    fn monthly_clamps_to_the_actual_month_length_not_28() {
        for day_of_month in 29..=31 {
            let rule = FrequencyRule::monthly(day_of_month).unwrap();

            let leap = next_occurrence(date!(2024 - 01 - 15), &rule).unwrap();
            let common = next_occurrence(date!(2023 - 01 - 15), &rule).unwrap();
            let june = next_occurrence(date!(2023 - 05 - 15), &rule).unwrap();

            assert_eq!(leap.day(), day_of_month.min(29));
            assert_eq!(common.day(), day_of_month.min(28));
            assert_eq!(june.day(), day_of_month.min(30));
        }
    }

    #[test]
    fn monthly_rolls_over_the_year() {
        let rule = FrequencyRule::monthly(15).unwrap();

        let next = next_occurrence(date!(2023 - 12 - 15), &rule);

        assert_eq!(next, Some(date!(2024 - 01 - 15)));
    }

    #[test]
    fn yearly_clamps_leap_days() {
        let rule = FrequencyRule::yearly(2, 29).unwrap();

        let common_year = next_occurrence(date!(2024 - 02 - 29), &rule).unwrap();
        let still_common = next_occurrence(common_year, &rule).unwrap();
        let leap_year = next_occurrence(date!(2027 - 02 - 28), &rule).unwrap();

        assert_eq!(common_year, date!(2025 - 02 - 28));
        assert_eq!(still_common, date!(2026 - 02 - 28));
        assert_eq!(leap_year, date!(2028 - 02 - 29));
    }

    #[test]
    fn yearly_moves_to_the_rule_month() {
        let rule = FrequencyRule::yearly(12, 25).unwrap();

        let next = next_occurrence(date!(2024 - 03 - 10), &rule);

        assert_eq!(next, Some(date!(2025 - 12 - 25)));
    }

    #[test]
    fn next_occurrence_is_none_past_the_end_of_the_calendar() {
        let rule = FrequencyRule::yearly(1, 1).unwrap();

        assert_eq!(next_occurrence(time::Date::MAX, &rule), None);
    }

    #[test]
    fn add_months_keeps_the_day_without_drifting() {
        let anchor = date!(2024 - 01 - 31);

        assert_eq!(add_months(anchor, 1), Some(date!(2024 - 02 - 29)));
        assert_eq!(add_months(anchor, 2), Some(date!(2024 - 03 - 31)));
        assert_eq!(add_months(anchor, 13), Some(date!(2025 - 02 - 28)));
    }

    #[test]
    fn one_year_after_a_leap_day() {
        assert_eq!(
            one_year_after(date!(2024 - 02 - 29)),
            Some(date!(2025 - 02 - 28))
        );
        assert_eq!(
            one_year_after(date!(2024 - 06 - 01)),
            Some(date!(2025 - 06 - 01))
        );
    }

    #[test]
    fn days_in_february() {
        assert_eq!(days_in_month(2024, time::Month::February), 29);
        assert_eq!(days_in_month(2100, time::Month::February), 28);
        assert_eq!(days_in_month(2000, time::Month::February), 29);
    }
}
