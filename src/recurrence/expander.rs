//! Expands a recurrence rule into the dates it occurs on within a window.

use time::Date;

use crate::recurrence::{occurrence::next_occurrence, rule::FrequencyRule};

/// A lazy, ascending sequence of the occurrences of a [FrequencyRule].
///
/// Created by [expand]. The sequence never includes the anchor date itself, only
/// dates inside the window, and at most `hard_cap` dates. Cloning the iterator
/// gives an independent copy that restarts from the same position.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: FrequencyRule,
    cursor: Date,
    window_start: Date,
    window_end: Date,
    remaining: usize,
}

/// Walk forward from `anchor_date`, yielding each occurrence of `rule` that falls in
/// `window_start..=window_end`, stopping after the window ends or after `hard_cap`
/// dates have been yielded.
///
/// ```ignore
/// let rule = FrequencyRule::monthly(31)?;
/// let dates: Vec<_> = expand(date!(2024-01-31), rule, date!(2024-01-01), date!(2024-04-30), 10).collect();
/// assert_eq!(dates, [date!(2024-02-29), date!(2024-03-31), date!(2024-04-30)]);
/// ```
pub fn expand(
    anchor_date: Date,
    rule: FrequencyRule,
    window_start: Date,
    window_end: Date,
    hard_cap: usize,
) -> Occurrences {
    Occurrences {
        rule,
        cursor: anchor_date,
        window_start,
        window_end,
        remaining: hard_cap,
    }
}

impl Iterator for Occurrences {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let Some(next) = next_occurrence(self.cursor, &self.rule) else {
                self.remaining = 0;
                break;
            };

            self.cursor = next;

            if next > self.window_end {
                self.remaining = 0;
                break;
            }

            if next >= self.window_start {
                self.remaining -= 1;
                return Some(next);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use time::{Date, Duration, Weekday, macros::date};

    use crate::recurrence::{expander::expand, rule::FrequencyRule};

    fn assert_well_formed(dates: &[Date], start: Date, end: Date, cap: usize) {
        assert!(dates.len() <= cap, "got {} dates with a cap of {cap}", dates.len());
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(dates.iter().all(|date| (start..=end).contains(date)));
    }

    #[test]
    fn expansion_respects_window_and_cap() {
        let rules = [
            FrequencyRule::weekly(Weekday::Thursday),
            FrequencyRule::monthly(30).unwrap(),
            FrequencyRule::yearly(2, 29).unwrap(),
        ];
        let anchor = date!(2023 - 11 - 20);
        let windows = [
            (date!(2023 - 01 - 01), date!(2030 - 12 - 31)),
            (date!(2024 - 02 - 01), date!(2024 - 05 - 31)),
            (date!(2025 - 01 - 01), date!(2025 - 01 - 01)),
        ];

        for rule in rules {
            for (start, end) in windows {
                for cap in [0, 1, 3, 1000] {
                    let dates: Vec<_> = expand(anchor, rule, start, end, cap).collect();
                    assert_well_formed(&dates, start, end, cap);
                }
            }
        }
    }

    #[test]
    fn never_includes_the_anchor() {
        // 2024-01-01 is a Monday.
        let anchor = date!(2024 - 01 - 01);

        let mut dates = expand(
            anchor,
            FrequencyRule::weekly(Weekday::Monday),
            anchor,
            date!(2024 - 12 - 31),
            1000,
        );

        assert_eq!(dates.next(), Some(date!(2024 - 01 - 08)));
    }

    #[test]
    fn leap_year_month_end_scenario() {
        let dates: Vec<_> = expand(
            date!(2024 - 01 - 31),
            FrequencyRule::monthly(31).unwrap(),
            date!(2024 - 01 - 31),
            date!(2024 - 04 - 30),
            1000,
        )
        .collect();

        assert_eq!(
            dates,
            vec![date!(2024 - 02 - 29), date!(2024 - 03 - 31), date!(2024 - 04 - 30)]
        );
    }

    #[test]
    fn skips_dates_before_the_window() {
        let dates: Vec<_> = expand(
            date!(2024 - 01 - 15),
            FrequencyRule::monthly(15).unwrap(),
            date!(2024 - 06 - 01),
            date!(2024 - 08 - 31),
            1000,
        )
        .collect();

        assert_eq!(
            dates,
            vec![date!(2024 - 06 - 15), date!(2024 - 07 - 15), date!(2024 - 08 - 15)]
        );
    }

    #[test]
    fn cap_limits_weekly_expansion() {
        let anchor = date!(2024 - 01 - 01);

        let dates: Vec<_> = expand(
            anchor,
            FrequencyRule::weekly(Weekday::Friday),
            anchor,
            anchor + Duration::days(10 * 365),
            5,
        )
        .collect();

        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn empty_when_window_ends_before_first_occurrence() {
        let mut dates = expand(
            date!(2024 - 01 - 01),
            FrequencyRule::monthly(1).unwrap(),
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 31),
            1000,
        );

        assert_eq!(dates.next(), None);
        assert_eq!(dates.next(), None);
    }

    #[test]
    fn clones_restart_from_the_same_position() {
        let mut dates = expand(
            date!(2024 - 01 - 01),
            FrequencyRule::weekly(Weekday::Sunday),
            date!(2024 - 01 - 01),
            date!(2024 - 03 - 01),
            1000,
        );
        dates.next();

        let copy = dates.clone();

        assert_eq!(dates.collect::<Vec<_>>(), copy.collect::<Vec<_>>());
    }
}
