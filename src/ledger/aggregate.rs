use crate::ledger::budget::DAY_MINUTES;
use crate::ledger::model::{Category, TimedActivity};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rollup {
    pub total_minutes: u64,
    pub remaining_minutes: u64,
    /// Only categories with logged time appear here.
    pub per_category_minutes: BTreeMap<Category, u64>,
    pub completion_percent: u8,
}

pub fn aggregate<T: TimedActivity>(records: &[T]) -> Rollup {
    let per_category_minutes = records
        .iter()
        .filter(|record| record.duration_minutes() > 0)
        .fold(BTreeMap::new(), |mut acc, record| {
            let entry = acc.entry(record.category()).or_insert(0_u64);
            *entry += u64::from(record.duration_minutes());
            acc
        });
    let total_minutes = per_category_minutes.values().sum::<u64>();

    Rollup {
        total_minutes,
        remaining_minutes: u64::from(DAY_MINUTES).saturating_sub(total_minutes),
        per_category_minutes,
        completion_percent: completion_percent(total_minutes),
    }
}

/// Rounded share of the day, half up, capped at 100 for display.
pub fn completion_percent(total_minutes: u64) -> u8 {
    let day = u64::from(DAY_MINUTES);
    let rounded = (total_minutes.saturating_mul(100) + day / 2) / day;
    rounded.min(100) as u8
}

impl Rollup {
    /// Categories by descending minutes, ties broken by name.
    pub fn ranked_categories(&self) -> Vec<(Category, u64)> {
        let mut items = self
            .per_category_minutes
            .iter()
            .map(|(category, minutes)| (*category, *minutes))
            .collect::<Vec<_>>();

        items.sort_by(|left, right| {
            right
                .1
                .cmp(&left.1)
                .then_with(|| left.0.as_str().cmp(right.0.as_str()))
        });
        items
    }
}

pub fn render_rollup(date: &str, rollup: &Rollup) -> String {
    let category_rows = if rollup.per_category_minutes.is_empty() {
        "- No activity logged".to_string()
    } else {
        rollup
            .ranked_categories()
            .into_iter()
            .map(|(category, minutes)| {
                let share = if rollup.total_minutes == 0 {
                    0.0
                } else {
                    (minutes as f64 / rollup.total_minutes as f64) * 100.0
                };
                format!(
                    "- {:<8} {:>8} ({:.0}%)",
                    category.as_str(),
                    format_minutes(minutes),
                    share
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Day summary - {}\n- Logged: {} / {}\n- Remaining: {}\n- Completion: {}%\n\nBy category\n{}\n",
        date,
        format_minutes(rollup.total_minutes),
        format_minutes(u64::from(DAY_MINUTES)),
        format_minutes(rollup.remaining_minutes),
        rollup.completion_percent,
        category_rows
    )
}

pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let remain_minutes = minutes % 60;

    match (hours, remain_minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate, completion_percent, format_minutes, render_rollup};
    use crate::ledger::model::{Category, TimedActivity};
    use std::collections::BTreeMap;

    struct Entry(Category, u32);

    impl TimedActivity for Entry {
        fn name(&self) -> &str {
            "entry"
        }

        fn category(&self) -> Category {
            self.0
        }

        fn duration_minutes(&self) -> u32 {
            self.1
        }
    }

    #[test]
    fn empty_input_yields_zero_rollup() {
        let rollup = aggregate::<Entry>(&[]);

        assert_eq!(rollup.total_minutes, 0);
        assert!(rollup.per_category_minutes.is_empty());
        assert_eq!(rollup.completion_percent, 0);
        assert_eq!(rollup.remaining_minutes, 1440);
    }

    #[test]
    fn groups_minutes_by_category() {
        let rollup = aggregate(&[
            Entry(Category::Work, 120),
            Entry(Category::Work, 60),
            Entry(Category::Leisure, 30),
        ]);

        assert_eq!(rollup.total_minutes, 210);
        assert_eq!(
            rollup.per_category_minutes,
            BTreeMap::from([(Category::Work, 180), (Category::Leisure, 30)])
        );
        assert_eq!(rollup.completion_percent, 15);
        assert_eq!(rollup.remaining_minutes, 1230);
    }

    #[test]
    fn category_sums_match_total() {
        let entries = (1..=40)
            .map(|index| Entry(Category::ALL[index % Category::ALL.len()], index as u32 * 7))
            .collect::<Vec<_>>();
        let rollup = aggregate(&entries);
        let expected = entries.iter().map(|entry| u64::from(entry.1)).sum::<u64>();

        assert_eq!(rollup.per_category_minutes.values().sum::<u64>(), expected);
        assert_eq!(rollup.total_minutes, expected);
    }

    #[test]
    fn overfull_day_is_capped_for_display_only() {
        let rollup = aggregate(&[Entry(Category::Sleep, 1000), Entry(Category::Work, 1000)]);

        assert_eq!(rollup.total_minutes, 2000);
        assert_eq!(rollup.completion_percent, 100);
        assert_eq!(rollup.remaining_minutes, 0);
    }

    #[test]
    fn completion_rounds_half_up() {
        assert_eq!(completion_percent(7), 0);
        assert_eq!(completion_percent(8), 1);
        assert_eq!(completion_percent(720), 50);
        assert_eq!(completion_percent(1440), 100);
    }

    #[test]
    fn ranked_categories_sort_by_minutes_then_name() {
        let rollup = aggregate(&[
            Entry(Category::Work, 30),
            Entry(Category::Health, 30),
            Entry(Category::Sleep, 480),
        ]);

        assert_eq!(
            rollup.ranked_categories(),
            vec![
                (Category::Sleep, 480),
                (Category::Health, 30),
                (Category::Work, 30)
            ]
        );
    }

    #[test]
    fn render_lists_categories() {
        let rollup = aggregate(&[Entry(Category::Sleep, 480), Entry(Category::Work, 90)]);
        let text = render_rollup("2024-01-01", &rollup);

        assert!(text.contains("Day summary - 2024-01-01"));
        assert!(text.contains("Logged: 9h 30m / 24h"));
        assert!(text.contains("Sleep"));
        assert!(text.contains("Completion: 40%"));
    }

    #[test]
    fn minutes_format() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(135), "2h 15m");
    }
}
