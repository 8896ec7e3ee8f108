use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

use crate::types::Item;

pub const WEEKDAY_HEADER: &str = "Mo Tu We Th Fr Sa Su";

/// A Monday-first month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Option<u32>; 7]>,
}

pub fn month_grid(date: NaiveDate) -> MonthGrid {
    let first = date.with_day(1).unwrap_or(date);
    let offset = first.weekday().num_days_from_monday() as usize;
    let days = days_in_month(first);

    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = offset;
    for day in 1..=days {
        week[slot] = Some(day);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }

    MonthGrid {
        title: first.format("%B %Y").to_string(),
        year: first.year(),
        month: first.month(),
        weeks,
    }
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Days of `grid`'s month on which some item is due, in `tz`.
pub fn due_days<Tz: TimeZone>(items: &[Item], grid: &MonthGrid, tz: &Tz) -> BTreeSet<u32> {
    items
        .iter()
        .filter_map(|item| item.due)
        .map(|due| due.with_timezone(tz).date_naive())
        .filter(|date| date.year() == grid.year && date.month() == grid.month)
        .map(|date| date.day())
        .collect()
}

/// `Jan 02, 3:04 PM` in `tz`.
pub fn format_due<Tz: TimeZone>(due: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    due.with_timezone(tz).format("%b %d, %-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn march_2024_starts_on_friday() {
        let grid = month_grid(NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
        assert_eq!(grid.title, "March 2024");
        assert_eq!(grid.weeks[0][4], Some(1));
        assert_eq!(grid.weeks[0][3], None);
        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.weeks[4][6], Some(31));
    }

    #[test]
    fn month_starting_on_monday_has_no_padding() {
        let grid = month_grid(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(grid.weeks[0][0], Some(1));
        assert_eq!(grid.weeks.last().and_then(|week| week[1]), Some(30));
    }

    #[test]
    fn leap_february() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2023, 2, 10).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()), 31);
    }

    #[test]
    fn due_days_only_covers_grid_month() {
        let grid = month_grid(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let make = |due: Option<DateTime<Utc>>| Item {
            external_ref: "x".to_string(),
            title: "x".to_string(),
            notes: String::new(),
            category: "Inbox".to_string(),
            due,
            priority: 0,
            completed: false,
        };
        let items = vec![
            make(Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap())),
            make(Some(Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap())),
            make(None),
        ];
        let days = due_days(&items, &grid, &Utc);
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn format_due_uses_twelve_hour_clock() {
        let due = Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 0).unwrap();
        assert_eq!(format_due(due, &Utc), "Jan 02, 3:04 PM");
    }
}
