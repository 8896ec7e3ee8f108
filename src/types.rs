use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lines shown for an item's notes before they are cut off.
pub const MAX_NOTE_LINES: usize = 3;

/// Title, due line, and a blank separator.
pub const ITEM_BASE_LINES: usize = 3;

/// A single reminder as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub external_ref: String,
    pub title: String,
    pub notes: String,
    pub category: String,
    pub due: Option<DateTime<Utc>>,
    pub priority: i32,
    pub completed: bool,
}

impl Item {
    pub fn urgency(&self, now: DateTime<Utc>) -> UrgencyBand {
        UrgencyBand::classify(self.due, now)
    }

    /// Non-blank note lines, capped at [`MAX_NOTE_LINES`].
    pub fn note_lines(&self) -> Vec<&str> {
        self.notes
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .take(MAX_NOTE_LINES)
            .collect()
    }

    /// Rows this item occupies in both the list and the column views.
    pub fn line_height(&self) -> usize {
        ITEM_BASE_LINES + self.note_lines().len()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum UrgencyBand {
    Overdue,
    DueToday,
    DueSoon,
    DueThisWeek,
    Later,
    NoDueDate,
}

impl UrgencyBand {
    pub const ALL: [Self; 6] = [
        Self::Overdue,
        Self::DueToday,
        Self::DueSoon,
        Self::DueThisWeek,
        Self::Later,
        Self::NoDueDate,
    ];

    pub fn classify(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(due) = due else {
            return Self::NoDueDate;
        };
        if due < now {
            return Self::Overdue;
        }
        let remaining = due - now;
        if remaining <= Duration::hours(24) {
            Self::DueToday
        } else if remaining <= Duration::days(3) {
            Self::DueSoon
        } else if remaining <= Duration::days(7) {
            Self::DueThisWeek
        } else {
            Self::Later
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Overdue => "Overdue",
            Self::DueToday => "Due today",
            Self::DueSoon => "Due soon",
            Self::DueThisWeek => "This week",
            Self::Later => "Later",
            Self::NoDueDate => "No due date",
        }
    }
}

/// Human readable time left until `due`, e.g. `Due in 1 day 2 hours`.
pub fn countdown_text(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(due) = due else {
        return "No due date".to_string();
    };
    if due < now {
        return "Overdue".to_string();
    }

    let total_hours = (due - now).num_hours();
    let days = total_hours / 24;
    let hours = total_hours % 24;

    let text = if days == 0 {
        plural(hours, "hour")
    } else if days < 7 {
        join_units(plural(days, "day"), hours, "hour")
    } else {
        join_units(plural(days / 7, "week"), days % 7, "day")
    };
    format!("Due in {text}")
}

fn join_units(head: String, rest: i64, unit: &str) -> String {
    if rest == 0 {
        head
    } else {
        format!("{head} {}", plural(rest, unit))
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Shared view model consumed by the list and column renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub external_ref: String,
    pub title: String,
    pub subtitle: String,
    pub category: String,
    pub badge_color: String,
    pub urgency: UrgencyBand,
    pub note_lines: Vec<String>,
    pub highlight: Vec<usize>,
}

impl ItemView {
    pub fn line_height(&self) -> usize {
        ITEM_BASE_LINES + self.note_lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn item_with_notes(notes: &str) -> Item {
        Item {
            external_ref: "x".to_string(),
            title: "t".to_string(),
            notes: notes.to_string(),
            category: "Inbox".to_string(),
            due: None,
            priority: 0,
            completed: false,
        }
    }

    #[test]
    fn urgency_bands_follow_thresholds() {
        let now = now();
        assert_eq!(UrgencyBand::classify(None, now), UrgencyBand::NoDueDate);
        assert_eq!(
            UrgencyBand::classify(Some(now - Duration::minutes(1)), now),
            UrgencyBand::Overdue
        );
        assert_eq!(
            UrgencyBand::classify(Some(now + Duration::hours(24)), now),
            UrgencyBand::DueToday
        );
        assert_eq!(
            UrgencyBand::classify(Some(now + Duration::hours(25)), now),
            UrgencyBand::DueSoon
        );
        assert_eq!(
            UrgencyBand::classify(Some(now + Duration::days(5)), now),
            UrgencyBand::DueThisWeek
        );
        assert_eq!(
            UrgencyBand::classify(Some(now + Duration::days(8)), now),
            UrgencyBand::Later
        );
    }

    #[test]
    fn countdown_text_formats_units() {
        let now = now();
        assert_eq!(countdown_text(None, now), "No due date");
        assert_eq!(countdown_text(Some(now - Duration::hours(1)), now), "Overdue");
        assert_eq!(
            countdown_text(Some(now + Duration::hours(1)), now),
            "Due in 1 hour"
        );
        assert_eq!(
            countdown_text(Some(now + Duration::hours(26)), now),
            "Due in 1 day 2 hours"
        );
        assert_eq!(
            countdown_text(Some(now + Duration::days(3)), now),
            "Due in 3 days"
        );
        assert_eq!(
            countdown_text(Some(now + Duration::days(15)), now),
            "Due in 2 weeks 1 day"
        );
    }

    #[test]
    fn note_lines_skip_blank_and_cap() {
        let item = item_with_notes("one\n\n  \ntwo\nthree\nfour");
        assert_eq!(item.note_lines(), vec!["one", "two", "three"]);
        assert_eq!(item.line_height(), ITEM_BASE_LINES + MAX_NOTE_LINES);
        assert_eq!(item_with_notes("").line_height(), ITEM_BASE_LINES);
    }
}
