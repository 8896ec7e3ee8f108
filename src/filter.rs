use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use nucleo::{Config, Matcher, Utf32Str};

use crate::types::Item;

/// One visible item: an index into the source slice plus highlight positions
/// (char offsets into the title).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredItem {
    pub item_index: usize,
    pub matched_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MatchQuality {
    longest_run: usize,
    first_match: usize,
    score: u16,
}

pub fn filter(items: &[Item], query: &str) -> Vec<FilteredItem> {
    let all: Vec<usize> = (0..items.len()).collect();
    filter_candidates(items, &all, query)
}

/// Filters and orders `candidates` (indices into `items`).
///
/// An empty query yields every candidate ordered by due date, undated last. A
/// non-empty query keeps only titles containing the query as a subsequence and
/// ranks them by longest contiguous run, then earliest first match.
pub fn filter_candidates(items: &[Item], candidates: &[usize], query: &str) -> Vec<FilteredItem> {
    let needle = normalize_fuzzy_needle(query);
    if needle.is_empty() {
        let mut ordered: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|index| *index < items.len())
            .collect();
        ordered.sort_by(|a, b| compare_by_due(&items[*a], &items[*b]).then_with(|| a.cmp(b)));
        return ordered
            .into_iter()
            .map(|item_index| FilteredItem {
                item_index,
                matched_indices: Vec::new(),
            })
            .collect();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut needle_buf = Vec::new();
    let needle_utf32 = Utf32Str::new(needle.as_str(), &mut needle_buf);
    let needle_chars: Vec<char> = needle.chars().collect();
    let mut title_buf = Vec::new();
    let mut indices = Vec::new();

    let mut ranked: Vec<(MatchQuality, FilteredItem)> = Vec::new();
    for &item_index in candidates {
        let Some(item) = items.get(item_index) else {
            continue;
        };
        if !case_insensitive_subsequence(&item.title, &needle) {
            continue;
        }

        indices.clear();
        let title_utf32 = Utf32Str::new(item.title.as_str(), &mut title_buf);
        let Some(score) = matcher.fuzzy_indices(title_utf32, needle_utf32, &mut indices) else {
            continue;
        };
        indices.sort_unstable();
        indices.dedup();

        let fuzzy: Vec<usize> = indices.iter().map(|index| *index as usize).collect();
        let title_chars: Vec<char> = item.title.chars().collect();
        // nucleo optimises its own score, which can scatter an exact run.
        let matched_indices = match anchored_indices(&title_chars, &needle_chars) {
            Some(anchored)
                if longest_contiguous_run(&anchored) >= longest_contiguous_run(&fuzzy) =>
            {
                anchored
            }
            _ => fuzzy,
        };
        let quality = MatchQuality {
            longest_run: longest_contiguous_run(&matched_indices),
            first_match: matched_indices.first().copied().unwrap_or(0),
            score,
        };
        ranked.push((
            quality,
            FilteredItem {
                item_index,
                matched_indices,
            },
        ));
    }

    ranked.sort_by(|(left_quality, left), (right_quality, right)| {
        right_quality
            .longest_run
            .cmp(&left_quality.longest_run)
            .then_with(|| left_quality.first_match.cmp(&right_quality.first_match))
            .then_with(|| right_quality.score.cmp(&left_quality.score))
            .then_with(|| items[left.item_index].title.cmp(&items[right.item_index].title))
            .then_with(|| left.item_index.cmp(&right.item_index))
    });

    ranked.into_iter().map(|(_, filtered)| filtered).collect()
}

/// Due date ascending, undated last, ties broken by title.
pub fn compare_by_due(left: &Item, right: &Item) -> Ordering {
    match (left.due, right.due) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| left.title.cmp(&right.title))
}

/// Whether an item passes the days-ahead window. Zero disables the window.
pub fn within_days_ahead(item: &Item, days_ahead: u32, now: DateTime<Utc>) -> bool {
    if days_ahead == 0 {
        return true;
    }
    match item.due {
        Some(due) => due <= now + Duration::days(i64::from(days_ahead)),
        None => false,
    }
}

fn normalize_fuzzy_needle(query: &str) -> String {
    query.trim().to_lowercase()
}

fn case_insensitive_subsequence(haystack: &str, needle: &str) -> bool {
    let mut remaining = needle.chars().peekable();
    for ch in haystack.chars().flat_map(char::to_lowercase) {
        if remaining.peek() == Some(&ch) {
            remaining.next();
        }
        if remaining.peek().is_none() {
            return true;
        }
    }
    remaining.peek().is_none()
}

fn folds_to(title_char: char, needle_char: char) -> bool {
    title_char == needle_char || title_char.to_lowercase().eq(std::iter::once(needle_char))
}

/// Match positions built around the longest prefix of `needle` that appears
/// unbroken in `title` (earliest on ties), with the rest of the needle
/// matched as a subsequence after it.
fn anchored_indices(title: &[char], needle: &[char]) -> Option<Vec<usize>> {
    let mut best: Option<(usize, usize)> = None;
    for start in 0..title.len() {
        let len = title[start..]
            .iter()
            .zip(needle)
            .take_while(|(title_char, needle_char)| folds_to(**title_char, **needle_char))
            .count();
        if len > best.map_or(0, |(_, best_len)| best_len) {
            best = Some((start, len));
            if len == needle.len() {
                break;
            }
        }
    }

    let (start, len) = best?;
    let mut matched: Vec<usize> = (start..start + len).collect();
    let mut position = start + len;
    for needle_char in &needle[len..] {
        let offset = title[position..]
            .iter()
            .position(|title_char| folds_to(*title_char, *needle_char))?;
        matched.push(position + offset);
        position += offset + 1;
    }
    Some(matched)
}

fn longest_contiguous_run(sorted_indices: &[usize]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<usize> = None;
    for &index in sorted_indices {
        current = match previous {
            Some(prev) if prev + 1 == index => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(index);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn item(title: &str, due: Option<DateTime<Utc>>) -> Item {
        Item {
            external_ref: title.to_ascii_lowercase(),
            title: title.to_string(),
            notes: String::new(),
            category: "Inbox".to_string(),
            due,
            priority: 0,
            completed: false,
        }
    }

    fn titles(items: &[Item], filtered: &[FilteredItem]) -> Vec<String> {
        filtered
            .iter()
            .map(|entry| items[entry.item_index].title.clone())
            .collect()
    }

    #[test]
    fn empty_query_orders_by_due_with_undated_last() {
        let now = now();
        let items = vec![
            item("A", Some(now + Duration::hours(1))),
            item("B", None),
            item("C", Some(now - Duration::hours(1))),
        ];
        assert_eq!(titles(&items, &filter(&items, "")), vec!["C", "A", "B"]);
    }

    #[test]
    fn empty_query_breaks_ties_by_title() {
        let due = Some(now());
        let items = vec![item("beta", due), item("alpha", due), item("gamma", None)];
        assert_eq!(
            titles(&items, &filter(&items, "   ")),
            vec!["alpha", "beta", "gamma"]
        );
    }

    #[test]
    fn contiguous_early_match_ranks_first() {
        let items = vec![item("Amazing", None), item("Zulu", None), item("Azkaban", None)];
        let result = filter(&items, "az");
        assert_eq!(titles(&items, &result), vec!["Azkaban", "Amazing"]);
        assert_eq!(result[0].matched_indices, vec![0, 1]);
    }

    #[test]
    fn query_is_case_insensitive() {
        let items = vec![item("Buy Milk", None)];
        let result = filter(&items, "MILK");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].matched_indices, vec![4, 5, 6, 7]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let items = vec![
            item("water plants", None),
            item("wash car", None),
            item("write report", None),
            item("walk", None),
        ];
        assert_eq!(filter(&items, "wa"), filter(&items, "wa"));
    }

    #[test]
    fn candidates_restrict_the_result() {
        let items = vec![item("alpha", None), item("alps", None)];
        let result = filter_candidates(&items, &[1], "al");
        assert_eq!(titles(&items, &result), vec!["alps"]);
    }

    #[test]
    fn days_ahead_window_keeps_overdue_and_drops_undated() {
        let now = now();
        assert!(within_days_ahead(&item("x", None), 0, now));
        assert!(!within_days_ahead(&item("x", None), 3, now));
        assert!(within_days_ahead(
            &item("x", Some(now - Duration::days(10))),
            3,
            now
        ));
        assert!(within_days_ahead(
            &item("x", Some(now + Duration::days(2))),
            3,
            now
        ));
        assert!(!within_days_ahead(
            &item("x", Some(now + Duration::days(4))),
            3,
            now
        ));
    }

    #[test]
    fn unbroken_query_outranks_scattered_match() {
        let items = vec![item("t_e_a_m steam", None), item("tea xm", None)];
        let result = filter(&items, "team");
        assert_eq!(titles(&items, &result), vec!["t_e_a_m steam", "tea xm"]);
        assert_eq!(result[0].matched_indices, vec![9, 10, 11, 12]);
        assert_eq!(result[1].matched_indices, vec![0, 1, 2, 5]);
    }

    #[test]
    fn anchored_match_finishes_needle_after_run() {
        let title: Vec<char> = "Call Team lead".chars().collect();
        let needle: Vec<char> = "teal".chars().collect();
        assert_eq!(anchored_indices(&title, &needle), Some(vec![5, 6, 7, 10]));
        assert_eq!(anchored_indices(&title, &['z']), None);
    }

    #[test]
    fn longest_run_counts_adjacent_indices() {
        assert_eq!(longest_contiguous_run(&[]), 0);
        assert_eq!(longest_contiguous_run(&[0, 2, 3, 4, 9]), 3);
    }
}
