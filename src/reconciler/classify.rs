//! Url matching shared by popstate and startup reconciliation.

use crate::types::PageEntry;

/// Where the current url sits relative to the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborMatch {
    /// Same page as the cursor (reload, or `href = href` with a hash).
    Current,
    /// One step back.
    Previous,
    /// One step forward.
    Next,
    /// None of the three.
    Unmatched,
}

/// Compare `joined` against the current, previous and next entries, in
/// that order. Only untagged entries match by url.
pub fn match_neighbors(stack: &[PageEntry], cursor: usize, joined: &str) -> NeighborMatch {
    let matches = |index: Option<usize>| {
        index
            .and_then(|i| stack.get(i))
            .map_or(false, |entry| entry.matches_untagged(joined))
    };

    if matches(Some(cursor)) {
        NeighborMatch::Current
    } else if matches(cursor.checked_sub(1)) {
        NeighborMatch::Previous
    } else if matches(cursor.checked_add(1)) {
        NeighborMatch::Next
    } else {
        NeighborMatch::Unmatched
    }
}

/// Search `[cursor - window, cursor + window]` for an untagged entry at
/// `joined`, lowest index first, skipping the cursor itself.
pub fn fuzzy_match(stack: &[PageEntry], cursor: usize, joined: &str, window: usize) -> Option<usize> {
    if stack.is_empty() {
        return None;
    }

    let start = cursor.saturating_sub(window);
    let end = cursor.saturating_add(window).min(stack.len() - 1);

    (start..=end)
        .filter(|&i| i != cursor)
        .find(|&i| stack[i].matches_untagged(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryId, Location, NavData, NavSource, NavTag};

    fn stack(urls: &[(&str, Option<u64>)]) -> Vec<PageEntry> {
        urls.iter()
            .enumerate()
            .map(|(i, (url, tag))| {
                let nav = match tag {
                    Some(tag) => NavData::tagged(NavTag(*tag)),
                    None => NavData::new(NavSource::Hash),
                };
                PageEntry::new(EntryId(i as u64 + 1), Location::parse(url).unwrap(), nav)
            })
            .collect()
    }

    #[test]
    fn test_neighbor_order_current_previous_next() {
        let s = stack(&[("/x", None), ("/x", None), ("/x", None)]);
        assert_eq!(match_neighbors(&s, 1, "/x"), NeighborMatch::Current);

        let s = stack(&[("/x", None), ("/y", None), ("/x", None)]);
        assert_eq!(match_neighbors(&s, 1, "/x"), NeighborMatch::Previous);

        let s = stack(&[("/a", None), ("/y", None), ("/x", None)]);
        assert_eq!(match_neighbors(&s, 1, "/x"), NeighborMatch::Next);
        assert_eq!(match_neighbors(&s, 1, "/zzz"), NeighborMatch::Unmatched);
    }

    #[test]
    fn test_tagged_neighbors_never_match_by_url() {
        let s = stack(&[("/x", Some(1)), ("/y", Some(2)), ("/z", None)]);
        assert_eq!(match_neighbors(&s, 1, "/y"), NeighborMatch::Unmatched);
        assert_eq!(match_neighbors(&s, 1, "/x"), NeighborMatch::Unmatched);
        assert_eq!(match_neighbors(&s, 1, "/z"), NeighborMatch::Next);
    }

    #[test]
    fn test_edges_of_stack() {
        let s = stack(&[("/only", None)]);
        assert_eq!(match_neighbors(&s, 0, "/other"), NeighborMatch::Unmatched);
        assert_eq!(fuzzy_match(&s, 0, "/other", 3), None);
        assert_eq!(fuzzy_match(&[], 0, "/other", 3), None);
    }

    #[test]
    fn test_fuzzy_window_bounds() {
        let urls: Vec<String> = (0..10).map(|i| format!("/p{i}")).collect();
        let pairs: Vec<(&str, Option<u64>)> = urls.iter().map(|u| (u.as_str(), None)).collect();
        let s = stack(&pairs);

        assert_eq!(fuzzy_match(&s, 5, "/p2", 3), Some(2));
        assert_eq!(fuzzy_match(&s, 5, "/p8", 3), Some(8));
        assert_eq!(fuzzy_match(&s, 5, "/p1", 3), None);
        assert_eq!(fuzzy_match(&s, 5, "/p9", 3), None);
        assert_eq!(fuzzy_match(&s, 5, "/p9", 4), Some(9));
    }

    #[test]
    fn test_fuzzy_skips_tagged_entries() {
        let s = stack(&[("/a", None), ("/b", Some(7)), ("/c", None), ("/d", None)]);
        assert_eq!(fuzzy_match(&s, 3, "/b", 3), None);
        assert_eq!(fuzzy_match(&s, 3, "/a", 3), Some(0));
    }
}
