//! Recency top-K selection.
//!
//! Keeps the K most recently dated candidates out of a larger batch with a
//! bounded min-heap, O(N log K). A candidate only displaces the heap root when
//! its date is strictly newer, so on equal dates the resident (earlier seen)
//! candidate wins.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Select the indices of the `k` most recent candidates.
///
/// `candidates` are `(date, index)` pairs in the order they were seen. The
/// result holds exactly `min(k, candidates)` indices in heap order; callers
/// that need a sorted list sort afterwards.
pub fn select<D: Ord>(candidates: impl IntoIterator<Item = (D, usize)>, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<(D, usize)>> = BinaryHeap::with_capacity(k + 1);

    for (date, index) in candidates {
        if heap.len() < k {
            heap.push(Reverse((date, index)));
            continue;
        }

        let newer = heap
            .peek()
            .map(|Reverse((oldest, _))| date > *oldest)
            .unwrap_or(false);

        if newer {
            heap.pop();
            heap.push(Reverse((date, index)));
        }
    }

    heap.into_vec()
        .into_iter()
        .map(|Reverse((_, index))| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_keeps_most_recent_ten_of_thirty() {
        let candidates: Vec<_> = (1..=30).map(|d| (day(d), d as usize - 1)).collect();

        let mut picked = select(candidates, 10);
        picked.sort_unstable();

        // indices 20..30 are dates 2023-01-21 ..= 2023-01-30
        assert_eq!(picked, (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let picked = select(vec![(day(3), 0), (day(1), 1)], 25);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_zero_k() {
        assert!(select(vec![(day(3), 0)], 0).is_empty());
    }

    #[test]
    fn test_tie_keeps_resident() {
        // heap full with day 5 (index 0) and day 7 (index 1); a later day-5
        // candidate must not displace the resident day-5 entry
        let picked = select(vec![(day(5), 0), (day(7), 1), (day(5), 2)], 2);
        let mut picked = picked;
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1]);
    }

    #[test]
    fn test_no_discarded_candidate_is_newer() {
        let dates = [9, 2, 17, 4, 4, 30, 11, 1, 23, 17, 8, 28];
        let candidates: Vec<_> = dates.iter().enumerate().map(|(i, d)| (day(*d), i)).collect();

        let picked = select(candidates.clone(), 5);
        assert_eq!(picked.len(), 5);

        let oldest_kept = picked.iter().map(|i| candidates[*i].0).min().unwrap();
        for (date, index) in &candidates {
            if !picked.contains(index) {
                assert!(*date <= oldest_kept);
            }
        }
    }

    #[test]
    fn test_string_dates_compare_lexicographically() {
        let picked = select(vec![("2023-02-01", 0), ("2022-12-31", 1), ("2023-01-15", 2)], 2);
        let mut picked = picked;
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 2]);
    }
}
