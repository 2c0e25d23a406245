//! Combinations with repetition.
//!
//! Enumerates every non-decreasing m-tuple over `[0, k)` in lexicographic
//! order, i.e. every multiset of size m drawn from k items. A single index
//! buffer is advanced in place: find the rightmost entry still below `k - 1`,
//! bump it, and set everything to its right to the bumped value.

/// Call `check` on each non-decreasing m-tuple over `[0, k)`, starting from
/// `(0, ..., 0)`.
///
/// Stops as soon as `check` returns `true` and reports `true`. With `m == 0`
/// or `k == 0` nothing is enumerated and the result is `false`.
pub fn for_each_multiset<F>(k: usize, m: usize, mut check: F) -> bool
where
    F: FnMut(&[usize]) -> bool,
{
    if m == 0 || k == 0 {
        return false;
    }

    let mut indices = vec![0usize; m];
    loop {
        if check(&indices) {
            return true;
        }

        let Some(pos) = indices.iter().rposition(|&i| i + 1 < k) else {
            return false;
        };
        let next = indices[pos] + 1;
        indices[pos..].fill(next);
    }
}

/// Number of tuples `for_each_multiset(k, m, ..)` visits: C(k + m - 1, m),
/// and 0 when either argument is 0.
pub fn multiset_count(k: usize, m: usize) -> u128 {
    if m == 0 || k == 0 {
        return 0;
    }
    // C(k + m - 1, m) built incrementally; each partial product is itself a
    // binomial coefficient, so the division is exact.
    let mut count = 1u128;
    for i in 0..m as u128 {
        count = count * (k as u128 + i) / (i + 1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(k: usize, m: usize) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        for_each_multiset(k, m, |t| {
            out.push(t.to_vec());
            false
        });
        out
    }

    #[test]
    fn test_three_choose_two_with_repetition() {
        assert_eq!(
            collect(3, 2),
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 1],
                vec![1, 2],
                vec![2, 2],
            ]
        );
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut calls = 0;
        let found = for_each_multiset(5, 0, |_| {
            calls += 1;
            true
        });
        assert!(!found);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_empty_pool_is_noop() {
        assert!(collect(0, 3).is_empty());
    }

    #[test]
    fn test_single_item_pool() {
        assert_eq!(collect(1, 3), vec![vec![0, 0, 0]]);
    }

    #[test]
    fn test_early_stop_reports_success() {
        let mut seen = Vec::new();
        let found = for_each_multiset(4, 2, |t| {
            seen.push(t.to_vec());
            t == [1, 2]
        });
        assert!(found);
        assert_eq!(seen.last(), Some(&vec![1, 2]));
        assert_eq!(seen.len(), 6); // 00 01 02 03 11 12
    }

    #[test]
    fn test_counts_match_enumeration() {
        for k in 1..6 {
            for m in 1..5 {
                let tuples = collect(k, m);
                assert_eq!(tuples.len() as u128, multiset_count(k, m), "k={} m={}", k, m);
                assert!(tuples.iter().all(|t| t.windows(2).all(|w| w[0] <= w[1])));
                let mut dedup = tuples.clone();
                dedup.dedup();
                assert_eq!(dedup.len(), tuples.len());
            }
        }
    }

    #[test]
    fn test_multiset_count_values() {
        assert_eq!(multiset_count(3, 2), 6);
        assert_eq!(multiset_count(10, 3), 220);
        assert_eq!(multiset_count(3, 0), 0);
    }
}
