//! Deterministic split of grid indices across fill workers.
//!
//! Worker `k` of an even count `w` owns one combination of index lane
//! and index half: with `lanes = w / 2`, worker `k` takes the indices
//! `i` where `i % lanes == k % lanes` inside the first half of the
//! range for `k < lanes`, the second half otherwise. With four workers
//! this is the (even/odd, first/second half) split: the four index
//! sets tile `0..total` exactly, and a partially finished worker
//! leaves thumbnails spread across the screen instead of clustered at
//! one end.

/// Indices assigned to `worker` out of `workers`, over `0..total`.
///
/// `workers` must be even and non-zero; `FillConfig::worker_count`
/// guarantees that for scheduler callers.
pub fn worker_indices(worker: usize, workers: usize, total: usize) -> impl Iterator<Item = usize> {
    debug_assert!(workers >= 2 && workers % 2 == 0);
    debug_assert!(worker < workers);

    let lanes = workers / 2;
    let lane = worker % lanes;
    let mid = total / 2;
    let (start, end) = if worker < lanes { (0, mid) } else { (mid, total) };

    (start..end).filter(move |i| i % lanes == lane)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(workers: usize, total: usize) -> Vec<Vec<usize>> {
        (0..workers)
            .map(|w| worker_indices(w, workers, total).collect())
            .collect()
    }

    #[test]
    fn test_partitions_tile_the_range() {
        for workers in [2, 4, 6, 8] {
            for total in [0, 1, 2, 3, 4, 5, 7, 8, 40, 999, 1000] {
                let mut seen = vec![0usize; total];
                for indices in assignment(workers, total) {
                    for i in indices {
                        seen[i] += 1;
                    }
                }
                assert!(
                    seen.iter().all(|n| *n == 1),
                    "workers={workers} total={total} left a gap or duplicate"
                );
            }
        }
    }

    #[test]
    fn test_four_way_split_is_parity_and_half() {
        let total = 10;
        let shares = assignment(4, total);
        assert_eq!(shares[0], vec![0, 2, 4]);
        assert_eq!(shares[1], vec![1, 3]);
        assert_eq!(shares[2], vec![6, 8]);
        assert_eq!(shares[3], vec![5, 7, 9]);
    }

    #[test]
    fn test_shares_are_roughly_equal() {
        for workers in [2, 4, 6] {
            for total in [39, 40, 999, 1000, 5000] {
                let ideal = total / workers;
                for (w, indices) in assignment(workers, total).iter().enumerate() {
                    let diff = indices.len().abs_diff(ideal);
                    assert!(
                        diff <= workers,
                        "worker {w} of {workers} got {} of {total}",
                        indices.len()
                    );
                }
            }
        }
    }

    #[test]
    fn test_thousand_item_directory_split() {
        // 1000 entries with the first 40 already resolved: each worker's
        // remaining share stays near a quarter of the rest.
        let ready = 40;
        for (w, indices) in assignment(4, 1000).iter().enumerate() {
            let unready = indices.iter().filter(|i| **i >= ready).count();
            assert!(
                (220..=260).contains(&unready),
                "worker {w} owns {unready} unresolved entries"
            );
        }
    }
}
