//! Splitting a layer's neurons into per-worker ranges.
//!
//! Each worker owns one contiguous range. Ranges never overlap, so workers
//! can write their neurons and output slots without synchronisation; the
//! caller joins all workers before the next phase reads the results.

use core::ops::Range;

/// Divides `0..len` into `workers` contiguous ranges of `len / workers`
/// items, the last range absorbing the remainder.
///
/// Empty ranges (when `len < workers`) are dropped.
#[must_use]
pub fn ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = len / workers;

    (0..workers)
        .map(|i| {
            let begin = i * chunk;
            let end = if i + 1 == workers { len } else { begin + chunk };
            begin..end
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Borrows one disjoint mutable sub-slice of `slice` per range.
///
/// `ranges` must be sorted, non-overlapping and within bounds, as produced
/// by [`ranges`].
///
/// # Panics
///
/// Panics if a range starts before the previous one ended or runs past the
/// end of `slice`.
#[must_use]
pub fn split_mut<'a, T>(slice: &'a mut [T], ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(ranges.len());
    let mut rest = slice;
    let mut offset = 0;

    for range in ranges {
        assert!(range.start >= offset, "overlapping ranges");
        let tail = core::mem::take(&mut rest);
        let (_, tail) = tail.split_at_mut(range.start - offset);
        let (part, tail) = tail.split_at_mut(range.len());
        parts.push(part);
        rest = tail;
        offset = range.end;
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_range_absorbs_remainder() {
        assert_eq!(ranges(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(ranges(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn fewer_items_than_workers() {
        assert_eq!(ranges(2, 8), vec![0..2]);
        assert!(ranges(0, 4).is_empty());
    }

    #[test]
    fn ranges_cover_every_index_once() {
        for len in 0..40 {
            for workers in 1..12 {
                let mut seen = vec![0u8; len];
                for r in ranges(len, workers) {
                    for i in r {
                        seen[i] += 1;
                    }
                }
                assert!(seen.iter().all(|&c| c == 1), "len={len} workers={workers}");
            }
        }
    }

    #[test]
    fn split_mut_yields_disjoint_writable_parts() {
        let mut data = vec![0usize; 10];
        let rs = ranges(10, 3);
        for (i, part) in split_mut(&mut data, &rs).into_iter().enumerate() {
            part.fill(i + 1);
        }
        assert_eq!(data, vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    #[should_panic(expected = "overlapping ranges")]
    fn split_mut_rejects_overlap() {
        let mut data = [0u8; 4];
        let _ = split_mut(&mut data, &[0..3, 2..4]);
    }
}
