//! Row-block decomposition of the global grid
//!
//! The global grid has `m` rows and `n` columns of unknowns, numbered
//! `1..=m` and `1..=n`; rows `0` and `m + 1` (and columns `0` and `n + 1`)
//! hold boundary values. Each worker owns one contiguous band of rows.
//!
//! Every worker gets `m / size` rows and the **last** worker additionally
//! takes the `m % size` remainder rows.
use crate::error::{Error, Result};
use halo_comm::Neighbor;

/// Owned row span of one worker and its row-neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Rank of the worker owning this band
    pub rank: usize,
    /// Number of workers
    pub size: usize,
    /// Global rows (without boundary)
    pub m: usize,
    /// Global columns (without boundary)
    pub n: usize,
    /// First owned global row (1-based, inclusive)
    pub row_lo: usize,
    /// Last owned global row (inclusive)
    pub row_hi: usize,
    /// Worker owning the band above
    pub predecessor: Neighbor,
    /// Worker owning the band below
    pub successor: Neighbor,
}

impl Partition {
    /// Partition of worker `rank` out of `size` for an `m x n` grid
    ///
    /// # Errors
    /// `Configuration` if `m` or `n` is zero, if `size` is zero or exceeds
    /// `m` (some worker would own no rows), or if `rank >= size`.
    pub fn new(m: usize, n: usize, size: usize, rank: usize) -> Result<Self> {
        if m == 0 {
            return Err(Error::config("m", "grid must have at least one row"));
        }
        if n == 0 {
            return Err(Error::config("n", "grid must have at least one column"));
        }
        if size == 0 {
            return Err(Error::config("workers", "need at least one worker"));
        }
        if size > m {
            return Err(Error::config(
                "workers",
                format!("{} workers exceed the {} grid rows", size, m),
            ));
        }
        if rank >= size {
            return Err(Error::config(
                "rank",
                format!("rank {} out of range for {} workers", rank, size),
            ));
        }
        let base = m / size;
        let row_lo = rank * base + 1;
        let row_hi = if rank + 1 == size { m } else { row_lo + base - 1 };
        let predecessor = if rank == 0 {
            Neighbor::Null
        } else {
            Neighbor::Rank(rank - 1)
        };
        let successor = if rank + 1 == size {
            Neighbor::Null
        } else {
            Neighbor::Rank(rank + 1)
        };
        Ok(Self {
            rank,
            size,
            m,
            n,
            row_lo,
            row_hi,
            predecessor,
            successor,
        })
    }

    /// Partitions of all workers, in rank order
    pub fn all(m: usize, n: usize, size: usize) -> Result<Vec<Self>> {
        (0..size).map(|rank| Self::new(m, n, size, rank)).collect()
    }

    /// Partition of another worker of the same decomposition
    pub fn for_rank(&self, rank: usize) -> Result<Self> {
        Self::new(self.m, self.n, self.size, rank)
    }

    /// Number of owned rows
    pub fn rows_owned(&self) -> usize {
        self.row_hi - self.row_lo + 1
    }

    pub fn is_first(&self) -> bool {
        self.predecessor.is_null()
    }

    pub fn is_last(&self) -> bool {
        self.successor.is_null()
    }

    /// Global row of local row `i` (local row 0 is the upper halo)
    pub fn local_to_global(&self, i: usize) -> usize {
        self.row_lo + i - 1
    }

    /// Local row of global row `i`, if it is owned or one of this worker's
    /// halo rows
    pub fn global_to_local(&self, i: usize) -> Option<usize> {
        if i + 1 >= self.row_lo && i <= self.row_hi + 1 {
            Some(i + 1 - self.row_lo)
        } else {
            None
        }
    }

    /// Local rows this worker reports for the global field: the owned rows,
    /// plus the boundary row at the domain edge for the first/last worker.
    pub fn reported_rows(&self) -> std::ops::RangeInclusive<usize> {
        let lo = if self.is_first() { 0 } else { 1 };
        let hi = if self.is_last() {
            self.rows_owned() + 1
        } else {
            self.rows_owned()
        };
        lo..=hi
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partition_coverage() {
        for m in 1..40 {
            for size in 1..=m.min(9) {
                let parts = Partition::all(m, 3, size).unwrap();
                let mut next = 1;
                for p in &parts {
                    assert_eq!(p.row_lo, next, "gap or overlap for m={} size={}", m, size);
                    assert!(p.rows_owned() >= 1);
                    next = p.row_hi + 1;
                }
                assert_eq!(next, m + 1);
            }
        }
    }

    #[test]
    fn test_last_absorbs_remainder() {
        let parts = Partition::all(10, 4, 4).unwrap();
        let owned: Vec<_> = parts.iter().map(Partition::rows_owned).collect();
        assert_eq!(owned, vec![2, 2, 2, 4]);
        assert_eq!((parts[3].row_lo, parts[3].row_hi), (7, 10));
    }

    #[test]
    fn test_neighbours() {
        let parts = Partition::all(8, 8, 3).unwrap();
        assert_eq!(parts[0].predecessor, Neighbor::Null);
        assert_eq!(parts[0].successor, Neighbor::Rank(1));
        assert_eq!(parts[1].predecessor, Neighbor::Rank(0));
        assert_eq!(parts[2].successor, Neighbor::Null);
        let single = Partition::new(8, 8, 1, 0).unwrap();
        assert!(single.is_first() && single.is_last());
    }

    #[test]
    fn test_index_mapping() {
        let p = Partition::new(12, 5, 3, 1).unwrap();
        assert_eq!((p.row_lo, p.row_hi), (5, 8));
        assert_eq!(p.local_to_global(0), 4);
        assert_eq!(p.local_to_global(4), 8);
        assert_eq!(p.global_to_local(4), Some(0));
        assert_eq!(p.global_to_local(9), Some(5));
        assert_eq!(p.global_to_local(3), None);
        assert_eq!(p.global_to_local(10), None);
        assert_eq!(p.reported_rows(), 1..=4);
        assert_eq!(p.for_rank(0).unwrap().reported_rows(), 0..=4);
        assert_eq!(p.for_rank(2).unwrap().reported_rows(), 1..=5);
    }

    #[test]
    fn test_invalid_partitions() {
        for (m, n, size, rank, param) in [
            (4, 4, 5, 0, "workers"),
            (0, 4, 1, 0, "m"),
            (4, 0, 1, 0, "n"),
            (4, 4, 0, 0, "workers"),
            (4, 4, 2, 2, "rank"),
        ] {
            match Partition::new(m, n, size, rank) {
                Err(Error::Configuration { parameter, .. }) => assert_eq!(parameter, param),
                other => panic!("expected configuration error, got {:?}", other),
            }
        }
    }
}
