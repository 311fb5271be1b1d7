//! Local field storage with one halo layer
//!
//! A worker owning `rows` grid rows of an `n`-column grid stores an
//! `(rows + 2) x (n + 2)` array. Local row `i` maps to global row
//! `row_lo + i - 1`; columns are global. Row `0` and row `rows + 1` are
//! halo rows (neighbour copies or domain boundary), columns `0` and `n + 1`
//! are domain boundary.
use crate::partition::Partition;
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use std::ops::{Index, IndexMut};

/// Upper or lower halo row of a [`Field`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Local row 0, shared with the predecessor
    Top,
    /// Local row `rows + 1`, shared with the successor
    Bottom,
}

/// Owned 2D field of one worker, halo included
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    data: Array2<f64>,
    rows: usize,
    cols: usize,
}

impl Field {
    /// Zeroed field of `rows x cols` owned cells
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows + 2, cols + 2)),
            rows,
            cols,
        }
    }

    /// Zeroed field sized for `partition`
    pub fn for_partition(partition: &Partition) -> Self {
        Self::zeros(partition.rows_owned(), partition.n)
    }

    /// Number of owned rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of interior columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Full array, halo included
    pub fn view(&self) -> ArrayView2<f64> {
        self.data.view()
    }

    /// Owned interior cells `1..=rows x 1..=cols`
    pub fn interior(&self) -> ArrayView2<f64> {
        self.data.slice(s![1..=self.rows, 1..=self.cols])
    }

    /// Interior columns of owned row `i` (`1..=rows`)
    pub fn owned_row(&self, i: usize) -> ArrayView1<f64> {
        debug_assert!(i >= 1 && i <= self.rows);
        self.data.slice(s![i, 1..=self.cols])
    }

    /// Interior columns of a halo row
    pub fn halo_row(&self, side: Side) -> ArrayView1<f64> {
        self.data.slice(s![self.halo_index(side), 1..=self.cols])
    }

    /// Interior columns of a halo row, mutable
    pub fn halo_row_mut(&mut self, side: Side) -> ArrayViewMut1<f64> {
        let i = self.halo_index(side);
        self.data.slice_mut(s![i, 1..=self.cols])
    }

    /// Whole local row `i` including the two boundary columns
    pub fn full_row(&self, i: usize) -> ArrayView1<f64> {
        self.data.row(i)
    }

    fn halo_index(&self, side: Side) -> usize {
        match side {
            Side::Top => 0,
            Side::Bottom => self.rows + 1,
        }
    }

    /// Raw array, for the stencil sweep
    pub(crate) fn array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Raw array, for the stencil sweep
    pub(crate) fn array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Sum of the owned interior cells
    pub fn interior_sum(&self) -> f64 {
        self.interior().sum()
    }
}

impl Index<(usize, usize)> for Field {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[[i, j]]
    }
}

impl IndexMut<(usize, usize)> for Field {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[[i, j]]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shape_and_views() {
        let mut f = Field::zeros(3, 4);
        assert_eq!(f.view().dim(), (5, 6));
        assert_eq!(f.interior().dim(), (3, 4));
        f[(1, 1)] = 2.;
        f[(3, 4)] = 5.;
        f[(0, 2)] = 7.;
        assert_eq!(f.interior_sum(), 7.);
        assert_eq!(f.owned_row(3)[3], 5.);
        assert_eq!(f.halo_row(Side::Top)[1], 7.);
        assert_eq!(f.full_row(0).len(), 6);
    }

    #[test]
    fn test_halo_row_mut() {
        let mut f = Field::zeros(2, 3);
        f.halo_row_mut(Side::Bottom).fill(1.5);
        assert_eq!(f[(3, 1)], 1.5);
        assert_eq!(f[(3, 3)], 1.5);
        assert_eq!(f[(3, 0)], 0.);
        assert_eq!(f[(3, 4)], 0.);
        assert_eq!(f.interior_sum(), 0.);
    }

    #[test]
    fn test_for_partition() {
        let p = Partition::new(10, 6, 3, 2).unwrap();
        let f = Field::for_partition(&p);
        assert_eq!((f.rows(), f.cols()), (4, 6));
    }
}
