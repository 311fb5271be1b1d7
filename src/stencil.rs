//! Four-point Jacobi stencil
//!
//! $$
//! \psi^{k+1}_{i,j} = \frac{1}{4} \left( \psi^k_{i-1,j} + \psi^k_{i+1,j}
//!   + \psi^k_{i,j-1} + \psi^k_{i,j+1} \right)
//! $$
//!
//! applied to every owned interior cell. The halo of the input must already
//! hold neighbour (or boundary) data; halo cells of the output are never
//! written.
use crate::field::Field;
use clap::ValueEnum;
use ndarray::{s, Axis};
use rayon::prelude::*;
use serde::Deserialize;

/// How the interior sweep is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Sweep {
    /// Single loop nest
    #[default]
    Serial,
    /// Owned rows distributed over the rayon thread pool
    Parallel,
}

/// Applies the stencil from a current into a next iterate
#[derive(Debug, Clone, Copy, Default)]
pub struct StencilKernel {
    sweep: Sweep,
}

impl StencilKernel {
    pub fn new(sweep: Sweep) -> Self {
        Self { sweep }
    }

    pub fn sweep(&self) -> Sweep {
        self.sweep
    }

    /// Write the stencil average of `cur` into the interior of `next`.
    /// Both sweeps produce bitwise identical results.
    pub fn apply(&self, cur: &Field, next: &mut Field) {
        debug_assert_eq!((cur.rows(), cur.cols()), (next.rows(), next.cols()));
        match self.sweep {
            Sweep::Serial => jacobi_step(cur, next),
            Sweep::Parallel => jacobi_step_par(cur, next),
        }
    }
}

fn jacobi_step(cur: &Field, next: &mut Field) {
    let (m, n) = (cur.rows(), cur.cols());
    let psi = cur.array();
    let psinew = next.array_mut();
    for i in 1..=m {
        for j in 1..=n {
            psinew[[i, j]] =
                0.25 * (psi[[i - 1, j]] + psi[[i + 1, j]] + psi[[i, j - 1]] + psi[[i, j + 1]]);
        }
    }
}

fn jacobi_step_par(cur: &Field, next: &mut Field) {
    let (m, n) = (cur.rows(), cur.cols());
    let psi = cur.array();
    next.array_mut()
        .slice_mut(s![1..=m, ..])
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(k, mut row)| {
            let i = k + 1;
            for j in 1..=n {
                row[j] = 0.25
                    * (psi[[i - 1, j]] + psi[[i + 1, j]] + psi[[i, j - 1]] + psi[[i, j + 1]]);
            }
        });
}

#[cfg(test)]
mod test {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> Field {
        let mut f = Field::zeros(rows, cols);
        for i in 0..rows + 2 {
            for j in 0..cols + 2 {
                f[(i, j)] = (i * 31 + j * 7) as f64 * 0.125 + ((i * j) % 5) as f64;
            }
        }
        f
    }

    #[test]
    fn test_single_cell() {
        let mut cur = Field::zeros(1, 1);
        cur[(0, 1)] = 1.;
        cur[(2, 1)] = 2.;
        cur[(1, 0)] = 3.;
        cur[(1, 2)] = 6.;
        cur[(1, 1)] = 100.;
        let mut next = Field::zeros(1, 1);
        StencilKernel::default().apply(&cur, &mut next);
        assert_eq!(next[(1, 1)], 3.);
    }

    #[test]
    fn test_halo_untouched() {
        let cur = ramp(4, 5);
        let mut next = Field::zeros(4, 5);
        next[(0, 3)] = -1.;
        next[(5, 2)] = -2.;
        next[(2, 0)] = -3.;
        next[(2, 6)] = -4.;
        StencilKernel::new(Sweep::Parallel).apply(&cur, &mut next);
        assert_eq!(next[(0, 3)], -1.);
        assert_eq!(next[(5, 2)], -2.);
        assert_eq!(next[(2, 0)], -3.);
        assert_eq!(next[(2, 6)], -4.);
    }

    #[test]
    fn test_locality() {
        let cur = ramp(6, 6);
        let mut reference = Field::zeros(6, 6);
        StencilKernel::default().apply(&cur, &mut reference);

        // (3, 3) depends on (2,3), (4,3), (3,2), (3,4) only
        let mut perturbed = cur.clone();
        for (i, j) in [(3, 3), (2, 2), (4, 4), (1, 3), (5, 3), (3, 1), (3, 5)] {
            perturbed[(i, j)] += 1e3;
        }
        let mut next = Field::zeros(6, 6);
        StencilKernel::default().apply(&perturbed, &mut next);
        assert_eq!(next[(3, 3)], reference[(3, 3)]);

        perturbed[(2, 3)] += 4.;
        StencilKernel::default().apply(&perturbed, &mut next);
        assert_eq!(next[(3, 3)], reference[(3, 3)] + 1.);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let cur = ramp(17, 9);
        let mut serial = Field::zeros(17, 9);
        let mut parallel = Field::zeros(17, 9);
        StencilKernel::new(Sweep::Serial).apply(&cur, &mut serial);
        StencilKernel::new(Sweep::Parallel).apply(&cur, &mut parallel);
        assert_eq!(serial, parallel);
    }
}
