//! Normalised residual between consecutive iterates
//!
//! $$
//! r = \frac{\sqrt{\sum_{i,j} (\psi^{k+1}_{i,j} - \psi^k_{i,j})^2}}
//!          {\sqrt{\sum_{\text{boundary}} \psi_{b}^2}}
//! $$
//!
//! Both sums run over owned cells only and are completed with a sum
//! all-reduce, so every worker sees the same residual.
use crate::error::{Error, Result};
use crate::field::Field;
use crate::partition::Partition;
use halo_comm::Communicator;

/// Norm of the boundary values, used to make the residual dimensionless
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryNorm(f64);

impl BoundaryNorm {
    /// Global norm of a freshly initialised field.
    ///
    /// Sums the owned rows (all columns) plus the domain-edge row held in
    /// the halo of the first and last worker, then all-reduces.
    ///
    /// # Errors
    /// `Configuration` if the norm is zero: the residual would be undefined.
    pub fn compute<C: Communicator>(
        comm: &C,
        field: &Field,
        partition: &Partition,
    ) -> Result<Self> {
        let mut local = 0.;
        for i in partition.reported_rows() {
            for v in field.full_row(i) {
                local += v * v;
            }
        }
        let global = comm.all_reduce_sum(local)?;
        let norm = global.sqrt();
        if norm == 0. {
            return Err(Error::config(
                "boundary",
                "boundary conditions are all zero, residual is undefined",
            ));
        }
        Ok(Self(norm))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Sum of squared differences over the owned interior
pub fn local_sq_diff(next: &Field, cur: &Field) -> f64 {
    let mut dsq = 0.;
    for (a, b) in next.interior().iter().zip(cur.interior().iter()) {
        let d = a - b;
        dsq += d * d;
    }
    dsq
}

/// Computes the global normalised residual of an iteration
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceReducer {
    norm: BoundaryNorm,
}

impl ConvergenceReducer {
    pub fn new(norm: BoundaryNorm) -> Self {
        Self { norm }
    }

    pub fn norm(&self) -> BoundaryNorm {
        self.norm
    }

    /// Collective: every worker must call this in the same iteration
    pub fn residual<C: Communicator>(&self, comm: &C, next: &Field, cur: &Field) -> Result<f64> {
        let global = comm.all_reduce_sum(local_sq_diff(next, cur))?;
        Ok(global.sqrt() / self.norm.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boundary::{BoundaryInitializer, Geometry};
    use halo_comm::LocalUniverse;

    fn initial(p: &Partition) -> Field {
        let mut f = Field::for_partition(p);
        BoundaryInitializer::new(Geometry::default())
            .unwrap()
            .apply(&mut f, p)
            .unwrap();
        f
    }

    #[test]
    fn test_local_sq_diff() {
        let a = Field::zeros(2, 2);
        let mut b = Field::zeros(2, 2);
        b[(1, 1)] = 3.;
        b[(2, 2)] = 4.;
        b[(0, 0)] = 100.;
        assert_eq!(local_sq_diff(&a, &b), 25.);
    }

    #[test]
    fn test_boundary_norm_default_geometry() {
        // inlet 1+4+9+16 + 18 * 25, outlet 15 * 25 + 16+9+4+1
        let expected = (30. + 450. + 375. + 30f64).sqrt();
        let p = Partition::new(32, 32, 1, 0).unwrap();
        let f = initial(&p);
        let out = LocalUniverse::new(1)
            .unwrap()
            .run(|comm| BoundaryNorm::compute(comm, &f, &p));
        assert!((out[0].as_ref().unwrap().value() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_norm_distributed() {
        let parts = Partition::all(32, 32, 4).unwrap();
        let single = {
            let p = Partition::new(32, 32, 1, 0).unwrap();
            let f = initial(&p);
            LocalUniverse::new(1)
                .unwrap()
                .run(|comm| BoundaryNorm::compute(comm, &f, &p))
                .remove(0)
                .unwrap()
        };
        let out = LocalUniverse::new(4).unwrap().run(|comm| {
            let p = &parts[comm.rank()];
            BoundaryNorm::compute(comm, &initial(p), p)
        });
        for norm in out {
            assert!((norm.unwrap().value() - single.value()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_norm_rejected() {
        let p = Partition::new(4, 4, 1, 0).unwrap();
        let f = Field::for_partition(&p);
        let out = LocalUniverse::new(1)
            .unwrap()
            .run(|comm| BoundaryNorm::compute(comm, &f, &p));
        assert!(matches!(
            out[0],
            Err(Error::Configuration {
                parameter: "boundary",
                ..
            })
        ));
    }

    #[test]
    fn test_residual_is_global() {
        let parts = Partition::all(6, 3, 2).unwrap();
        let out = LocalUniverse::new(2).unwrap().run(|comm| {
            let p = &parts[comm.rank()];
            let cur = Field::for_partition(p);
            let mut next = Field::for_partition(p);
            next[(1, 1)] = if comm.rank() == 0 { 3. } else { 4. };
            ConvergenceReducer::new(BoundaryNorm(2.)).residual(comm, &next, &cur)
        });
        for r in out {
            assert_eq!(r.unwrap(), 2.5);
        }
    }
}
