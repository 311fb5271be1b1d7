//! Assemble the global field on one worker
use crate::error::{Error, Result};
use crate::field::Field;
use crate::partition::Partition;
use halo_comm::functions::gather_varcount;
use halo_comm::{CommError, Communicator};
use ndarray::{s, Array2};

/// Collect the `(m + 2) x (n + 2)` global field, boundary rows and columns
/// included, on `root`. Every worker contributes its
/// [`Partition::reported_rows`]; per-worker counts are derived from the
/// decomposition, so no sizes are exchanged.
///
/// Collective. Returns `Some` on root and `None` elsewhere.
pub fn gather_field<C: Communicator>(
    comm: &C,
    partition: &Partition,
    field: &Field,
    root: usize,
) -> Result<Option<Array2<f64>>> {
    let width = partition.n + 2;
    let counts = (0..partition.size)
        .map(|r| {
            partition
                .for_rank(r)
                .map(|p| p.reported_rows().count() * width)
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = partition.reported_rows();
    let local: Vec<f64> = field
        .view()
        .slice(s![*rows.start()..=*rows.end(), ..])
        .iter()
        .copied()
        .collect();

    match gather_varcount(comm, &local, &counts, root)? {
        Some(data) => {
            let len = data.len();
            let global = Array2::from_shape_vec((partition.m + 2, width), data).map_err(|_| {
                Error::Communication(CommError::SizeMismatch {
                    expected: (partition.m + 2) * width * std::mem::size_of::<f64>(),
                    received: len * std::mem::size_of::<f64>(),
                })
            })?;
            Ok(Some(global))
        }
        None => Ok(None),
    }
}
