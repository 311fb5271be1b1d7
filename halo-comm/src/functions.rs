//! Collection of simplified collective routines built on point-to-point
//! transfers
use crate::comm::{Communicator, Tag};
use crate::error::{CommError, Result};
use crate::wire::Wire;

const GATHER_TAG: Tag = 9_001;

/// Gather variable-length contributions on `root`, concatenated in rank
/// order. `counts[r]` is the number of values worker `r` contributes.
///
/// Returns `Some` on root and `None` everywhere else.
pub fn gather_varcount<C, T>(
    comm: &C,
    local: &[T],
    counts: &[usize],
    root: usize,
) -> Result<Option<Vec<T>>>
where
    C: Communicator,
    T: Wire + Default,
{
    if counts.len() != comm.size() {
        return Err(CommError::InvalidSize(counts.len()));
    }
    if root >= comm.size() {
        return Err(CommError::InvalidRank {
            rank: root,
            size: comm.size(),
        });
    }
    if local.len() != counts[comm.rank()] {
        return Err(CommError::SizeMismatch {
            expected: counts[comm.rank()] * T::SIZE,
            received: local.len() * T::SIZE,
        });
    }
    if comm.rank() != root {
        comm.send(local, root, GATHER_TAG)?;
        return Ok(None);
    }
    let mut out = vec![T::default(); counts.iter().sum()];
    let mut offset = 0;
    for (rank, &count) in counts.iter().enumerate() {
        let chunk = &mut out[offset..offset + count];
        if rank == root {
            chunk.copy_from_slice(local);
        } else {
            comm.receive_into(chunk, rank, GATHER_TAG)?;
        }
        offset += count;
    }
    Ok(Some(out))
}
