//! Run with
//!
//! cargo mpirun --np 4 --example mpi_ring --features mpi
use halo_comm::mpi::{initialize, MpiComm};
use halo_comm::{Communicator, Neighbor};

fn main() {
    let universe = initialize().unwrap();
    let comm = MpiComm::new(&universe);
    let rank = comm.rank();
    let next = if rank + 1 == comm.size() {
        Neighbor::Null
    } else {
        Neighbor::Rank(rank + 1)
    };
    let prev = if rank == 0 {
        Neighbor::Null
    } else {
        Neighbor::Rank(rank - 1)
    };
    let mut recv = [777i32];
    comm.send_receive(&[rank as i32], next, &mut recv, prev, 0)
        .unwrap();
    if rank == 0 {
        assert_eq!(recv[0], 777);
    } else {
        assert_eq!(recv[0], rank as i32 - 1);
    }
    let total = comm.all_reduce_sum(1.).unwrap();
    assert_eq!(total as usize, comm.size());
}
