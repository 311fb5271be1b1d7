//! Run with
//!
//! cargo run --example ring_sendrecv
//!
//! Shift a value one rank down an open chain. The first worker receives
//! from nobody and the last sends to nobody.
use halo_comm::{CommError, Communicator, LocalUniverse, Neighbor};

fn main() {
    let universe = LocalUniverse::new(4).unwrap();
    let traffic = universe.traffic();
    let out = universe.run(|comm| {
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
        comm.send_receive(&[rank as i32], next, &mut recv, prev, 0)?;
        Ok::<_, CommError>(recv[0])
    });
    for (rank, v) in out.iter().enumerate() {
        println!("rank {} received {:?}", rank, v);
    }
    assert_eq!(out[0], Ok(777));
    assert_eq!(traffic.point_to_point().len(), 3);
}
