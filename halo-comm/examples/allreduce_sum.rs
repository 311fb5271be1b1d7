//! Run with
//!
//! cargo run --example allreduce_sum
use halo_comm::{CommError, Communicator, LocalUniverse, ReduceOp};

fn main() {
    let size = 6;
    let out = LocalUniverse::new(size).unwrap().run(|comm| {
        let x = comm.rank() as f64;
        let sum = comm.all_reduce_sum(x)?;
        let max = comm.all_reduce(x, ReduceOp::Max)?;
        Ok::<_, CommError>((sum, max))
    });
    let expected: f64 = (0..size).map(|r| r as f64).sum();
    for v in out {
        assert_eq!(v, Ok((expected, (size - 1) as f64)));
    }
    println!("sum = {}", expected);
}
