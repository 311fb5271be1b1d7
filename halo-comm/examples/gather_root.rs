//! Run with
//!
//! cargo run --example gather_root
use halo_comm::functions::gather_varcount;
use halo_comm::{Communicator, LocalUniverse};

fn main() {
    let counts = [2, 3, 1];
    let out = LocalUniverse::new(counts.len()).unwrap().run(|comm| {
        let local = vec![comm.rank() as f64; counts[comm.rank()]];
        gather_varcount(comm, &local, &counts, 0)
    });
    let gathered = out[0].clone().unwrap().unwrap();
    assert_eq!(gathered, vec![0., 0., 1., 1., 1., 2.]);
    println!("root gathered {:?}", gathered);
}
