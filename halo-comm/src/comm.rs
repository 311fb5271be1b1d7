//! The communicator interface consumed by decomposed solvers.
use crate::error::Result;
use crate::wire::Wire;

/// Message tag. User tags must be non-negative.
pub type Tag = i32;

/// A row-neighbour: either a concrete rank or nothing.
///
/// Transfers addressed to [`Neighbor::Null`] complete immediately without
/// moving any data, so edge workers can run the same exchange code as
/// interior ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Neighbor {
    /// Worker with this rank
    Rank(usize),
    /// No worker on this side (domain edge)
    Null,
}

impl Neighbor {
    /// Rank, or `None` for the null neighbour
    pub fn rank(self) -> Option<usize> {
        match self {
            Neighbor::Rank(r) => Some(r),
            Neighbor::Null => None,
        }
    }

    /// True at a domain edge
    pub fn is_null(self) -> bool {
        self == Neighbor::Null
    }
}

/// Reduction operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of values
    Sum,
    /// Maximum value
    Max,
    /// Minimum value
    Min,
}

impl ReduceOp {
    /// Fold a sequence of contributions, in the given order
    pub fn fold<I: IntoIterator<Item = f64>>(self, values: I) -> f64 {
        let mut it = values.into_iter();
        let first = match it.next() {
            Some(v) => v,
            None => return 0.,
        };
        it.fold(first, |acc, v| match self {
            ReduceOp::Sum => acc + v,
            ReduceOp::Max => acc.max(v),
            ReduceOp::Min => acc.min(v),
        })
    }
}

/// Outgoing half of a non-blocking exchange
pub struct SendOp<'a, T> {
    /// Receiving worker; [`Neighbor::Null`] skips the send
    pub dest: Neighbor,
    /// Payload
    pub data: &'a [T],
    /// Message tag
    pub tag: Tag,
}

/// Incoming half of a non-blocking exchange
pub struct RecvOp<'a, T> {
    /// Sending worker; [`Neighbor::Null`] leaves `buf` untouched
    pub source: Neighbor,
    /// Destination, sized to the expected message
    pub buf: &'a mut [T],
    /// Message tag
    pub tag: Tag,
}

/// Identity, point-to-point and collective operations of a worker group.
///
/// All collectives must be entered by every worker of the group in the same
/// order. Any error is fatal for the whole group.
pub trait Communicator {
    /// Rank of the calling worker
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    /// Blocking send of `data` to `dest`
    fn send<T: Wire>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()>;

    /// Blocking receive from `source`; `buf` must match the message length
    fn receive_into<T: Wire>(&self, buf: &mut [T], source: usize, tag: Tag) -> Result<()>;

    /// Send `send` to `dest` while receiving into `recv` from `source`.
    ///
    /// Deadlock-free for shift patterns where every worker sends one way and
    /// receives from the other. Null neighbours skip their half.
    fn send_receive<T: Wire>(
        &self,
        send: &[T],
        dest: Neighbor,
        recv: &mut [T],
        source: Neighbor,
        tag: Tag,
    ) -> Result<()>;

    /// Post all sends and receives without blocking, then wait for all.
    /// Null neighbours are skipped.
    fn exchange<T: Wire>(&self, sends: &[SendOp<'_, T>], recvs: &mut [RecvOp<'_, T>])
        -> Result<()>;

    /// Combine one value from every worker; all workers get the same result
    fn all_reduce(&self, value: f64, op: ReduceOp) -> Result<f64>;

    /// Sum all-reduce
    fn all_reduce_sum(&self, value: f64) -> Result<f64> {
        self.all_reduce(value, ReduceOp::Sum)
    }

    /// Block until every worker has entered the barrier
    fn barrier(&self) -> Result<()>;

    /// Terminate the whole computation after a fatal error
    fn abort(&self, code: i32);
}
