//! Feature: MPI worker group built on rsmpi
//!
//! Payloads travel as `u8` buffers encoded through [`Wire`], so one code
//! path serves every value type. rsmpi aborts the job on MPI errors
//! (`MPI_ERRORS_ARE_FATAL`), hence the only error produced here is a
//! message-length mismatch.
#![cfg(feature = "mpi")]
use crate::comm::{Communicator, Neighbor, RecvOp, ReduceOp, SendOp, Tag};
use crate::error::{CommError, Result};
use crate::wire::{decode_into, encode_slice, Wire};
pub use mpi::environment::Universe;
pub use mpi::initialize;
use mpi::collective::SystemOperation;
use mpi::point_to_point::send_receive_into_with_tags;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{
    Communicator as _, CommunicatorCollectives, Destination, Equivalence, Source,
};

/// Worker group spanning `MPI_COMM_WORLD`
pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    /// Wrap the world communicator of an initialized universe
    pub fn new(universe: &Universe) -> Self {
        Self {
            world: universe.world(),
        }
    }

    fn check_rank(&self, rank: usize) -> Result<i32> {
        if rank < self.size() {
            Ok(rank as i32)
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }

    fn check_count(expected: usize, status: &mpi::point_to_point::Status) -> Result<()> {
        let received = status.count(u8::equivalent_datatype()) as usize;
        if received == expected {
            Ok(())
        } else {
            Err(CommError::SizeMismatch { expected, received })
        }
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send<T: Wire>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()> {
        let dest = self.check_rank(dest)?;
        let bytes = encode_slice(data);
        self.world
            .process_at_rank(dest)
            .send_with_tag(&bytes[..], tag);
        Ok(())
    }

    fn receive_into<T: Wire>(&self, buf: &mut [T], source: usize, tag: Tag) -> Result<()> {
        let source = self.check_rank(source)?;
        let mut bytes = vec![0u8; buf.len() * T::SIZE];
        let status = self
            .world
            .process_at_rank(source)
            .receive_into_with_tag(&mut bytes[..], tag);
        Self::check_count(bytes.len(), &status)?;
        decode_into(&bytes, buf)
    }

    fn send_receive<T: Wire>(
        &self,
        send: &[T],
        dest: Neighbor,
        recv: &mut [T],
        source: Neighbor,
        tag: Tag,
    ) -> Result<()> {
        match (dest, source) {
            (Neighbor::Rank(d), Neighbor::Rank(s)) => {
                let d = self.check_rank(d)?;
                let s = self.check_rank(s)?;
                let sbytes = encode_slice(send);
                let mut rbytes = vec![0u8; recv.len() * T::SIZE];
                let status = send_receive_into_with_tags(
                    &sbytes[..],
                    &self.world.process_at_rank(d),
                    tag,
                    &mut rbytes[..],
                    &self.world.process_at_rank(s),
                    tag,
                );
                Self::check_count(rbytes.len(), &status)?;
                decode_into(&rbytes, recv)
            }
            (Neighbor::Rank(d), Neighbor::Null) => self.send(send, d, tag),
            (Neighbor::Null, Neighbor::Rank(s)) => self.receive_into(recv, s, tag),
            (Neighbor::Null, Neighbor::Null) => Ok(()),
        }
    }

    fn exchange<T: Wire>(
        &self,
        sends: &[SendOp<'_, T>],
        recvs: &mut [RecvOp<'_, T>],
    ) -> Result<()> {
        let mut outgoing = Vec::with_capacity(sends.len());
        for op in sends {
            if let Neighbor::Rank(d) = op.dest {
                outgoing.push((self.check_rank(d)?, op.tag, encode_slice(op.data)));
            }
        }
        let mut incoming = Vec::with_capacity(recvs.len());
        for (k, op) in recvs.iter().enumerate() {
            if let Neighbor::Rank(s) = op.source {
                let len = op.buf.len() * T::SIZE;
                incoming.push((k, self.check_rank(s)?, op.tag, vec![0u8; len]));
            }
        }

        let statuses = mpi::request::scope(|scope| {
            let mut recv_reqs = Vec::with_capacity(incoming.len());
            for (_, source, tag, bytes) in incoming.iter_mut() {
                recv_reqs.push(
                    self.world
                        .process_at_rank(*source)
                        .immediate_receive_into_with_tag(scope, &mut bytes[..], *tag),
                );
            }
            let mut send_reqs = Vec::with_capacity(outgoing.len());
            for (dest, tag, bytes) in outgoing.iter() {
                send_reqs.push(
                    self.world
                        .process_at_rank(*dest)
                        .immediate_send_with_tag(scope, &bytes[..], *tag),
                );
            }
            let statuses: Vec<_> = recv_reqs.into_iter().map(|r| r.wait()).collect();
            for r in send_reqs {
                r.wait();
            }
            statuses
        });

        for ((k, _, _, bytes), status) in incoming.iter().zip(statuses.iter()) {
            Self::check_count(bytes.len(), status)?;
            decode_into(bytes, &mut *recvs[*k].buf)?;
        }
        Ok(())
    }

    fn all_reduce(&self, value: f64, op: ReduceOp) -> Result<f64> {
        let mut out = 0f64;
        let op = match op {
            ReduceOp::Sum => SystemOperation::sum(),
            ReduceOp::Max => SystemOperation::max(),
            ReduceOp::Min => SystemOperation::min(),
        };
        self.world.all_reduce_into(&value, &mut out, op);
        Ok(out)
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn abort(&self, code: i32) {
        log::warn!("rank {} calling MPI_Abort (code {})", self.rank(), code);
        self.world.abort(code)
    }
}
