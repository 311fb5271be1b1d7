//! In-process worker group: one thread per rank, channels for messages.
//!
//! Every worker owns an inbox. Messages are matched on `(source, tag)` in
//! arrival order; anything that arrives early is parked until asked for.
//! Sends never block, so the paired and non-blocking exchanges are both
//! deadlock-free. Waiting receivers poll a shared abort flag, which is how
//! a failing worker takes the whole group down with it.
use crate::comm::{Communicator, Neighbor, RecvOp, ReduceOp, SendOp, Tag};
use crate::error::{CommError, Result};
use crate::wire::{decode_into, encode_slice, Wire};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tag used internally by collectives
const COLLECTIVE_TAG: Tag = -1;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Envelope {
    source: usize,
    tag: Tag,
    payload: Vec<u8>,
}

/// One delivered message, as seen by the traffic log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRecord {
    /// Sending rank
    pub source: usize,
    /// Receiving rank
    pub dest: usize,
    /// Message tag; negative for collectives
    pub tag: Tag,
    /// Encoded payload length
    pub bytes: usize,
}

/// Record of every message posted within a [`LocalUniverse`]
#[derive(Debug, Default)]
pub struct TrafficLog {
    records: Mutex<Vec<MessageRecord>>,
}

impl TrafficLog {
    fn record(&self, rec: MessageRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(rec);
    }

    /// All messages, collectives included
    pub fn messages(&self) -> Vec<MessageRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Messages with user tags only
    pub fn point_to_point(&self) -> Vec<MessageRecord> {
        self.messages().into_iter().filter(|m| m.tag >= 0).collect()
    }
}

/// Endpoint of one worker in a [`LocalUniverse`]
pub struct LocalComm {
    rank: usize,
    size: usize,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    pending: RefCell<Vec<Envelope>>,
    aborted: Arc<AtomicBool>,
    traffic: Arc<TrafficLog>,
}

impl LocalComm {
    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank < self.size {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size,
            })
        }
    }

    fn post(&self, payload: Vec<u8>, dest: usize, tag: Tag) -> Result<()> {
        self.check_rank(dest)?;
        if self.aborted.load(Ordering::SeqCst) {
            return Err(CommError::Aborted);
        }
        let bytes = payload.len();
        self.outboxes[dest]
            .send(Envelope {
                source: self.rank,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected)?;
        self.traffic.record(MessageRecord {
            source: self.rank,
            dest,
            tag,
            bytes,
        });
        Ok(())
    }

    fn take(&self, source: usize, tag: Tag) -> Result<Vec<u8>> {
        self.check_rank(source)?;
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(pos) = pending
                .iter()
                .position(|e| e.source == source && e.tag == tag)
            {
                return Ok(pending.remove(pos).payload);
            }
        }
        loop {
            if self.aborted.load(Ordering::SeqCst) {
                return Err(CommError::Aborted);
            }
            match self.inbox.recv_timeout(POLL_INTERVAL) {
                Ok(env) if env.source == source && env.tag == tag => return Ok(env.payload),
                Ok(env) => self.pending.borrow_mut().push(env),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(CommError::Disconnected),
            }
        }
    }

    fn user_tag(tag: Tag) -> Result<Tag> {
        if tag < 0 {
            Err(CommError::InvalidTag(tag))
        } else {
            Ok(tag)
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send<T: Wire>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()> {
        let tag = Self::user_tag(tag)?;
        self.post(encode_slice(data), dest, tag)
    }

    fn receive_into<T: Wire>(&self, buf: &mut [T], source: usize, tag: Tag) -> Result<()> {
        let tag = Self::user_tag(tag)?;
        let bytes = self.take(source, tag)?;
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
        if let Neighbor::Rank(d) = dest {
            self.send(send, d, tag)?;
        }
        if let Neighbor::Rank(s) = source {
            self.receive_into(recv, s, tag)?;
        }
        Ok(())
    }

    fn exchange<T: Wire>(
        &self,
        sends: &[SendOp<'_, T>],
        recvs: &mut [RecvOp<'_, T>],
    ) -> Result<()> {
        for op in sends {
            if let Neighbor::Rank(d) = op.dest {
                self.send(op.data, d, op.tag)?;
            }
        }
        for op in recvs.iter_mut() {
            if let Neighbor::Rank(s) = op.source {
                self.receive_into(op.buf, s, op.tag)?;
            }
        }
        Ok(())
    }

    fn all_reduce(&self, value: f64, op: ReduceOp) -> Result<f64> {
        for dest in (0..self.size).filter(|&r| r != self.rank) {
            self.post(encode_slice(&[value]), dest, COLLECTIVE_TAG)?;
        }
        // Fold in rank order so every worker computes a bitwise identical result
        let mut contributions = Vec::with_capacity(self.size);
        for source in 0..self.size {
            if source == self.rank {
                contributions.push(value);
            } else {
                let mut v = [0f64];
                decode_into(&self.take(source, COLLECTIVE_TAG)?, &mut v)?;
                contributions.push(v[0]);
            }
        }
        Ok(op.fold(contributions))
    }

    fn barrier(&self) -> Result<()> {
        self.all_reduce(0., ReduceOp::Sum).map(|_| ())
    }

    fn abort(&self, code: i32) {
        log::warn!("rank {} aborting worker group (code {})", self.rank, code);
        self.aborted.store(true, Ordering::SeqCst);
    }
}

/// Sets the abort flag if the owning worker thread unwinds
struct AbortOnUnwind(Arc<AtomicBool>);

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

/// A group of in-process workers
pub struct LocalUniverse {
    comms: Vec<LocalComm>,
    traffic: Arc<TrafficLog>,
}

impl LocalUniverse {
    /// Create a group of `size` connected endpoints
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CommError::InvalidSize(size));
        }
        let aborted = Arc::new(AtomicBool::new(false));
        let traffic = Arc::new(TrafficLog::default());
        let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        let comms = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                size,
                outboxes: outboxes.clone(),
                inbox,
                pending: RefCell::new(Vec::new()),
                aborted: Arc::clone(&aborted),
                traffic: Arc::clone(&traffic),
            })
            .collect();
        Ok(Self { comms, traffic })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.comms.len()
    }

    /// Shared handle to the message log of this group
    pub fn traffic(&self) -> Arc<TrafficLog> {
        Arc::clone(&self.traffic)
    }

    /// Run `f` once per worker, each on its own thread, and collect the
    /// results in rank order.
    ///
    /// A worker that returns an error (or panics) aborts the group, so the
    /// others fail with [`CommError::Aborted`] instead of waiting forever.
    pub fn run<F, R, E>(self, f: F) -> Vec<std::result::Result<R, E>>
    where
        F: Fn(&LocalComm) -> std::result::Result<R, E> + Sync,
        R: Send,
        E: Send,
    {
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .comms
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let _guard = AbortOnUnwind(Arc::clone(&comm.aborted));
                        let out = f(&comm);
                        if out.is_err() {
                            comm.abort(1);
                        }
                        out
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(out) => out,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    fn neighbours(comm: &LocalComm) -> (Neighbor, Neighbor) {
        let prev = if comm.rank() == 0 {
            Neighbor::Null
        } else {
            Neighbor::Rank(comm.rank() - 1)
        };
        let next = if comm.rank() + 1 == comm.size() {
            Neighbor::Null
        } else {
            Neighbor::Rank(comm.rank() + 1)
        };
        (prev, next)
    }

    #[test]
    fn test_empty_universe() {
        assert_eq!(
            LocalUniverse::new(0).err(),
            Some(CommError::InvalidSize(0))
        );
    }

    #[test]
    fn test_shift_with_null_edges() {
        let universe = LocalUniverse::new(4).unwrap();
        let traffic = universe.traffic();
        let received = universe.run(|comm| {
            let (prev, next) = neighbours(comm);
            let send = [comm.rank() as i32; 3];
            let mut recv = [777i32; 3];
            comm.send_receive(&send, next, &mut recv, prev, 0)?;
            Ok::<_, CommError>(recv)
        });
        assert_eq!(received[0].as_ref().unwrap(), &[777; 3]);
        for r in 1..4 {
            assert_eq!(received[r].as_ref().unwrap(), &[r as i32 - 1; 3]);
        }
        let msgs = traffic.point_to_point();
        assert_eq!(msgs.len(), 3);
        assert!(msgs.iter().all(|m| m.dest == m.source + 1));
    }

    #[test]
    fn test_all_reduce_identical() {
        let universe = LocalUniverse::new(5).unwrap();
        let out = universe.run(|comm| {
            let x = 0.1 * (comm.rank() as f64 + 1.);
            let sum = comm.all_reduce_sum(x)?;
            let max = comm.all_reduce(x, ReduceOp::Max)?;
            let min = comm.all_reduce(x, ReduceOp::Min)?;
            Ok::<_, CommError>((sum, max, min))
        });
        let first = *out[0].as_ref().unwrap();
        for o in &out {
            let o = *o.as_ref().unwrap();
            assert_eq!(o.0.to_bits(), first.0.to_bits());
            assert_eq!(o.1, 0.5);
            assert_eq!(o.2, 0.1);
        }
        assert!((first.0 - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_nonblocking_exchange() {
        let universe = LocalUniverse::new(3).unwrap();
        let out = universe.run(|comm| {
            let (prev, next) = neighbours(comm);
            let up = [comm.rank() as f64; 2];
            let down = [10. * comm.rank() as f64; 2];
            let mut from_prev = [-1.; 2];
            let mut from_next = [-1.; 2];
            let sends = [
                SendOp { dest: next, data: &down[..], tag: 1 },
                SendOp { dest: prev, data: &up[..], tag: 2 },
            ];
            let mut recvs = [
                RecvOp { source: prev, buf: &mut from_prev[..], tag: 1 },
                RecvOp { source: next, buf: &mut from_next[..], tag: 2 },
            ];
            comm.exchange(&sends, &mut recvs)?;
            Ok::<_, CommError>((from_prev, from_next))
        });
        assert_eq!(out[0].as_ref().unwrap(), &([-1.; 2], [1.; 2]));
        assert_eq!(out[1].as_ref().unwrap(), &([0.; 2], [2.; 2]));
        assert_eq!(out[2].as_ref().unwrap(), &([10.; 2], [-1.; 2]));
    }

    #[test]
    fn test_out_of_order_tags() {
        let universe = LocalUniverse::new(2).unwrap();
        let out = universe.run(|comm| {
            if comm.rank() == 0 {
                comm.send(&[1u64], 1, 5)?;
                comm.send(&[2u64], 1, 6)?;
                Ok::<_, CommError>(0)
            } else {
                let mut a = [0u64];
                let mut b = [0u64];
                comm.receive_into(&mut b, 0, 6)?;
                comm.receive_into(&mut a, 0, 5)?;
                Ok(a[0] * 10 + b[0])
            }
        });
        assert_eq!(out[1], Ok(12));
    }

    #[test]
    fn test_invalid_rank_and_tag() {
        let universe = LocalUniverse::new(2).unwrap();
        let out = universe.run(|comm| {
            assert_eq!(
                comm.send(&[1.0f64], 2, 0),
                Err(CommError::InvalidRank { rank: 2, size: 2 })
            );
            assert_eq!(comm.send(&[1.0f64], 0, -3), Err(CommError::InvalidTag(-3)));
            comm.barrier()
        });
        assert!(out.iter().all(|o| o.is_ok()));
    }

    #[test]
    fn test_failure_aborts_group() {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let universe = LocalUniverse::new(3).unwrap();
            let out = universe.run(|comm| {
                if comm.rank() == 1 {
                    return Err(CommError::Disconnected);
                }
                // Would wait forever without the abort flag
                comm.barrier()
            });
            let _ = tx.send(out);
        });
        let start = Instant::now();
        let out = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(out[0], Err(CommError::Aborted));
        assert_eq!(out[1], Err(CommError::Disconnected));
        assert_eq!(out[2], Err(CommError::Aborted));
    }
}
