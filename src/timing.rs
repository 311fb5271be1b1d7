//! Per-phase wall-clock accounting
//!
//! A [`TimingLedger`] is owned by whoever runs the computation and handed
//! by `&mut` to the code being timed. [`TimingLedger::summarize`] reduces
//! every phase across workers; it is collective, so all workers must have
//! recorded the same phases in the same order.
use crate::error::Result;
use halo_comm::{Communicator, ReduceOp};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Phase {
    name: &'static str,
    total: Duration,
    calls: u64,
}

/// Accumulated durations of named phases, in first-recorded order
#[derive(Debug, Clone, Default)]
pub struct TimingLedger {
    phases: Vec<Phase>,
}

/// One phase reduced over all workers, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub name: &'static str,
    pub calls: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call of `elapsed` to phase `name`
    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        match self.phases.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.total += elapsed;
                p.calls += 1;
            }
            None => self.phases.push(Phase {
                name,
                total: elapsed,
                calls: 1,
            }),
        }
    }

    /// Run `f` and charge its duration to phase `name`
    pub fn time<R, F: FnOnce() -> R>(&mut self, name: &'static str, f: F) -> R {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    /// Accumulated time of a phase
    pub fn total(&self, name: &str) -> Option<Duration> {
        self.phases.iter().find(|p| p.name == name).map(|p| p.total)
    }

    /// Number of recorded calls of a phase
    pub fn calls(&self, name: &str) -> u64 {
        self.phases
            .iter()
            .find(|p| p.name == name)
            .map_or(0, |p| p.calls)
    }

    /// Names of all recorded phases
    pub fn phases(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.phases.iter().map(|p| p.name)
    }

    /// Min, max and mean of every phase over all workers
    pub fn summarize<C: Communicator>(&self, comm: &C) -> Result<Vec<PhaseSummary>> {
        let workers = comm.size() as f64;
        let mut out = Vec::with_capacity(self.phases.len());
        for p in &self.phases {
            let secs = p.total.as_secs_f64();
            out.push(PhaseSummary {
                name: p.name,
                calls: p.calls,
                min: comm.all_reduce(secs, ReduceOp::Min)?,
                max: comm.all_reduce(secs, ReduceOp::Max)?,
                mean: comm.all_reduce_sum(secs)? / workers,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use halo_comm::LocalUniverse;

    #[test]
    fn test_record_and_time() {
        let mut ledger = TimingLedger::new();
        ledger.record("halo", Duration::from_millis(3));
        ledger.record("sweep", Duration::from_millis(5));
        ledger.record("halo", Duration::from_millis(4));
        let v = ledger.time("sweep", || 42);
        assert_eq!(v, 42);
        assert_eq!(ledger.calls("halo"), 2);
        assert_eq!(ledger.calls("sweep"), 2);
        assert_eq!(ledger.calls("residual"), 0);
        assert_eq!(ledger.total("halo"), Some(Duration::from_millis(7)));
        assert!(ledger.total("sweep").unwrap() >= Duration::from_millis(5));
        assert_eq!(ledger.phases().collect::<Vec<_>>(), vec!["halo", "sweep"]);
    }

    #[test]
    fn test_summarize_across_workers() {
        let out = LocalUniverse::new(3).unwrap().run(|comm| {
            let mut ledger = TimingLedger::new();
            ledger.record("sweep", Duration::from_secs(comm.rank() as u64 + 1));
            ledger.summarize(comm)
        });
        for s in out {
            let s = s.unwrap();
            assert_eq!(s.len(), 1);
            assert_eq!(s[0].name, "sweep");
            assert_eq!(s[0].calls, 1);
            assert_eq!(s[0].min, 1.);
            assert_eq!(s[0].max, 3.);
            assert!((s[0].mean - 2.).abs() < 1e-12);
        }
    }
}
