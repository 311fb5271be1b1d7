//! Jacobi iteration loop and its termination state machine
//!
//! ```text
//! Initializing -> Iterating -> Converged
//!                           \-> IterationBudgetExhausted
//! ```
//!
//! One iteration is: stencil sweep into the next buffer, halo exchange of
//! the next buffer, buffer swap, and (when error checking is enabled, or on
//! the last iteration) the residual all-reduce. All workers take the same
//! decision from the same reduced residual, so they stop together.
use crate::boundary::BoundaryInitializer;
use crate::config::RunConfig;
use crate::convergence::{BoundaryNorm, ConvergenceReducer};
use crate::error::Result;
use crate::field::Field;
use crate::gather::gather_field;
use crate::halo::HaloExchanger;
use crate::partition::Partition;
use crate::stencil::StencilKernel;
use crate::timing::TimingLedger;
use halo_comm::Communicator;
use ndarray::Array2;
use std::time::{Duration, Instant};

/// Phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// Fields allocated, boundary stamped, norm known; no sweep yet
    Initializing,
    /// At least one sweep done, not terminated
    Iterating,
    /// Residual dropped below the tolerance
    Converged,
    /// Iteration budget used up
    IterationBudgetExhausted,
}

impl SolverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SolverState::Converged | SolverState::IterationBudgetExhausted
        )
    }
}

/// Mutable progress of a run
#[derive(Debug, Clone, PartialEq)]
pub struct IterationState {
    /// Completed iterations
    pub iteration: usize,
    /// Last computed residual
    pub residual: Option<f64>,
    pub converged: bool,
    /// `<= 0` disables early stopping
    pub tolerance: f64,
    /// Maximum number of iterations
    pub budget: usize,
}

impl IterationState {
    fn new(tolerance: f64, budget: usize) -> Self {
        Self {
            iteration: 0,
            residual: None,
            converged: false,
            tolerance,
            budget,
        }
    }

    pub fn checks_error(&self) -> bool {
        self.tolerance > 0.
    }
}

/// Result of a finished run on one worker
#[derive(Debug, Clone)]
pub struct Outcome {
    /// `Converged` or `IterationBudgetExhausted`
    pub state: SolverState,
    /// Iterations performed
    pub iterations: usize,
    /// Residual of the last iteration, if it was computed
    pub residual: Option<f64>,
    /// Final iterate of the owned rows
    pub field: Field,
    pub partition: Partition,
    /// Wall-clock time of the iteration loop
    pub elapsed: Duration,
    pub timings: TimingLedger,
}

impl Outcome {
    /// Seconds per iteration
    pub fn time_per_iteration(&self) -> f64 {
        self.elapsed.as_secs_f64() / self.iterations.max(1) as f64
    }

    /// Collect the global field on `root` (collective)
    pub fn gather<C: Communicator>(&self, comm: &C, root: usize) -> Result<Option<Array2<f64>>> {
        gather_field(comm, &self.partition, &self.field, root)
    }
}

/// Distributed Jacobi solver of one worker
pub struct Solver<'c, C: Communicator> {
    comm: &'c C,
    partition: Partition,
    cur: Field,
    next: Field,
    kernel: StencilKernel,
    exchanger: HaloExchanger,
    reducer: ConvergenceReducer,
    iteration: IterationState,
    state: SolverState,
    print_interval: usize,
    timings: TimingLedger,
}

impl<'c, C: Communicator> Solver<'c, C> {
    /// Partition the grid, allocate both buffers, stamp the boundary and
    /// compute the boundary norm.
    ///
    /// # Errors
    /// `Configuration` for invalid parameters, partitions or geometry, and
    /// for an all-zero boundary. `Communication` if the norm reduction fails.
    pub fn new(comm: &'c C, config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let grid = config.grid()?;
        let partition = Partition::new(grid.m, grid.n, comm.size(), comm.rank())?;
        let initializer = BoundaryInitializer::new(grid)?;

        let mut cur = Field::for_partition(&partition);
        initializer.apply(&mut cur, &partition)?;
        let next = cur.clone();
        let norm = BoundaryNorm::compute(comm, &cur, &partition)?;

        if comm.rank() == 0 {
            log::info!(
                "Running CFD on {} x {} grid with {} worker(s), scale factor {}",
                grid.m,
                grid.n,
                comm.size(),
                config.scale_factor
            );
            if config.checks_error() {
                log::info!(
                    "iterations = {}, tolerance = {}",
                    config.iterations,
                    config.tolerance
                );
            } else {
                log::info!("iterations = {}", config.iterations);
            }
        }
        log::debug!(
            "rank {} owns rows {}..={} ({:?} / {:?}), boundary norm {}",
            partition.rank,
            partition.row_lo,
            partition.row_hi,
            partition.predecessor,
            partition.successor,
            norm.value()
        );

        Ok(Self {
            comm,
            exchanger: HaloExchanger::new(config.exchange, partition.n),
            partition,
            cur,
            next,
            kernel: StencilKernel::new(config.sweep),
            reducer: ConvergenceReducer::new(norm),
            iteration: IterationState::new(config.tolerance, config.iterations),
            state: SolverState::Initializing,
            print_interval: config.print_interval,
            timings: TimingLedger::new(),
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn iteration_state(&self) -> &IterationState {
        &self.iteration
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Current iterate
    pub fn field(&self) -> &Field {
        &self.cur
    }

    pub fn boundary_norm(&self) -> BoundaryNorm {
        self.reducer.norm()
    }

    /// Perform one iteration and return the new state. Does nothing once
    /// the run has terminated.
    pub fn step(&mut self) -> Result<SolverState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        self.state = SolverState::Iterating;

        let comm = self.comm;
        let partition = &self.partition;
        let kernel = &self.kernel;
        let exchanger = &mut self.exchanger;
        let reducer = &self.reducer;
        let timings = &mut self.timings;
        let cur = &mut self.cur;
        let next = &mut self.next;

        timings.time("sweep", || kernel.apply(cur, next));
        timings.time("halo", || exchanger.exchange(comm, partition, next))?;
        std::mem::swap(cur, next);

        let it = &mut self.iteration;
        it.iteration += 1;
        let last = it.iteration >= it.budget;
        if it.checks_error() || last {
            // cur holds the new iterate, next the previous one
            let residual = timings.time("residual", || reducer.residual(comm, cur, next))?;
            it.residual = Some(residual);
        }

        if it.checks_error() && it.residual.map_or(false, |r| r < it.tolerance) {
            it.converged = true;
            self.state = SolverState::Converged;
            if comm.rank() == 0 {
                log::info!("Converged on iteration {}", it.iteration);
            }
        } else if last {
            self.state = SolverState::IterationBudgetExhausted;
        }

        if it.iteration % self.print_interval == 0 && comm.rank() == 0 {
            match it.residual {
                Some(r) if it.checks_error() => {
                    log::info!("Completed iteration {}, error = {:e}", it.iteration, r)
                }
                _ => log::info!("Completed iteration {}", it.iteration),
            }
        }
        Ok(self.state)
    }

    /// Iterate until convergence or until the budget is exhausted
    pub fn run(mut self) -> Result<Outcome> {
        let start = Instant::now();
        while !self.state.is_terminal() {
            self.step()?;
        }
        let elapsed = start.elapsed();
        let outcome = Outcome {
            state: self.state,
            iterations: self.iteration.iteration,
            residual: self.iteration.residual,
            field: self.cur,
            partition: self.partition,
            elapsed,
            timings: self.timings,
        };
        if self.comm.rank() == 0 {
            log::info!(
                "After {} iterations, the error is {:e}",
                outcome.iterations,
                outcome.residual.unwrap_or(f64::NAN)
            );
            log::info!(
                "Time for {} iterations was {:.6} seconds ({:.3e} s per iteration)",
                outcome.iterations,
                elapsed.as_secs_f64(),
                outcome.time_per_iteration()
            );
        }
        Ok(outcome)
    }
}
