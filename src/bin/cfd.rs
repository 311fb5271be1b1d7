//! Cavity flow solver.
//!
//! ```sh
//! cfd 2 5000                           # scale factor 2, 5000 iterations
//! cfd 1 10000 --tolerance 1e-4 -n 4    # four in-process workers
//! cfd --config run.toml
//! mpirun -np 4 cfd 4 2000 --mpi        # with --features mpi
//! ```
//!
//! Progress goes through `log`; set `RUST_LOG=debug` for per-worker detail.
use anyhow::{anyhow, Context};
use clap::Parser;
use halo_comm::{CommError, Communicator, LocalUniverse};
use jacobi_cfd::{Error, ExchangeMode, RunConfig, Solver, Sweep};
use ndarray::s;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfd")]
#[command(about = "Jacobi relaxation of the cavity stream function")]
#[command(version)]
struct Cli {
    /// Grid scale factor (overrides the configuration file).
    scale: Option<usize>,
    /// Number of iterations (overrides the configuration file).
    iterations: Option<usize>,
    /// Stop once the residual drops below this value; <= 0 runs every iteration.
    #[arg(short, long, allow_negative_numbers = true)]
    tolerance: Option<f64>,
    /// Number of in-process workers.
    #[arg(short = 'n', long)]
    workers: Option<usize>,
    /// Iterations between progress reports.
    #[arg(short, long)]
    print_interval: Option<usize>,
    /// Halo exchange strategy.
    #[arg(long, value_enum)]
    exchange: Option<ExchangeMode>,
    /// Interior sweep execution.
    #[arg(long, value_enum)]
    sweep: Option<Sweep>,
    /// TOML run configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Run on MPI_COMM_WORLD instead of in-process workers.
    #[cfg(feature = "mpi")]
    #[arg(long)]
    mpi: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => {
                if self.scale.is_none() || self.iterations.is_none() {
                    return Err(anyhow!(
                        "usage: cfd <scale> <iterations>, or pass --config <file>"
                    ));
                }
                RunConfig::default()
            }
        };
        if let Some(v) = self.scale {
            config.scale_factor = v;
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.tolerance {
            config.tolerance = v;
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if let Some(v) = self.print_interval {
            config.print_interval = v;
        }
        if let Some(v) = self.exchange {
            config.exchange = v;
        }
        if let Some(v) = self.sweep {
            config.sweep = v;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Solve, then report the global checksum and timing summary on rank 0
fn run_worker<C: Communicator>(comm: &C, config: &RunConfig) -> jacobi_cfd::Result<()> {
    let outcome = Solver::new(comm, config)?.run()?;
    let global = outcome.gather(comm, 0)?;
    let summary = outcome.timings.summarize(comm)?;

    if let Some(psi) = global {
        let (m, n) = (outcome.partition.m, outcome.partition.n);
        let checksum: f64 = psi.slice(s![1..=m, 1..=n]).sum();
        log::info!("Stream function checksum over the interior: {:e}", checksum);
        for phase in summary {
            log::info!(
                "{:>9}: {:>8} calls, min {:.6} s, max {:.6} s, mean {:.6} s",
                phase.name,
                phase.calls,
                phase.min,
                phase.max,
                phase.mean
            );
        }
    }
    Ok(())
}

fn run_local(config: &RunConfig) -> anyhow::Result<()> {
    let results = LocalUniverse::new(config.workers)?.run(|comm| run_worker(comm, config));
    // Report the error that caused the abort, not the workers it took down
    let mut errors: Vec<Error> = results.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        return Ok(());
    }
    let cause = errors
        .iter()
        .position(|e| !matches!(e, Error::Communication(CommError::Aborted)))
        .unwrap_or(0);
    Err(errors.swap_remove(cause).into())
}

#[cfg(feature = "mpi")]
fn run_mpi(config: &RunConfig) -> anyhow::Result<()> {
    use jacobi_cfd::mpi::{initialize, MpiComm};

    let universe = initialize().ok_or_else(|| anyhow!("MPI is already initialized"))?;
    let comm = MpiComm::new(&universe);
    if config.workers != 1 && config.workers != comm.size() && comm.rank() == 0 {
        log::warn!(
            "ignoring workers = {}, running on {} MPI processes",
            config.workers,
            comm.size()
        );
    }
    if let Err(err) = run_worker(&comm, config) {
        log::error!("rank {}: {}", comm.rank(), err);
        comm.abort(1);
        return Err(err.into());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.run_config()?;

    #[cfg(feature = "mpi")]
    if cli.mpi {
        return run_mpi(&config);
    }
    run_local(&config)
}
