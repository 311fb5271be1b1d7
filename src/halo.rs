//! Halo exchange between row-neighbours
//!
//! After each sweep, a worker sends its first owned row to its predecessor
//! and its last owned row to its successor, and receives the matching rows
//! into its top and bottom halo. Only the interior columns travel; the
//! boundary columns of a halo row never change. At the domain edges the
//! neighbour is [`Neighbor::Null`] and that side is skipped, leaving the
//! boundary values in place.
use crate::error::Result;
use crate::field::{Field, Side};
use crate::partition::Partition;
use clap::ValueEnum;
use enum_dispatch::enum_dispatch;
use halo_comm::{Communicator, Neighbor, RecvOp, SendOp, Tag};
use serde::Deserialize;

/// Rows moving towards the successor
const TAG_DOWN: Tag = 10;
/// Rows moving towards the predecessor
const TAG_UP: Tag = 11;

/// Send and receive rows of one exchange
#[derive(Debug, Clone)]
pub struct HaloBuffers {
    first_row: Vec<f64>,
    last_row: Vec<f64>,
    from_pred: Vec<f64>,
    from_succ: Vec<f64>,
}

impl HaloBuffers {
    fn new(cols: usize) -> Self {
        Self {
            first_row: vec![0.; cols],
            last_row: vec![0.; cols],
            from_pred: vec![0.; cols],
            from_succ: vec![0.; cols],
        }
    }
}

/// Moves the packed rows between neighbours
#[enum_dispatch]
pub trait HaloStrategy {
    /// Send `first_row`/`last_row` and fill `from_pred`/`from_succ`
    fn transfer<C: Communicator>(
        &self,
        comm: &C,
        predecessor: Neighbor,
        successor: Neighbor,
        bufs: &mut HaloBuffers,
    ) -> halo_comm::Result<()>;
}

/// Two paired send-and-receive shifts, one per direction
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedExchange;

impl HaloStrategy for PairedExchange {
    fn transfer<C: Communicator>(
        &self,
        comm: &C,
        predecessor: Neighbor,
        successor: Neighbor,
        bufs: &mut HaloBuffers,
    ) -> halo_comm::Result<()> {
        comm.send_receive(
            &bufs.last_row,
            successor,
            &mut bufs.from_pred,
            predecessor,
            TAG_DOWN,
        )?;
        comm.send_receive(
            &bufs.first_row,
            predecessor,
            &mut bufs.from_succ,
            successor,
            TAG_UP,
        )
    }
}

/// All sends and receives posted at once, then waited on together
#[derive(Debug, Clone, Copy, Default)]
pub struct NonBlockingExchange;

impl HaloStrategy for NonBlockingExchange {
    fn transfer<C: Communicator>(
        &self,
        comm: &C,
        predecessor: Neighbor,
        successor: Neighbor,
        bufs: &mut HaloBuffers,
    ) -> halo_comm::Result<()> {
        let sends = [
            SendOp {
                dest: successor,
                data: &bufs.last_row[..],
                tag: TAG_DOWN,
            },
            SendOp {
                dest: predecessor,
                data: &bufs.first_row[..],
                tag: TAG_UP,
            },
        ];
        let mut recvs = [
            RecvOp {
                source: predecessor,
                buf: &mut bufs.from_pred[..],
                tag: TAG_DOWN,
            },
            RecvOp {
                source: successor,
                buf: &mut bufs.from_succ[..],
                tag: TAG_UP,
            },
        ];
        comm.exchange(&sends, &mut recvs)
    }
}

/// Enum with all exchange strategies
#[enum_dispatch(HaloStrategy)]
#[derive(Debug, Clone, Copy)]
pub enum Exchange {
    PairedExchange(PairedExchange),
    NonBlockingExchange(NonBlockingExchange),
}

/// Exchange strategy as named in the run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ExchangeMode {
    /// [`PairedExchange`]
    #[default]
    Paired,
    /// [`NonBlockingExchange`]
    NonBlocking,
}

impl From<ExchangeMode> for Exchange {
    fn from(mode: ExchangeMode) -> Self {
        match mode {
            ExchangeMode::Paired => PairedExchange.into(),
            ExchangeMode::NonBlocking => NonBlockingExchange.into(),
        }
    }
}

/// Refreshes the halo rows of a worker's field
#[derive(Debug, Clone)]
pub struct HaloExchanger {
    strategy: Exchange,
    bufs: HaloBuffers,
}

impl HaloExchanger {
    /// Exchanger for fields with `cols` interior columns
    pub fn new(mode: ExchangeMode, cols: usize) -> Self {
        Self {
            strategy: mode.into(),
            bufs: HaloBuffers::new(cols),
        }
    }

    /// Exchange boundary rows of `field` with the neighbours of `partition`
    pub fn exchange<C: Communicator>(
        &mut self,
        comm: &C,
        partition: &Partition,
        field: &mut Field,
    ) -> Result<()> {
        let rows = field.rows();
        for (dst, src) in self.bufs.first_row.iter_mut().zip(field.owned_row(1)) {
            *dst = *src;
        }
        for (dst, src) in self.bufs.last_row.iter_mut().zip(field.owned_row(rows)) {
            *dst = *src;
        }

        self.strategy.transfer(
            comm,
            partition.predecessor,
            partition.successor,
            &mut self.bufs,
        )?;

        if !partition.predecessor.is_null() {
            for (dst, src) in field.halo_row_mut(Side::Top).iter_mut().zip(&self.bufs.from_pred) {
                *dst = *src;
            }
        }
        if !partition.successor.is_null() {
            for (dst, src) in field
                .halo_row_mut(Side::Bottom)
                .iter_mut()
                .zip(&self.bufs.from_succ)
            {
                *dst = *src;
            }
        }
        log::trace!(
            "rank {} exchanged halos ({:?} / {:?})",
            partition.rank,
            partition.predecessor,
            partition.successor
        );
        Ok(())
    }
}
