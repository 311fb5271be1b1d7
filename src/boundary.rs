//! Dirichlet boundary values of the cavity problem
//!
//! Fluid enters through the `j = 0` edge and leaves through the
//! `i = m + 1` edge. With step base `b`, outlet height `h` and
//! inlet/outlet width `w`:
//!
//! - inlet: ψ(i, 0) = i - b for `b < i < b + w`, and ψ(i, 0) = w for
//!   `b + w <= i <= m`;
//! - outlet: ψ(m + 1, j) = w for `1 <= j <= h`, and
//!   ψ(m + 1, j) = w - j + h for `h < j < h + w`.
//!
//! Every other border cell is a wall with ψ = 0.
use crate::error::{Error, Result};
use crate::field::Field;
use crate::partition::Partition;
use serde::Deserialize;

/// Base geometry, in grid units before scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Geometry {
    /// Grid rows
    #[serde(default = "default_m")]
    pub m: usize,
    /// Grid columns
    #[serde(default = "default_n")]
    pub n: usize,
    /// Step base: rows before the inlet opens
    #[serde(default = "default_b")]
    pub b: usize,
    /// Outlet height
    #[serde(default = "default_h")]
    pub h: usize,
    /// Inlet/outlet width
    #[serde(default = "default_w")]
    pub w: usize,
}

fn default_m() -> usize {
    32
}
fn default_n() -> usize {
    32
}
fn default_b() -> usize {
    10
}
fn default_h() -> usize {
    15
}
fn default_w() -> usize {
    5
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            m: default_m(),
            n: default_n(),
            b: default_b(),
            h: default_h(),
            w: default_w(),
        }
    }
}

impl Geometry {
    /// Every length multiplied by `scale`
    ///
    /// # Errors
    /// `Configuration` naming `scale_factor` if a scaled length overflows.
    pub fn scaled(&self, scale: usize) -> Result<Self> {
        let mul = |len: usize| {
            len.checked_mul(scale).ok_or_else(|| {
                Error::config(
                    "scale_factor",
                    format!("scale factor {} overflows the grid length {}", scale, len),
                )
            })
        };
        Ok(Self {
            m: mul(self.m)?,
            n: mul(self.n)?,
            b: mul(self.b)?,
            h: mul(self.h)?,
            w: mul(self.w)?,
        })
    }

    /// Check that inlet and outlet fit on the grid
    pub fn validate(&self) -> Result<()> {
        if self.w == 0 {
            return Err(Error::config("w", "inlet/outlet width must be positive"));
        }
        // last inlet ramp row is b + w - 1
        let inlet_end = self.b.saturating_add(self.w - 1);
        if inlet_end > self.m {
            return Err(Error::config(
                "b",
                format!(
                    "inlet b + w - 1 = {} must not exceed the {} grid rows",
                    inlet_end, self.m
                ),
            ));
        }
        let outlet_end = self.h.saturating_add(self.w - 1);
        if outlet_end > self.n {
            return Err(Error::config(
                "h",
                format!(
                    "outlet h + w - 1 = {} must not exceed the {} grid columns",
                    outlet_end, self.n
                ),
            ));
        }
        Ok(())
    }
}

/// Stamps the boundary values of a [`Geometry`] into a worker's field
#[derive(Debug, Clone)]
pub struct BoundaryInitializer {
    geometry: Geometry,
}

impl BoundaryInitializer {
    /// Validated initializer for a (scaled) geometry
    pub fn new(geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        Ok(Self { geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Write the boundary cells that fall inside `partition` into `field`.
    /// Interior cells are left untouched; applying twice is a no-op.
    pub fn apply(&self, field: &mut Field, partition: &Partition) -> Result<()> {
        let g = &self.geometry;
        if partition.m != g.m || partition.n != g.n {
            return Err(Error::config(
                "geometry",
                format!(
                    "grid {}x{} does not match partition {}x{}",
                    g.m, g.n, partition.m, partition.n
                ),
            ));
        }
        if field.rows() != partition.rows_owned() || field.cols() != partition.n {
            return Err(Error::config(
                "field",
                format!(
                    "field {}x{} is not sized for partition {}x{}",
                    field.rows(),
                    field.cols(),
                    partition.rows_owned(),
                    partition.n
                ),
            ));
        }

        // inlet on the j = 0 edge
        for i in partition.row_lo..=partition.row_hi {
            let value = if i <= g.b {
                0.
            } else if i < g.b + g.w {
                (i - g.b) as f64
            } else {
                g.w as f64
            };
            field[(i + 1 - partition.row_lo, 0)] = value;
        }

        // outlet on the i = m + 1 edge, held by the last worker
        if partition.is_last() {
            let i = partition.rows_owned() + 1;
            for j in 1..=g.n {
                let value = if j <= g.h {
                    g.w as f64
                } else if j < g.h + g.w {
                    (g.w + g.h - j) as f64
                } else {
                    0.
                };
                field[(i, j)] = value;
            }
        }
        Ok(())
    }
}
