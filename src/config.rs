//! TOML run configuration
//!
//! ```toml
//! scale_factor = 2
//! iterations = 5000
//! tolerance = 1e-4      # <= 0 runs the full iteration budget
//! print_interval = 1000
//! workers = 4           # in-process backend only
//! exchange = "nonblocking"
//! sweep = "parallel"
//!
//! [geometry]            # base sizes, multiplied by scale_factor
//! m = 32
//! n = 32
//! b = 10
//! h = 15
//! w = 5
//! ```
use crate::boundary::Geometry;
use crate::error::{Error, Result};
use crate::halo::ExchangeMode;
use crate::stencil::Sweep;
use serde::Deserialize;
use std::path::Path;

/// Parameters of one solver run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Multiplier applied to every base length of the geometry
    #[serde(default = "default_scale_factor")]
    pub scale_factor: usize,
    /// Iteration budget
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Residual below which the run stops early; `<= 0` disables it
    #[serde(default)]
    pub tolerance: f64,
    /// Iterations between progress reports
    #[serde(default = "default_print_interval")]
    pub print_interval: usize,
    /// Worker count of the in-process backend
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub exchange: ExchangeMode,
    #[serde(default)]
    pub sweep: Sweep,
    /// Unscaled geometry
    #[serde(default)]
    pub geometry: Geometry,
}

fn default_scale_factor() -> usize {
    1
}
fn default_iterations() -> usize {
    1000
}
fn default_print_interval() -> usize {
    1000
}
fn default_workers() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scale_factor: default_scale_factor(),
            iterations: default_iterations(),
            tolerance: 0.,
            print_interval: default_print_interval(),
            workers: default_workers(),
            exchange: ExchangeMode::default(),
            sweep: Sweep::default(),
            geometry: Geometry::default(),
        }
    }
}

impl RunConfig {
    /// Read and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter, naming the first offending one
    pub fn validate(&self) -> Result<()> {
        if self.scale_factor == 0 {
            return Err(Error::config("scale_factor", "must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(Error::config("iterations", "must be at least 1"));
        }
        if self.print_interval == 0 {
            return Err(Error::config("print_interval", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(Error::config("workers", "must be at least 1"));
        }
        if !self.tolerance.is_finite() {
            return Err(Error::config("tolerance", "must be a finite number"));
        }
        self.grid()?.validate()
    }

    /// Geometry after scaling
    pub fn grid(&self) -> Result<Geometry> {
        self.geometry.scaled(self.scale_factor)
    }

    /// Whether the residual is computed every iteration
    pub fn checks_error(&self) -> bool {
        self.tolerance > 0.
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RunConfig::from_toml_str("").unwrap();
        assert_eq!(c, RunConfig::default());
        assert!(!c.checks_error());
        assert_eq!(c.grid().unwrap(), Geometry::default());
    }

    #[test]
    fn test_full_document() {
        let c = RunConfig::from_toml_str(
            r#"
            scale_factor = 2
            iterations = 500
            tolerance = 1e-4
            print_interval = 50
            workers = 4
            exchange = "nonblocking"
            sweep = "parallel"

            [geometry]
            m = 40
            "#,
        )
        .unwrap();
        assert_eq!(c.scale_factor, 2);
        assert_eq!(c.iterations, 500);
        assert!(c.checks_error());
        assert_eq!(c.exchange, ExchangeMode::NonBlocking);
        assert_eq!(c.sweep, Sweep::Parallel);
        let grid = c.grid().unwrap();
        assert_eq!(grid.m, 80);
        assert_eq!(grid.n, 64);
    }

    #[test]
    fn test_invalid_values() {
        for (doc, param) in [
            ("scale_factor = 0", "scale_factor"),
            ("iterations = 0", "iterations"),
            ("print_interval = 0", "print_interval"),
            ("workers = 0", "workers"),
            ("tolerance = nan", "tolerance"),
            ("[geometry]\nb = 40", "b"),
        ] {
            match RunConfig::from_toml_str(doc) {
                Err(Error::Configuration { parameter, .. }) => assert_eq!(parameter, param),
                other => panic!("{}: expected configuration error, got {:?}", doc, other),
            }
        }
    }

    #[test]
    fn test_scale_factor_overflow() {
        let c = RunConfig {
            scale_factor: usize::MAX / 8,
            ..RunConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(Error::Configuration {
                parameter: "scale_factor",
                ..
            })
        ));
        let doc = format!("scale_factor = {}", i64::MAX);
        assert!(matches!(
            RunConfig::from_toml_str(&doc),
            Err(Error::Configuration {
                parameter: "scale_factor",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RunConfig::from_toml_str("exchange = \"broadcast\""),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            RunConfig::from_toml_str("unknown = 1"),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            RunConfig::load("/nonexistent/run.toml"),
            Err(Error::Io { .. })
        ));
    }
}
