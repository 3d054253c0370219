//! Support/resistance zones, trendlines and structural-change events over OHLC bars.
//!
//! `analysis` holds the detection core and is pure: bars and parameters in,
//! plain data out. `loader`, `synthetic` and `output` are the surrounding glue
//! used by the `structure-recon` binary.

pub mod analysis;
pub mod data;
pub mod error;
pub mod loader;
pub mod output;
pub mod synthetic;

pub use error::{AnalysisError, Result};
