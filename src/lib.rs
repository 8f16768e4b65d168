//! Per-station min/mean/max over large `name;value` measurement files.
//!
//! The file is read once, front to back, and flows through a bounded
//! pipeline: [`reader`] emits raw blocks, [`splitter`] realigns them on line
//! boundaries, a pool of [`worker`]s parses units into private tables, and
//! [`aggregate`] merges those tables into a sorted [`Report`].

pub mod aggregate;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod splitter;
pub mod station;
pub mod worker;

pub use aggregate::{Report, StationSummary, Tenths};
pub use error::{ConfigError, ParseError, PipelineError, SumOverflow};
pub use pipeline::{run, run_file, PipelineConfig, PipelineStats, Summary};
pub use station::{Measurement, NameKey};
pub use worker::{StationTable, UnitParser};
