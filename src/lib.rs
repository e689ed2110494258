//! Per-station min/mean/max over large `key;value` files.
//!
//! The input is cut into line-aligned parts, each part is aggregated by its
//! own thread into a private open-addressing table, and the tables are merged
//! into one before being sorted for output.

pub mod config;
pub mod error;
pub mod merge;
pub mod parse;
pub mod pipeline;
pub mod report;
pub mod split;
pub mod table;
pub mod worker;

pub use config::{Config, ReadStrategy, Reduction};
pub use error::{Error, Result};
pub use pipeline::{aggregate, run};
pub use report::Report;
pub use split::Part;
pub use table::{AggregationTable, Entry};
