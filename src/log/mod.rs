//! Benchmark log reading and measurement extraction.

pub mod parse;
pub mod row;

pub use parse::{parse_log_file, read_log};
pub use row::Measurement;
