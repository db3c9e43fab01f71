use crate::Result;
use crate::log::row::Measurement;
use crate::spec::Grammar;

use anyhow::{Context, bail};
use std::fs;
use std::path::Path;

/// Read a whole benchmark log into memory.
pub fn read_log(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read log file {}", path.display()))
}

/// Read a log and extract its measurements with `grammar`.
///
/// Lines the grammar does not match are ignored; a log with no match at all
/// is an error.
pub fn parse_log_file(path: &Path, grammar: &Grammar) -> Result<Vec<Measurement>> {
    let text = read_log(path)?;
    let measurements = grammar.extract(&text);
    tracing::info!(
        "{}: {} measurements with grammar {}",
        path.display(),
        measurements.len(),
        grammar.name()
    );
    if measurements.is_empty() {
        bail!(
            "no data found in {} (grammar {}); please check the file format",
            path.display(),
            grammar.name()
        );
    }
    Ok(measurements)
}
