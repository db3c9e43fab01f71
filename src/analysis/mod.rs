//! One module per benchmark log family. Each parses its log with a built-in
//! grammar, aggregates, derives metrics, prints summary tables and writes
//! charts.

pub mod collapse;
pub mod extract;
pub mod hybrid_scaling;
pub mod hybrid_tiles;
pub mod map;
pub mod model;
pub mod tiles;

use crate::Result;
use crate::log::{Measurement, parse_log_file};
use crate::model::TimingTable;
use crate::model::metrics::{Baseline, Derived, derive};
use crate::render::{Align, Figure, TextTable, num, render_figure};
use crate::spec::Grammar;

use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Parse a log, announcing it on stdout first.
pub fn load(path: &Path, grammar: &Grammar) -> Result<Vec<Measurement>> {
    println!("Parsing {}...", path.display());
    parse_log_file(path, grammar)
}

pub fn save_figure(figure: &Figure, path: &Path) -> Result<()> {
    render_figure(figure, path).with_context(|| format!("render chart {}", path.display()))?;
    println!("Saved: {}", path.display());
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create output directory {}", dir.display()))
}

/// Write report rows as pretty JSON when a path was requested.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, rows: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(rows)?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// "32×32"
pub fn tile_label(tile: u32) -> String {
    format!("{}×{}", tile, tile)
}

/// Points of a table as (x, y) pairs for plotting.
pub fn points<K: Copy + Into<f64>>(values: impl IntoIterator<Item = (K, f64)>) -> Vec<(f64, f64)> {
    values.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// One phase of a hybrid run (threads or processes varying) with its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMetrics {
    pub times: TimingTable<u32>,
    pub derived: Derived<u32>,
}

/// A phase measurement flattened for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseRow {
    pub group: String,
    pub phase: &'static str,
    pub count: u32,
    pub seconds: f64,
    pub speedup: Option<f64>,
    pub efficiency: Option<f64>,
}

impl PhaseMetrics {
    pub fn new(group: &str, times: TimingTable<u32>, baseline: &Baseline<u32>) -> Self {
        let derived = derive(group, &times, baseline);
        Self { times, derived }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Console table: count, time, speedup and (optionally) efficiency.
    pub fn table(&self, count_header: &str, speedup_header: &str, efficiency: bool) -> String {
        let mut table = TextTable::new()
            .column(count_header, 15, Align::Left)
            .column("Time (s)", 15, Align::Right)
            .column(speedup_header, 20, Align::Right);
        if efficiency {
            table = table.column("Efficiency", 15, Align::Right);
        }
        for (count, seconds) in &self.times {
            let mut cells = vec![
                count.to_string(),
                format!("{:.2}", seconds),
                num(self.derived.speedup.get(count).copied(), 2, "x"),
            ];
            if efficiency {
                cells.push(num(self.derived.efficiency.get(count).copied(), 1, "%"));
            }
            table.row(cells);
        }
        table.render()
    }

    pub fn rows(&self, group: &str, phase: &'static str) -> Vec<PhaseRow> {
        self.times
            .iter()
            .map(|(count, seconds)| PhaseRow {
                group: group.to_string(),
                phase,
                count: *count,
                seconds: *seconds,
                speedup: self.derived.speedup.get(count).copied(),
                efficiency: self.derived.efficiency.get(count).copied(),
            })
            .collect()
    }
}
