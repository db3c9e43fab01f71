//! Tile-size strong scaling: one pure-MPI run per (tile size, process count).

use crate::Result;
use crate::analysis::{load, points, save_figure, tile_label, write_json};
use crate::log::Measurement;
use crate::model::metrics::{Baseline, Derived, derive, ideal_speedup};
use crate::model::{TimingTable, by_tile_then_procs, union_keys};
use crate::render::figure::{BLACK, LinePanel, Marker, Series, palette};
use crate::render::{Align, Canvas, Figure, Panel, TextTable, banner, num};
use crate::spec::builtin;

use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Tile benchmark output (tile_benchmark_*.out).
    pub log: PathBuf,

    /// Chart to write (.png or .svg).
    #[arg(default_value = "tile_size_comparison.png")]
    pub out: PathBuf,

    /// Process count every speedup is relative to.
    #[arg(long, default_value_t = 20)]
    pub reference: u32,

    /// Also write the report rows as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileRow {
    pub tile_size: u32,
    pub processes: u32,
    pub seconds: f64,
    pub speedup: Option<f64>,
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TileReport {
    pub reference: u32,
    /// {tile_size: {processes: seconds}}
    pub data: BTreeMap<u32, TimingTable<u32>>,
    pub derived: BTreeMap<u32, Derived<u32>>,
    pub processes: Vec<u32>,
}

pub fn build_report(measurements: &[Measurement], reference: u32) -> TileReport {
    let data = by_tile_then_procs(measurements);
    let derived = data
        .iter()
        .map(|(tile, table)| {
            let group = format!("tile size {}", tile_label(*tile));
            (*tile, derive(&group, table, &Baseline::Key(reference)))
        })
        .collect();
    let processes = union_keys(data.values());
    TileReport {
        reference,
        data,
        derived,
        processes,
    }
}

impl TileReport {
    pub fn rows(&self) -> Vec<TileRow> {
        let mut rows = Vec::new();
        for (tile, table) in &self.data {
            let derived = &self.derived[tile];
            for (procs, seconds) in table {
                rows.push(TileRow {
                    tile_size: *tile,
                    processes: *procs,
                    seconds: *seconds,
                    speedup: derived.speedup.get(procs).copied(),
                    efficiency: derived.efficiency.get(procs).copied(),
                });
            }
        }
        rows
    }

    fn grid(&self, cell: impl Fn(u32, u32) -> String) -> String {
        let mut table = TextTable::new().column("Tile Size", 14, Align::Left);
        for p in &self.processes {
            table = table.column(format!("{}p", p), 10, Align::Right);
        }
        for tile in self.data.keys() {
            let mut cells = vec![tile_label(*tile)];
            cells.extend(self.processes.iter().map(|p| cell(*tile, *p)));
            table.row(cells);
        }
        table.render()
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Found {} tile sizes\n", self.data.len());
        for (tile, table) in &self.data {
            out.push_str(&format!(
                "  Tile {}: {} process counts\n",
                tile_label(*tile),
                table.len()
            ));
        }

        out.push('\n');
        out.push_str(&banner("RUNTIME SUMMARY (Max Computation Time in seconds)", 80));
        out.push_str(&self.grid(|tile, p| num(self.data[&tile].get(&p).copied(), 2, "")));

        out.push('\n');
        out.push_str(&banner(
            &format!("SPEEDUP SUMMARY (relative to {} processes)", self.reference),
            80,
        ));
        out.push_str(&self.grid(|tile, p| num(self.derived[&tile].speedup.get(&p).copied(), 2, "x")));
        out
    }

    pub fn figure(&self) -> Figure {
        let mut panel = LinePanel::new(
            "Tile Size Benchmark: Speedup Comparison",
            "Number of Processes",
            format!("Speedup (relative to {} processes)", self.reference),
        );
        panel.x_ticks = self.processes.iter().map(|p| f64::from(*p)).collect();

        let colors = palette(self.data.len());
        for ((tile, derived), color) in self.derived.iter().zip(colors) {
            if derived.is_empty() {
                continue;
            }
            panel.series.push(Series::new(
                format!("Tile {}", tile_label(*tile)),
                color,
                Marker::Circle,
                points(derived.speedup.iter().map(|(p, s)| (*p, *s))),
            ));
        }

        panel.series.push(
            Series::new(
                "Ideal Speedup",
                BLACK,
                Marker::None,
                self.processes
                    .iter()
                    .map(|p| (f64::from(*p), ideal_speedup(p, &self.reference)))
                    .collect(),
            )
            .dashed(),
        );

        Figure::single(Canvas::new(10.0, 6.0, 300), Panel::Line(panel))
    }
}

pub fn run(args: &TilesArgs) -> Result<()> {
    let grammar = builtin("tiles")?;
    let measurements = load(&args.log, &grammar)?;
    let report = build_report(&measurements, args.reference);

    print!("{}", report.summary());
    println!();
    save_figure(&report.figure(), &args.out)?;
    write_json(args.json.as_deref(), &report.rows())?;
    Ok(())
}
