//! Tile sizes measured under several processes × threads configurations.

use crate::Result;
use crate::analysis::{ensure_dir, load, save_figure, tile_label, write_json};
use crate::log::Measurement;
use crate::model::metrics::{Best, relative_to_best};
use crate::model::{Config, TimingTable, by_config_then_tile, union_keys};
use crate::render::figure::{BarGroup, BarPanel, RED, RefLine, Rgb, TAB10, ValueLabels};
use crate::render::{Align, Canvas, Figure, Panel, TextTable, banner};
use crate::spec::builtin;

use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct HybridTilesArgs {
    #[arg(default_value = "results/tile_benchmark_hybrid_24044148.out")]
    pub log: PathBuf,

    /// Directory for the per-configuration and comparison charts.
    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridTileRow {
    pub processes: u32,
    pub threads: u32,
    pub tile_size: u32,
    pub seconds: f64,
    pub relative_to_best: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HybridTileReport {
    /// {(processes, threads): {tile_size: seconds}}
    pub data: BTreeMap<Config, TimingTable<u32>>,
    pub best: BTreeMap<Config, Best<u32>>,
    pub tiles: Vec<u32>,
}

pub fn build_report(measurements: &[Measurement]) -> HybridTileReport {
    let data = by_config_then_tile(measurements);
    let best = data
        .iter()
        .filter_map(|(config, table)| Some((*config, relative_to_best(table)?)))
        .collect();
    let tiles = union_keys(data.values());
    HybridTileReport { data, best, tiles }
}

impl HybridTileReport {
    /// Tile colors stay the same across every chart.
    fn tile_color(&self, tile: u32) -> Rgb {
        let idx = self.tiles.iter().position(|t| *t == tile).unwrap_or(0);
        TAB10[idx % TAB10.len()]
    }

    pub fn rows(&self) -> Vec<HybridTileRow> {
        let mut rows = Vec::new();
        for (config, table) in &self.data {
            let best = self.best.get(config);
            for (tile, seconds) in table {
                rows.push(HybridTileRow {
                    processes: config.procs,
                    threads: config.threads,
                    tile_size: *tile,
                    seconds: *seconds,
                    relative_to_best: best.and_then(|b| b.relative.get(tile).copied()),
                });
            }
        }
        rows
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Found {} configurations\n\n", self.data.len());
        out.push_str(&banner("TILE BENCHMARK SUMMARY", 70));

        for (config, table) in &self.data {
            out.push_str(&format!(
                "\nConfiguration: {} Processes × {} Threads (Total: {} cores)\n",
                config.procs,
                config.threads,
                config.cores()
            ));
            let mut text = TextTable::new()
                .column("Tile Size", 15, Align::Left)
                .column("Time (s)", 15, Align::Right)
                .column("Relative to Best", 20, Align::Right);
            let best = self.best.get(config);
            for (tile, seconds) in table {
                let relative = best
                    .and_then(|b| b.relative.get(tile))
                    .map(|r| format!("{:.2}x", r))
                    .unwrap_or_else(|| "N/A".to_string());
                text.row(vec![tile_label(*tile), format!("{:.2}", seconds), relative]);
            }
            out.push_str(&text.render());

            if let Some(best) = best {
                out.push_str(&format!(
                    "Best tile size: {} ({:.2}s)\n",
                    tile_label(best.key),
                    best.time
                ));
            }
        }
        out
    }

    /// One bar chart per configuration, named after it.
    pub fn config_figures(&self) -> Vec<(String, Figure)> {
        let mut out = Vec::new();
        for (config, table) in &self.data {
            let tiles: Vec<u32> = table.keys().copied().collect();
            let panel = BarPanel {
                title: format!(
                    "Tile Size Impact: {} Processes × {} Threads (Total: {} cores)",
                    config.procs,
                    config.threads,
                    config.cores()
                ),
                x_label: "Tile Size (pixels)".to_string(),
                y_label: "Execution Time (seconds)".to_string(),
                categories: tiles.iter().map(|t| tile_label(*t)).collect(),
                groups: vec![BarGroup {
                    label: None,
                    colors: tiles.iter().map(|t| self.tile_color(*t)).collect(),
                    values: table.values().map(|v| Some(*v)).collect(),
                }],
                ref_line: self.best.get(config).map(|b| RefLine {
                    label: Some(format!("Best: {:.1}s", b.time)),
                    y: b.time,
                    color: RED,
                }),
                value_labels: Some(ValueLabels::new(1, "s")),
            };
            let name = format!("tile_benchmark_{}p_{}t.png", config.procs, config.threads);
            out.push((name, Figure::single(Canvas::new(10.0, 6.0, 150), Panel::Bar(panel))));
        }
        out
    }

    /// Grouped bars: configurations on the x axis, one group per tile size.
    pub fn comparison_figure(&self) -> Figure {
        let groups = self
            .tiles
            .iter()
            .map(|tile| BarGroup {
                label: Some(format!("Tile {}", tile_label(*tile))),
                colors: vec![self.tile_color(*tile)],
                values: self.data.values().map(|t| t.get(tile).copied()).collect(),
            })
            .collect();
        let panel = BarPanel {
            title: "Tile Size Benchmark: Cross-Configuration Comparison".to_string(),
            x_label: "Configuration (Processes × Threads)".to_string(),
            y_label: "Execution Time (seconds)".to_string(),
            categories: self.data.keys().map(Config::to_string).collect(),
            groups,
            ref_line: None,
            value_labels: Some(ValueLabels::new(0, "")),
        };
        Figure::single(Canvas::new(12.0, 7.0, 150), Panel::Bar(panel))
    }
}

pub fn run(args: &HybridTilesArgs) -> Result<()> {
    let grammar = builtin("hybrid-tiles")?;
    let measurements = load(&args.log, &grammar)?;
    let report = build_report(&measurements);

    print!("{}", report.summary());
    println!("\nGenerating plots...");
    ensure_dir(&args.out_dir)?;
    for (name, figure) in report.config_figures() {
        save_figure(&figure, &args.out_dir.join(name))?;
    }
    save_figure(
        &report.comparison_figure(),
        &args.out_dir.join("tile_benchmark_comparison.png"),
    )?;
    write_json(args.json.as_deref(), &report.rows())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn m(procs: u32, threads: u32, tile: u32, t: f64) -> Measurement {
        Measurement {
            tile_size: Some(tile),
            process_count: procs,
            thread_count: Some(threads),
            variant: None,
            elapsed_seconds: t,
        }
    }

    fn sample() -> Vec<Measurement> {
        vec![
            m(4, 4, 16, 20.0),
            m(4, 4, 32, 10.0),
            m(4, 4, 64, 15.0),
            m(8, 2, 32, 12.0),
            m(8, 2, 128, 6.0),
        ]
    }

    #[test]
    fn best_tile_per_configuration() {
        let report = build_report(&sample());
        assert_eq!(report.tiles, vec![16, 32, 64, 128]);
        assert_eq!(report.best[&Config::new(4, 4)].key, 32);
        assert_eq!(report.best[&Config::new(8, 2)].key, 128);

        let rows = report.rows();
        assert_eq!(
            rows[0],
            HybridTileRow {
                processes: 4,
                threads: 4,
                tile_size: 16,
                seconds: 20.0,
                relative_to_best: Some(2.0),
            }
        );
    }

    #[test]
    fn summary_lists_each_configuration() {
        let summary = build_report(&sample()).summary();
        assert!(summary.starts_with("Found 2 configurations\n\n===="));
        assert!(summary.contains("\n\nConfiguration: 4 Processes × 4 Threads (Total: 16 cores)\nTile Size"));
        assert!(summary.contains("Best tile size: 32×32 (10.00s)"));
        assert!(summary.contains("Best tile size: 128×128 (6.00s)"));
        assert!(summary.contains("1.50x"));
    }

    #[test]
    fn config_charts_are_named_and_marked() {
        let report = build_report(&sample());
        let figures = report.config_figures();
        let names: Vec<_> = figures.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["tile_benchmark_4p_4t.png", "tile_benchmark_8p_2t.png"]);

        let Panel::Bar(panel) = &figures[0].1.panels[0] else {
            panic!("expected a bar panel");
        };
        assert_eq!(panel.categories, vec!["16×16", "32×32", "64×64"]);
        let best = panel.ref_line.as_ref().unwrap();
        assert_eq!(best.y, 10.0);
        assert_eq!(best.label.as_deref(), Some("Best: 10.0s"));
        // 32×32 keeps its color across configurations.
        let Panel::Bar(other) = &figures[1].1.panels[0] else {
            panic!("expected a bar panel");
        };
        assert_eq!(panel.groups[0].colors[1], other.groups[0].colors[0]);
    }

    #[test]
    fn comparison_leaves_gaps_for_unmeasured_tiles() {
        let figure = build_report(&sample()).comparison_figure();
        let Panel::Bar(panel) = &figure.panels[0] else {
            panic!("expected a bar panel");
        };
        assert_eq!(panel.categories, vec!["4p×4t", "8p×2t"]);
        assert_eq!(panel.groups.len(), 4);
        assert_eq!(panel.groups[0].values, vec![Some(20.0), None]);
        assert_eq!(panel.groups[3].values, vec![None, Some(6.0)]);
    }
}
