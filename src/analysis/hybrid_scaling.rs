//! Hybrid scaling per tile size: a thread phase (processes fixed) and a
//! process phase (threads fixed), both relative to the (fixed, fixed) run.

use crate::Result;
use crate::analysis::{PhaseMetrics, PhaseRow, ensure_dir, load, points, save_figure, tile_label, write_json};
use crate::log::Measurement;
use crate::model::metrics::{Baseline, ideal_speedup};
use crate::model::{Config, TimingTable, by_tile_then_config, split_phases, union_keys};
use crate::render::figure::{GRAY, LinePanel, Marker, Rgb, Series, ValueLabels, palette};
use crate::render::{Canvas, Figure, Panel, banner};
use crate::spec::builtin;

use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;

const THREAD_COLOR: Rgb = Rgb(0x2E, 0x86, 0xAB);
const PROCESS_COLOR: Rgb = Rgb(0xA2, 0x3B, 0x72);

#[derive(Debug, Args)]
pub struct HybridScalingArgs {
    #[arg(default_value = "results/hybrid_scaling_24046807.out")]
    pub log: PathBuf,

    #[arg(long, default_value = "results")]
    pub out_dir: PathBuf,

    /// Count held constant in each phase; (fixed, fixed) is the baseline.
    #[arg(long, default_value_t = 4)]
    pub fixed: u32,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TilePhases {
    pub threads: PhaseMetrics,
    pub procs: PhaseMetrics,
}

#[derive(Debug, Clone)]
pub struct HybridScalingReport {
    pub fixed: u32,
    /// {tile_size: {(processes, threads): seconds}}
    pub data: BTreeMap<u32, TimingTable<Config>>,
    pub phases: BTreeMap<u32, TilePhases>,
}

pub fn build_report(measurements: &[Measurement], fixed: u32) -> HybridScalingReport {
    let data = by_tile_then_config(measurements);
    let baseline = Baseline::Key(fixed);
    let phases = data
        .iter()
        .map(|(tile, table)| {
            let split = split_phases(table, fixed);
            let label = tile_label(*tile);
            let phases = TilePhases {
                threads: PhaseMetrics::new(&format!("tile {} thread phase", label), split.threads, &baseline),
                procs: PhaseMetrics::new(&format!("tile {} process phase", label), split.procs, &baseline),
            };
            (*tile, phases)
        })
        .collect();
    HybridScalingReport {
        fixed,
        data,
        phases,
    }
}

impl HybridScalingReport {
    pub fn rows(&self) -> Vec<PhaseRow> {
        let mut rows = Vec::new();
        for (tile, phases) in &self.phases {
            let label = tile_label(*tile);
            rows.extend(phases.threads.rows(&label, "threads"));
            rows.extend(phases.procs.rows(&label, "processes"));
        }
        rows
    }

    pub fn summary(&self) -> String {
        let fixed = self.fixed;
        let mut out = format!("Found {} tile sizes with configurations\n\n", self.data.len());
        out.push_str(&banner("HYBRID SCALING BENCHMARK SUMMARY", 80));

        for (tile, phases) in &self.phases {
            out.push('\n');
            out.push_str(&banner(&format!("TILE SIZE: {}", tile_label(*tile)), 80));

            out.push_str(&format!("\nPhase 1: Fixed {} Processes, Scaling Threads\n", fixed));
            out.push_str(&phases.threads.table(
                "Threads",
                &format!("Speedup vs {}t", fixed),
                true,
            ));

            out.push_str(&format!("\nPhase 2: Fixed {} Threads, Scaling Processes\n", fixed));
            out.push_str(&phases.procs.table(
                "Processes",
                &format!("Speedup vs {}p", fixed),
                true,
            ));
        }
        out
    }

    /// Two panels per tile size: execution time of each phase.
    pub fn tile_figures(&self) -> Vec<(String, Figure)> {
        let fixed = self.fixed;
        let mut out = Vec::new();
        for (tile, phases) in &self.phases {
            let label = tile_label(*tile);

            let mut threads = LinePanel::new(
                format!(
                    "Phase 1: Tile {} - Thread Scaling ({} Processes × Threads)",
                    label, fixed
                ),
                format!("Number of Threads (fixed {} processes)", fixed),
                "Execution Time (seconds)",
            );
            let mut procs = LinePanel::new(
                format!(
                    "Phase 2: Tile {} - Process Scaling (Processes × {} Threads)",
                    label, fixed
                ),
                format!("Number of Processes (fixed {} threads)", fixed),
                "Execution Time (seconds)",
            );

            for (panel, phase, color, marker) in [
                (&mut threads, &phases.threads, THREAD_COLOR, Marker::Circle),
                (&mut procs, &phases.procs, PROCESS_COLOR, Marker::Square),
            ] {
                if phase.is_empty() {
                    continue;
                }
                panel.x_ticks = phase.times.keys().map(|k| f64::from(*k)).collect();
                panel.fill = true;
                panel.value_labels = Some(ValueLabels::new(1, "s"));
                panel.series.push(Series::new(
                    "Execution Time",
                    color,
                    marker,
                    points(phase.times.iter().map(|(k, v)| (*k, *v))),
                ));
            }

            let name = format!("hybrid_scaling_tile_{}x{}.png", tile, tile);
            let figure = Figure::grid(
                Canvas::new(14.0, 5.0, 150),
                1,
                2,
                vec![Panel::Line(threads), Panel::Line(procs)],
            );
            out.push((name, figure));
        }
        out
    }

    fn thread_keys(&self) -> Vec<u32> {
        union_keys(self.phases.values().map(|p| &p.threads.times))
    }

    fn proc_keys(&self) -> Vec<u32> {
        union_keys(self.phases.values().map(|p| &p.procs.times))
    }

    /// Times of every tile size, one panel per phase.
    pub fn comparison_figure(&self) -> Figure {
        let fixed = self.fixed;
        let mut threads = LinePanel::new(
            format!("Phase 1: Thread Scaling Comparison ({} Processes)", fixed),
            format!("Number of Threads (fixed {} processes)", fixed),
            "Execution Time (seconds)",
        );
        let mut procs = LinePanel::new(
            format!("Phase 2: Process Scaling Comparison ({} Threads)", fixed),
            format!("Number of Processes (fixed {} threads)", fixed),
            "Execution Time (seconds)",
        );
        threads.x_ticks = self.thread_keys().into_iter().map(f64::from).collect();
        procs.x_ticks = self.proc_keys().into_iter().map(f64::from).collect();

        let colors = palette(self.phases.len());
        for ((tile, phases), color) in self.phases.iter().zip(colors) {
            let label = format!("Tile {}", tile_label(*tile));
            if !phases.threads.is_empty() {
                threads.series.push(Series::new(
                    label.clone(),
                    color,
                    Marker::Circle,
                    points(phases.threads.times.iter().map(|(k, v)| (*k, *v))),
                ));
            }
            if !phases.procs.is_empty() {
                procs.series.push(Series::new(
                    label,
                    color,
                    Marker::Square,
                    points(phases.procs.times.iter().map(|(k, v)| (*k, *v))),
                ));
            }
        }

        Figure::grid(
            Canvas::new(14.0, 6.0, 150),
            1,
            2,
            vec![Panel::Line(threads), Panel::Line(procs)],
        )
    }

    /// Speedup of every tile size against (fixed, fixed), with ideal scaling.
    pub fn speedup_figure(&self) -> Figure {
        let fixed = self.fixed;
        let mut threads = LinePanel::new(
            "Phase 1: Thread Speedup Comparison",
            "Number of Threads",
            format!("Speedup (relative to {} threads)", fixed),
        );
        let mut procs = LinePanel::new(
            "Phase 2: Process Speedup Comparison",
            "Number of Processes",
            format!("Speedup (relative to {} processes)", fixed),
        );

        let colors = palette(self.phases.len());
        for ((tile, phases), color) in self.phases.iter().zip(colors) {
            let label = format!("Tile {}", tile_label(*tile));
            if !phases.threads.derived.is_empty() {
                threads.series.push(Series::new(
                    label.clone(),
                    color,
                    Marker::Circle,
                    points(phases.threads.derived.speedup.iter().map(|(k, v)| (*k, *v))),
                ));
            }
            if !phases.procs.derived.is_empty() {
                procs.series.push(Series::new(
                    label,
                    color,
                    Marker::Square,
                    points(phases.procs.derived.speedup.iter().map(|(k, v)| (*k, *v))),
                ));
            }
        }

        for (panel, keys) in [(&mut threads, self.thread_keys()), (&mut procs, self.proc_keys())] {
            panel.x_ticks = keys.iter().map(|k| f64::from(*k)).collect();
            if keys.is_empty() {
                continue;
            }
            let ideal = keys
                .iter()
                .map(|k| (f64::from(*k), ideal_speedup(k, &fixed)))
                .collect();
            panel.series.push(Series::new("Ideal", GRAY, Marker::None, ideal).dashed());
        }

        Figure::grid(
            Canvas::new(14.0, 6.0, 150),
            1,
            2,
            vec![Panel::Line(threads), Panel::Line(procs)],
        )
    }
}

pub fn run(args: &HybridScalingArgs) -> Result<()> {
    let grammar = builtin("hybrid-scaling")?;
    let measurements = load(&args.log, &grammar)?;
    let report = build_report(&measurements, args.fixed);

    print!("{}", report.summary());
    println!();
    print!("{}", banner("Generating plots...", 80));
    ensure_dir(&args.out_dir)?;
    for (name, figure) in report.tile_figures() {
        save_figure(&figure, &args.out_dir.join(name))?;
    }
    save_figure(
        &report.comparison_figure(),
        &args.out_dir.join("hybrid_scaling_comparison.png"),
    )?;
    save_figure(
        &report.speedup_figure(),
        &args.out_dir.join("hybrid_scaling_speedup.png"),
    )?;
    write_json(args.json.as_deref(), &report.rows())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::figure::LineStyle;
    use pretty_assertions::assert_eq;

    fn m(tile: u32, procs: u32, threads: u32, t: f64) -> Measurement {
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
            m(32, 4, 1, 80.0),
            m(32, 4, 4, 20.0),
            m(32, 4, 8, 12.5),
            m(32, 8, 4, 10.0),
            m(32, 16, 4, 6.25),
            // No (4, 4) baseline for this tile.
            m(64, 4, 8, 14.0),
            m(64, 8, 4, 11.0),
        ]
    }

    #[test]
    fn phases_relative_to_fixed_baseline() {
        let report = build_report(&sample(), 4);
        let tile = &report.phases[&32];
        assert_eq!(
            tile.threads.derived.speedup,
            BTreeMap::from([(1, 0.25), (4, 1.0), (8, 1.6)])
        );
        assert_eq!(tile.threads.derived.efficiency[&8], 80.0);
        assert_eq!(tile.threads.derived.efficiency[&1], 100.0);
        assert_eq!(
            tile.procs.derived.speedup,
            BTreeMap::from([(4, 1.0), (8, 2.0), (16, 3.2)])
        );
        assert_eq!(tile.procs.derived.efficiency[&16], 80.0);

        let missing = &report.phases[&64];
        assert!(missing.threads.derived.is_empty());
        assert!(missing.procs.derived.is_empty());
        assert_eq!(missing.threads.times, TimingTable::from([(8, 14.0)]));
    }

    #[test]
    fn summary_prints_both_phases() {
        let summary = build_report(&sample(), 4).summary();
        assert!(summary.contains("Found 2 tile sizes with configurations"));
        assert!(summary.contains("TILE SIZE: 32×32"));
        assert!(summary.starts_with("Found 2 tile sizes with configurations\n\n===="));
        assert!(summary.contains("\nPhase 1: Fixed 4 Processes, Scaling Threads\nThreads"));
        assert!(summary.contains("Speedup vs 4p"));
        assert!(summary.contains("1.60x"));
        assert!(summary.contains("80.0%"));
        // The 64×64 tile has times but no speedup.
        let row = summary
            .lines()
            .skip_while(|l| !l.contains("TILE SIZE: 64×64"))
            .find(|l| l.starts_with('8'))
            .unwrap();
        assert!(row.contains("14.00"));
        assert!(row.contains("N/A"));
    }

    #[test]
    fn per_tile_figures_have_two_panels() {
        let report = build_report(&sample(), 4);
        let figures = report.tile_figures();
        assert_eq!(figures[0].0, "hybrid_scaling_tile_32x32.png");
        assert_eq!(figures[1].0, "hybrid_scaling_tile_64x64.png");

        let figure = &figures[0].1;
        assert_eq!((figure.rows, figure.cols), (1, 2));
        let Panel::Line(threads) = &figure.panels[0] else {
            panic!("expected a line panel");
        };
        assert!(threads.fill);
        assert_eq!(threads.x_ticks, vec![1.0, 4.0, 8.0]);
        assert_eq!(threads.series[0].color, THREAD_COLOR);
    }

    #[test]
    fn speedup_figure_skips_tiles_without_baseline() {
        let figure = build_report(&sample(), 4).speedup_figure();
        let Panel::Line(procs) = &figure.panels[1] else {
            panic!("expected a line panel");
        };
        let labels: Vec<_> = procs.series.iter().map(|s| s.label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["Tile 32×32", "Ideal"]);
        let ideal = &procs.series[1];
        assert_eq!(ideal.line, LineStyle::Dashed);
        assert_eq!(ideal.points, vec![(4.0, 1.0), (8.0, 2.0), (16.0, 4.0)]);
    }

    #[test]
    fn rows_cover_both_phases() {
        let rows = build_report(&sample(), 4).rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].group, "32×32");
        assert_eq!(rows[0].phase, "threads");
        assert_eq!(rows[3].phase, "processes");
        assert_eq!(rows[3].count, 4);
    }
}
