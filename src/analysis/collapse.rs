//! Code-variant comparison (e.g. `collapse` vs `no_collapse`) over the two
//! phases of a hybrid run. Speedup is relative to the smallest count of each
//! phase.

use crate::Result;
use crate::analysis::{PhaseMetrics, PhaseRow, ensure_dir, load, points, save_figure, write_json};
use crate::log::Measurement;
use crate::model::metrics::Baseline;
use crate::model::{Config, TimingTable, by_variant_then_config, split_phases, union_keys};
use crate::render::figure::{GRAY, LinePanel, Marker, RefLine, Series, TAB10};
use crate::render::{Align, Canvas, Figure, Panel, TextTable, banner, num};
use crate::spec::builtin;

use clap::Args;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Args)]
pub struct CollapseArgs {
    #[arg(default_value = "hybrid_scaling_24037381.out")]
    pub log: PathBuf,

    /// Count held constant in each phase.
    #[arg(long, default_value_t = 4)]
    pub fixed: u32,

    /// Combined 2×2 figure.
    #[arg(long, default_value = "hybrid_scaling_plots.png")]
    pub out: PathBuf,

    /// Write four single-panel charts into --out-dir instead.
    #[arg(long)]
    pub separate: bool,

    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Which count varies in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Threads,
    Processes,
}

impl Phase {
    fn test(self) -> u32 {
        match self {
            Phase::Threads => 1,
            Phase::Processes => 2,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Phase::Threads => "threads",
            Phase::Processes => "processes",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Phase::Threads => "Threads",
            Phase::Processes => "Processes",
        }
    }

    fn heading(self, fixed: u32) -> String {
        match self {
            Phase::Threads => format!("Test 1: {} Processes, Varying Threads", fixed),
            Phase::Processes => format!("Test 2: {} Threads, Varying Processes", fixed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollapseReport {
    pub fixed: u32,
    /// {variant: {(processes, threads): seconds}}
    pub data: BTreeMap<String, TimingTable<Config>>,
    pub threads: BTreeMap<String, PhaseMetrics>,
    pub procs: BTreeMap<String, PhaseMetrics>,
}

pub fn build_report(measurements: &[Measurement], fixed: u32) -> CollapseReport {
    let data = by_variant_then_config(measurements);
    let mut threads = BTreeMap::new();
    let mut procs = BTreeMap::new();
    for (variant, table) in &data {
        let split = split_phases(table, fixed);
        threads.insert(
            variant.clone(),
            PhaseMetrics::new(&format!("{} thread phase", variant), split.threads, &Baseline::Smallest),
        );
        procs.insert(
            variant.clone(),
            PhaseMetrics::new(&format!("{} process phase", variant), split.procs, &Baseline::Smallest),
        );
    }
    CollapseReport {
        fixed,
        data,
        threads,
        procs,
    }
}

impl CollapseReport {
    fn phase(&self, phase: Phase) -> &BTreeMap<String, PhaseMetrics> {
        match phase {
            Phase::Threads => &self.threads,
            Phase::Processes => &self.procs,
        }
    }

    pub fn phase_is_empty(&self, phase: Phase) -> bool {
        self.phase(phase).values().all(PhaseMetrics::is_empty)
    }

    pub fn rows(&self) -> Vec<PhaseRow> {
        let mut rows = Vec::new();
        for phase in [Phase::Threads, Phase::Processes] {
            for (variant, metrics) in self.phase(phase) {
                rows.extend(metrics.rows(variant, phase.key()));
            }
        }
        rows
    }

    fn phase_table(&self, phase: Phase) -> String {
        let metrics = self.phase(phase);
        let mut table = TextTable::new().column(phase.header(), 10, Align::Left);
        for variant in metrics.keys() {
            table = table
                .column(format!("{} (s)", variant), 20, Align::Right)
                .column(format!("{} speedup", variant), 20, Align::Right);
        }
        for count in union_keys(metrics.values().map(|m| &m.times)) {
            let mut cells = vec![count.to_string()];
            for m in metrics.values() {
                cells.push(num(m.times.get(&count).copied(), 4, ""));
                cells.push(num(m.derived.speedup.get(&count).copied(), 2, "x"));
            }
            table.row(cells);
        }
        table.render()
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for phase in [Phase::Threads, Phase::Processes] {
            out.push('\n');
            out.push_str(&banner(&phase.heading(self.fixed).to_uppercase(), 80));
            if self.phase_is_empty(phase) {
                out.push_str("(no data)\n");
                continue;
            }
            out.push_str(&self.phase_table(phase));
        }
        out
    }

    fn x_label(&self, phase: Phase) -> &'static str {
        match phase {
            Phase::Threads => "Number of Threads",
            Phase::Processes => "Number of Processes",
        }
    }

    fn variant_series(&self, phase: Phase, speedup: bool) -> Vec<Series> {
        let markers = [Marker::Circle, Marker::Square, Marker::Triangle];
        self.phase(phase)
            .iter()
            .enumerate()
            .filter_map(|(i, (variant, metrics))| {
                let values = if speedup {
                    &metrics.derived.speedup
                } else {
                    &metrics.times
                };
                if values.is_empty() {
                    return None;
                }
                Some(Series::new(
                    variant.clone(),
                    TAB10[i % TAB10.len()],
                    markers[i % markers.len()],
                    points(values.iter().map(|(k, v)| (*k, *v))),
                ))
            })
            .collect()
    }

    pub fn time_panel(&self, phase: Phase) -> LinePanel {
        let mut panel = LinePanel::new(
            format!("{}: Max Computation Time", phase.heading(self.fixed)),
            self.x_label(phase),
            "Max Computation Time (seconds)",
        );
        panel.series = self.variant_series(phase, false);
        panel.x_ticks = self.ticks(phase);
        panel
    }

    pub fn speedup_panel(&self, phase: Phase) -> LinePanel {
        let smallest = self.ticks(phase).first().copied().unwrap_or(1.0);
        let mut panel = LinePanel::new(
            format!("{}: Speedup", phase.heading(self.fixed)),
            self.x_label(phase),
            format!("Speedup (relative to {} {})", smallest, phase.header()),
        );
        panel.series = self.variant_series(phase, true);
        panel.x_ticks = self.ticks(phase);
        panel.ref_lines.push(RefLine {
            label: None,
            y: 1.0,
            color: GRAY,
        });
        panel
    }

    fn ticks(&self, phase: Phase) -> Vec<f64> {
        union_keys(self.phase(phase).values().map(|m| &m.times))
            .into_iter()
            .map(f64::from)
            .collect()
    }

    /// Times on top, speedups below; thread phase left, process phase right.
    pub fn combined_figure(&self) -> Figure {
        Figure::grid(
            Canvas::new(14.0, 10.0, 300),
            2,
            2,
            vec![
                Panel::Line(self.time_panel(Phase::Threads)),
                Panel::Line(self.time_panel(Phase::Processes)),
                Panel::Line(self.speedup_panel(Phase::Threads)),
                Panel::Line(self.speedup_panel(Phase::Processes)),
            ],
        )
    }

    /// Single-panel charts, skipping phases without data.
    pub fn separate_figures(&self) -> Vec<(String, Figure)> {
        let canvas = Canvas::new(11.0, 7.0, 300);
        let mut out = Vec::new();
        for phase in [Phase::Threads, Phase::Processes] {
            if self.phase_is_empty(phase) {
                warn!("no test {} data found; skipping its charts", phase.test());
                continue;
            }
            out.push((
                format!("test{}_computation_time.png", phase.test()),
                Figure::single(canvas, Panel::Line(self.time_panel(phase))),
            ));
            out.push((
                format!("test{}_speedup.png", phase.test()),
                Figure::single(canvas, Panel::Line(self.speedup_panel(phase))),
            ));
        }
        out
    }
}

fn save_all(figures: Vec<(String, Figure)>, dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    for (name, figure) in figures {
        save_figure(&figure, &dir.join(name))?;
    }
    Ok(())
}

pub fn run(args: &CollapseArgs) -> Result<()> {
    let grammar = builtin("collapse")?;
    let measurements = load(&args.log, &grammar)?;
    let report = build_report(&measurements, args.fixed);

    print!("{}", report.summary());
    println!();
    if args.separate {
        save_all(report.separate_figures(), &args.out_dir)?;
    } else {
        save_figure(&report.combined_figure(), &args.out)?;
    }
    write_json(args.json.as_deref(), &report.rows())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn m(procs: u32, threads: u32, variant: &str, t: f64) -> Measurement {
        Measurement {
            tile_size: None,
            process_count: procs,
            thread_count: Some(threads),
            variant: Some(variant.to_string()),
            elapsed_seconds: t,
        }
    }

    fn sample() -> Vec<Measurement> {
        vec![
            m(4, 2, "collapse", 40.0),
            m(4, 4, "collapse", 20.0),
            m(4, 8, "collapse", 10.0),
            m(8, 4, "collapse", 8.0),
            m(4, 2, "no_collapse", 50.0),
            m(4, 4, "no_collapse", 25.0),
            m(8, 4, "no_collapse", 12.5),
        ]
    }

    #[test]
    fn speedup_relative_to_smallest_count() {
        let report = build_report(&sample(), 4);
        assert_eq!(
            report.threads["collapse"].derived.speedup,
            BTreeMap::from([(2, 1.0), (4, 2.0), (8, 4.0)])
        );
        // Process phase starts at 4 processes.
        assert_eq!(
            report.procs["no_collapse"].derived.speedup,
            BTreeMap::from([(4, 1.0), (8, 2.0)])
        );
        assert_eq!(report.procs["collapse"].derived.baseline, Some(4));
    }

    #[test]
    fn summary_has_one_column_pair_per_variant() {
        let summary = build_report(&sample(), 4).summary();
        assert!(summary.contains("TEST 1: 4 PROCESSES, VARYING THREADS"));
        assert!(summary.contains("collapse (s)"));
        assert!(summary.contains("no_collapse speedup"));
        let row = summary.lines().find(|l| l.starts_with("8 ")).unwrap();
        // collapse measured 8 threads, no_collapse did not.
        assert!(row.contains("10.0000"));
        assert!(row.contains("4.00x"));
        assert!(row.contains("N/A"));
    }

    #[test]
    fn combined_figure_layout() {
        let figure = build_report(&sample(), 4).combined_figure();
        assert_eq!((figure.rows, figure.cols), (2, 2));
        assert_eq!(figure.canvas.pixels(), (4200, 3000));
        let Panel::Line(speedup) = &figure.panels[2] else {
            panic!("expected a line panel");
        };
        assert_eq!(speedup.ref_lines[0].y, 1.0);
        assert_eq!(speedup.y_label, "Speedup (relative to 2 Threads)");
        let labels: Vec<_> = speedup.series.iter().map(|s| s.label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["collapse", "no_collapse"]);
        assert_eq!(speedup.series[1].marker, Marker::Square);
    }

    #[test]
    fn separate_figures_skip_empty_phase() {
        // Nothing runs with 4 threads, so the process phase is empty.
        let ms = vec![m(4, 2, "collapse", 40.0), m(4, 8, "collapse", 10.0)];
        let report = build_report(&ms, 4);
        assert!(report.phase_is_empty(Phase::Processes));
        let names: Vec<_> = report
            .separate_figures()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["test1_computation_time.png", "test1_speedup.png"]);
        assert!(report.summary().ends_with("(no data)\n"));
    }

    #[test]
    fn rows_are_tagged_by_variant_and_phase() {
        let rows = build_report(&sample(), 4).rows();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].group, "collapse");
        assert_eq!(rows[0].phase, "threads");
        assert_eq!(rows.last().unwrap().phase, "processes");
    }
}
