//! Strong scaling of a pure-MPI build against a hybrid MPI+OpenMP build,
//! from profiler job logs (`.out` holds compute times, `.err` the profiler's
//! wall-clock "Profiling time").

use crate::Result;
use crate::analysis::{load, save_figure, write_json};
use crate::log::{Measurement, read_log};
use crate::model::{TimingTable, fold};
use crate::render::figure::{BLACK, LinePanel, Marker, Series, TAB10};
use crate::render::{Canvas, Figure, Panel};
use crate::spec::{Grammar, builtin};

use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

const IDEAL_POINTS: usize = 50;

#[derive(Debug, Args)]
pub struct MapArgs {
    #[arg(
        long,
        default_value = "original_implementation/map_log/map_original_test_24213527.out"
    )]
    pub original_out: PathBuf,

    /// Profiler stderr of the pure-MPI runs.
    #[arg(long)]
    pub original_err: Option<PathBuf>,

    #[arg(
        long,
        default_value = "hybrid_implementation/map_log/map_hybrid_test_24213952.out"
    )]
    pub hybrid_out: PathBuf,

    /// Profiler stderr of the hybrid runs.
    #[arg(long)]
    pub hybrid_err: Option<PathBuf>,

    /// OpenMP threads per hybrid rank.
    #[arg(long, default_value_t = 4)]
    pub hybrid_threads: u32,

    /// Worker count at which both builds are compared.
    #[arg(long, default_value_t = 96)]
    pub compare_at: u32,

    /// Output stem; both .png and .svg are written.
    #[arg(long, default_value = "map_strong_scaling_comparison")]
    pub out: PathBuf,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// One profiled run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingRun {
    pub processes: u32,
    /// processes × threads per process
    pub workers: u64,
    pub max_seconds: f64,
    /// Profiler wall time, or the max compute time when the profiler
    /// reported none for this process count.
    pub profiling_seconds: f64,
}

/// Pair compute times with profiling times by process count.
pub fn scaling_runs(out: &[Measurement], err: &[Measurement], threads: u32) -> Vec<ScalingRun> {
    let max_times = fold(out, |m| Some(m.process_count));
    let profiling: TimingTable<u32> = fold(err, |m| Some(m.process_count));
    max_times
        .into_iter()
        .map(|(procs, max_seconds)| ScalingRun {
            processes: procs,
            workers: u64::from(procs) * u64::from(threads),
            max_seconds,
            profiling_seconds: profiling.get(&procs).copied().unwrap_or(max_seconds),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct MapReport {
    pub original: Vec<ScalingRun>,
    pub hybrid: Vec<ScalingRun>,
    pub compare_at: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRow {
    pub implementation: &'static str,
    #[serde(flatten)]
    pub run: ScalingRun,
}

fn worker_range(runs: &[ScalingRun]) -> String {
    match (runs.first(), runs.last()) {
        (Some(first), Some(last)) => format!("workers: {} to {}", first.workers, last.workers),
        _ => "no workers".to_string(),
    }
}

fn run_at(runs: &[ScalingRun], workers: u32) -> Option<&ScalingRun> {
    runs.iter().find(|r| r.workers == u64::from(workers))
}

impl MapReport {
    pub fn rows(&self) -> Vec<MapRow> {
        let original = self.original.iter().map(|run| MapRow {
            implementation: "original",
            run: run.clone(),
        });
        let hybrid = self.hybrid.iter().map(|run| MapRow {
            implementation: "hybrid",
            run: run.clone(),
        });
        original.chain(hybrid).collect()
    }

    /// Profiling-time speedup of hybrid over original at `compare_at` workers.
    pub fn speedup_at_compare(&self) -> Option<f64> {
        let original = run_at(&self.original, self.compare_at)?;
        let hybrid = run_at(&self.hybrid, self.compare_at)?;
        if hybrid.profiling_seconds > 0.0 {
            Some(original.profiling_seconds / hybrid.profiling_seconds)
        } else {
            None
        }
    }

    pub fn summary(&self) -> String {
        let mut out = String::from("=== Summary Statistics ===\n");
        out.push_str(&format!(
            "Original: {} configurations tested ({})\n",
            self.original.len(),
            worker_range(&self.original)
        ));
        out.push_str(&format!(
            "Hybrid:   {} configurations tested ({})\n",
            self.hybrid.len(),
            worker_range(&self.hybrid)
        ));

        out.push_str(&format!("\nAt {} workers:\n", self.compare_at));
        match (
            run_at(&self.original, self.compare_at),
            run_at(&self.hybrid, self.compare_at),
        ) {
            (Some(o), Some(h)) => {
                out.push_str(&format!(
                    "  Original: Max compute = {:.1}s, Profiling time = {:.1}s\n",
                    o.max_seconds, o.profiling_seconds
                ));
                out.push_str(&format!(
                    "  Hybrid:   Max compute = {:.1}s, Profiling time = {:.1}s\n",
                    h.max_seconds, h.profiling_seconds
                ));
                if let Some(speedup) = self.speedup_at_compare() {
                    out.push_str(&format!("  Speedup (profiling time): {:.2}×\n", speedup));
                }
            }
            _ => out.push_str("  not measured by both implementations\n"),
        }
        out
    }

    /// `time(w) = t0 · w0 / w` from the first original run out to the
    /// largest worker count of either build.
    pub fn ideal_line(&self) -> Vec<(f64, f64)> {
        let Some(first) = self.original.first() else {
            return Vec::new();
        };
        let start = first.workers as f64;
        let end = self
            .original
            .iter()
            .chain(&self.hybrid)
            .map(|r| r.workers as f64)
            .fold(start, f64::max);
        let work = first.max_seconds * start;
        (0..IDEAL_POINTS)
            .map(|i| {
                let w = start + (end - start) * i as f64 / (IDEAL_POINTS - 1) as f64;
                (w, work / w)
            })
            .collect()
    }

    pub fn figure(&self) -> Figure {
        let mut panel = LinePanel::new(
            "Strong Scaling: Max Per-Rank Computation Time",
            "Total Workers (MPI ranks or MPI×threads)",
            "Max Local Computation Time (s)",
        );
        let series = |runs: &[ScalingRun]| -> Vec<(f64, f64)> {
            runs.iter()
                .map(|r| (r.workers as f64, r.max_seconds))
                .collect()
        };
        panel.series.push(Series::new(
            "Original (pure MPI)",
            TAB10[0],
            Marker::Circle,
            series(&self.original),
        ));
        panel.series.push(Series::new(
            "Hybrid (MPI+OpenMP)",
            TAB10[1],
            Marker::Square,
            series(&self.hybrid),
        ));
        let ideal = self.ideal_line();
        if !ideal.is_empty() {
            panel
                .series
                .push(Series::new("Ideal scaling", BLACK, Marker::None, ideal).dashed());
        }
        Figure::single(Canvas::new(10.0, 6.0, 300), Panel::Line(panel))
    }
}

/// Profiling times are optional: a missing argument or a file without any
/// "Profiling time" entry leaves the max compute time in place.
fn load_profiling(path: Option<&Path>, grammar: &Grammar) -> Result<Vec<Measurement>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let measurements = grammar.extract(&read_log(path)?);
    if measurements.is_empty() {
        warn!(
            "no profiling times in {}; using max compute times",
            path.display()
        );
    }
    Ok(measurements)
}

pub fn run(args: &MapArgs) -> Result<()> {
    let out_grammar = builtin("map-out")?;
    let err_grammar = builtin("map-err")?;

    let original = scaling_runs(
        &load(&args.original_out, &out_grammar)?,
        &load_profiling(args.original_err.as_deref(), &err_grammar)?,
        1,
    );
    let hybrid = scaling_runs(
        &load(&args.hybrid_out, &out_grammar)?,
        &load_profiling(args.hybrid_err.as_deref(), &err_grammar)?,
        args.hybrid_threads,
    );
    let report = MapReport {
        original,
        hybrid,
        compare_at: args.compare_at,
    };

    let figure = report.figure();
    save_figure(&figure, &args.out.with_extension("png"))?;
    save_figure(&figure, &args.out.with_extension("svg"))?;
    println!();
    print!("{}", report.summary());
    write_json(args.json.as_deref(), &report.rows())?;
    Ok(())
}
