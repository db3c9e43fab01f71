//! Measured speedup of a strong or weak scaling experiment against the
//! theoretical curves of Amdahl's or Gustafson's law.

use crate::Result;
use crate::analysis::{save_figure, write_json};
use crate::model::laws::ScalingKind;
use crate::render::figure::{LinePanel, Marker, RED, Series, TAB10};
use crate::render::{Align, Canvas, Figure, Panel, TextTable, banner};
use crate::spec::{ScalingModel, load_scaling_model};

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Curve colors for the serial fractions, in order.
const CURVE_COLORS: [usize; 3] = [0, 2, 4];

#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Scaling model JSON (kind, workers, times, serial_fractions).
    pub config: PathBuf,

    /// Override the chart path from the configuration.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRow {
    pub workers: u32,
    pub seconds: f64,
    pub measured_speedup: f64,
    /// One entry per serial fraction, in configuration order.
    pub theoretical_speedup: Vec<f64>,
}

pub fn build_rows(model: &ScalingModel) -> Vec<ModelRow> {
    let Some(&(base_workers, base_time)) = model.points.first() else {
        return Vec::new();
    };
    let base_workers = f64::from(base_workers);
    model
        .points
        .iter()
        .map(|&(workers, seconds)| {
            let w = f64::from(workers);
            ModelRow {
                workers,
                seconds,
                measured_speedup: model.kind.measured(base_workers, base_time, w, seconds),
                theoretical_speedup: model
                    .serial_fractions
                    .iter()
                    .map(|s| model.kind.theoretical(*s, w))
                    .collect(),
            }
        })
        .collect()
}

pub fn summary(model: &ScalingModel, rows: &[ModelRow]) -> String {
    let mut table = TextTable::new()
        .column("Workers", 8, Align::Right)
        .column("Time (s)", 12, Align::Right)
        .column("Measured", 10, Align::Right);
    for s in &model.serial_fractions {
        table = table.column(format!("s={}", s), 10, Align::Right);
    }
    for row in rows {
        let mut cells = vec![
            row.workers.to_string(),
            format!("{:.4}", row.seconds),
            format!("{:.2}x", row.measured_speedup),
        ];
        cells.extend(row.theoretical_speedup.iter().map(|v| format!("{:.2}x", v)));
        table.row(cells);
    }

    let mut out = banner(&model.title, 80);
    out.push_str(&format!("Theoretical curves: {}\n\n", model.kind.law_name()));
    out.push_str(&table.render());
    out
}

pub fn figure(model: &ScalingModel, rows: &[ModelRow]) -> Figure {
    let (x_label, y_label) = match model.kind {
        ScalingKind::Strong => ("Number of Processors", "Speedup"),
        ScalingKind::Weak => ("Number of Processes", "Speedup (T₁ / Tₙ)"),
    };
    let mut panel = LinePanel::new(model.title.clone(), x_label, y_label);
    panel.x_ticks = rows.iter().map(|r| f64::from(r.workers)).collect();

    panel.series.push(Series::new(
        "Measured Speedup (using max time)",
        RED,
        Marker::Circle,
        rows.iter()
            .map(|r| (f64::from(r.workers), r.measured_speedup))
            .collect(),
    ));
    for (i, s) in model.serial_fractions.iter().enumerate() {
        let color = TAB10[CURVE_COLORS[i % CURVE_COLORS.len()]];
        let curve = rows
            .iter()
            .map(|r| (f64::from(r.workers), r.theoretical_speedup[i]))
            .collect();
        panel.series.push(
            Series::new(format!("Theoretical Speedup (s={})", s), color, Marker::None, curve).dashed(),
        );
    }

    Figure::single(Canvas::new(8.0, 5.0, 300), Panel::Line(panel))
}

pub fn run(args: &ModelArgs) -> Result<()> {
    let model = load_scaling_model(&args.config)?;
    let rows = build_rows(&model);

    print!("{}", summary(&model, &rows));
    println!();
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&model.output));
    save_figure(&figure(&model, &rows), &out)?;
    write_json(args.json.as_deref(), &rows)?;
    Ok(())
}
