//! Draw a `Figure` with plotters. The output extension picks the backend:
//! `.svg` renders vector output, anything else a bitmap (PNG).

use crate::Result;
use crate::render::figure::{
    BarPanel, Canvas, Figure, LinePanel, LineStyle, Marker, Panel, Rgb,
};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const FONT: &str = "sans-serif";

pub fn render_figure(figure: &Figure, path: &Path) -> Result<()> {
    let size = figure.canvas.pixels();
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()?;
    }
    Ok(())
}

fn color(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn font(canvas: &Canvas, points: f64) -> FontDesc<'static> {
    (FONT, canvas.pt(points)).into_font()
}

fn draw_figure<B: DrawingBackend>(root: &DrawingArea<B, Shift>, figure: &Figure) -> Result<()>
where
    B::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let area = match &figure.title {
        Some(title) => root.titled(title, font(&figure.canvas, 14.0))?,
        None => root.clone(),
    };

    let cells = area.split_evenly((figure.rows.max(1), figure.cols.max(1)));
    for (cell, panel) in cells.iter().zip(&figure.panels) {
        match panel {
            Panel::Line(p) => draw_line_panel(cell, p, &figure.canvas)?,
            Panel::Bar(p) => draw_bar_panel(cell, p, &figure.canvas)?,
        }
    }
    Ok(())
}

fn draw_line_panel<B: DrawingBackend>(
    area: &DrawingArea<B, Shift>,
    panel: &LinePanel,
    canvas: &Canvas,
) -> Result<()>
where
    B::ErrorType: 'static,
{
    let (x_min, x_max) = panel.x_bounds();
    let (y_min, y_max) = panel.y_bounds();

    let mut chart = ChartBuilder::on(area)
        .margin(canvas.pt_px(8.0))
        .caption(&panel.title, font(canvas, 12.0))
        .x_label_area_size(canvas.pt_px(32.0))
        .y_label_area_size(canvas.pt_px(48.0))
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .x_labels(panel.x_ticks.len().clamp(5, 12))
        .y_labels(8)
        .label_style(font(canvas, 9.0))
        .axis_desc_style(font(canvas, 10.0))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    for r in &panel.ref_lines {
        let c = color(r.color);
        let anno = chart.draw_series(DashedLineSeries::new(
            vec![(x_min, r.y), (x_max, r.y)],
            canvas.pt_px(6.0),
            canvas.pt_px(4.0),
            c.stroke_width(canvas.pt_px(1.0)),
        ))?;
        if let Some(label) = &r.label {
            anno.label(label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c));
        }
    }

    let stroke = canvas.pt_px(1.5).max(1);
    let radius = canvas.pt_px(3.0).max(2) as i32;
    for s in &panel.series {
        let c = color(s.color);

        if panel.fill && s.line == LineStyle::Solid {
            chart.draw_series(AreaSeries::new(s.points.clone(), 0.0, c.mix(0.3)))?;
        }

        let anno = match s.line {
            LineStyle::Solid => {
                chart.draw_series(LineSeries::new(s.points.clone(), c.stroke_width(stroke)))?
            }
            LineStyle::Dashed => chart.draw_series(DashedLineSeries::new(
                s.points.clone(),
                canvas.pt_px(6.0),
                canvas.pt_px(4.0),
                c.stroke_width(stroke),
            ))?,
        };
        if let Some(label) = &s.label {
            anno.label(label.clone()).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], c.stroke_width(2))
            });
        }

        match s.marker {
            Marker::None => {}
            Marker::Circle => {
                chart.draw_series(
                    s.points
                        .iter()
                        .map(|&p| Circle::new(p, radius, c.filled())),
                )?;
            }
            Marker::Square => {
                chart.draw_series(s.points.iter().map(|&p| {
                    EmptyElement::at(p)
                        + Rectangle::new([(-radius, -radius), (radius, radius)], c.filled())
                }))?;
            }
            Marker::Triangle => {
                chart.draw_series(
                    s.points
                        .iter()
                        .map(|&p| TriangleMarker::new(p, radius + 1, c.filled())),
                )?;
            }
        }

        if let Some(labels) = &panel.value_labels {
            let style = TextStyle::from(font(canvas, 8.0)).pos(Pos::new(HPos::Center, VPos::Bottom));
            chart.draw_series(
                s.points
                    .iter()
                    .map(|&(x, y)| Text::new(labels.format(y), (x, y), style.clone())),
            )?;
        }
    }

    let has_legend = panel.series.iter().any(|s| s.label.is_some())
        || panel.ref_lines.iter().any(|r| r.label.is_some());
    if has_legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(font(canvas, 9.0))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

fn draw_bar_panel<B: DrawingBackend>(
    area: &DrawingArea<B, Shift>,
    panel: &BarPanel,
    canvas: &Canvas,
) -> Result<()>
where
    B::ErrorType: 'static,
{
    let n = panel.categories.len().max(1);
    let categories = panel.categories.clone();
    let label_for = move |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 {
            categories.get(idx as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };

    let mut chart = ChartBuilder::on(area)
        .margin(canvas.pt_px(8.0))
        .caption(&panel.title, font(canvas, 12.0))
        .x_label_area_size(canvas.pt_px(32.0))
        .y_label_area_size(canvas.pt_px(48.0))
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..panel.y_max())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .x_labels(n + 1)
        .x_label_formatter(&label_for)
        .label_style(font(canvas, 9.0))
        .axis_desc_style(font(canvas, 10.0))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    let half = panel.bar_width() / 2.0;
    for (gi, group) in panel.groups.iter().enumerate() {
        let bars: Vec<(f64, f64, RGBColor)> = group
            .values
            .iter()
            .enumerate()
            .filter_map(|(ci, v)| v.map(|v| (panel.bar_center(gi, ci), v, color(group.color_at(ci)))))
            .collect();

        let anno = chart.draw_series(
            bars.iter()
                .map(|&(x, v, c)| Rectangle::new([(x - half, 0.0), (x + half, v)], c.mix(0.8).filled())),
        )?;
        if let Some(label) = &group.label {
            let c = color(group.color_at(0));
            anno.label(label.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], c.filled()));
        }

        chart.draw_series(
            bars.iter()
                .map(|&(x, v, _)| Rectangle::new([(x - half, 0.0), (x + half, v)], BLACK.stroke_width(1))),
        )?;

        if let Some(labels) = &panel.value_labels {
            let style = TextStyle::from(font(canvas, 8.0)).pos(Pos::new(HPos::Center, VPos::Bottom));
            chart.draw_series(
                bars.iter()
                    .filter(|(_, v, _)| *v > 0.0)
                    .map(|&(x, v, _)| Text::new(labels.format(v), (x, v), style.clone())),
            )?;
        }
    }

    if let Some(r) = &panel.ref_line {
        let c = color(r.color);
        let anno = chart.draw_series(DashedLineSeries::new(
            vec![(-0.5, r.y), (n as f64 - 0.5, r.y)],
            canvas.pt_px(6.0),
            canvas.pt_px(4.0),
            c.stroke_width(canvas.pt_px(1.5).max(1)),
        ))?;
        if let Some(label) = &r.label {
            anno.label(label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c));
        }
    }

    let has_legend =
        panel.groups.iter().any(|g| g.label.is_some()) || panel.ref_line.as_ref().is_some_and(|r| r.label.is_some());
    if has_legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(font(canvas, 9.0))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}
