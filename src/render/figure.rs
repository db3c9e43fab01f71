//! Chart descriptions, independent of any drawing backend.
//!
//! Analyses build a `Figure`; `render::chart` turns it into pixels.

/// Plain RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const GRAY: Rgb = Rgb(128, 128, 128);
pub const RED: Rgb = Rgb(214, 39, 40);

/// Categorical palette (matplotlib "tab10").
pub const TAB10: [Rgb; 10] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
    Rgb(188, 189, 34),
    Rgb(23, 190, 207),
];

/// `n` distinct colors, cycling the palette when n > 10.
pub fn palette(n: usize) -> Vec<Rgb> {
    (0..n).map(|i| TAB10[i % TAB10.len()]).collect()
}

/// Output size, expressed the way the plots were specified: inches at a DPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Canvas {
    pub const fn new(width_in: f64, height_in: f64, dpi: u32) -> Self {
        Self {
            width_in,
            height_in,
            dpi,
        }
    }

    pub fn pixels(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }

    /// Points (1/72 inch) to pixels.
    pub fn pt(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }

    pub fn pt_px(&self, points: f64) -> u32 {
        self.pt(points).round() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Circle,
    Square,
    Triangle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    pub color: Rgb,
    pub line: LineStyle,
    pub marker: Marker,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, color: Rgb, marker: Marker, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: Some(label.into()),
            color,
            line: LineStyle::Solid,
            marker,
            points,
        }
    }

    pub fn dashed(mut self) -> Self {
        self.line = LineStyle::Dashed;
        self.marker = Marker::None;
        self
    }
}

/// Dashed horizontal reference line.
#[derive(Debug, Clone, PartialEq)]
pub struct RefLine {
    pub label: Option<String>,
    pub y: f64,
    pub color: Rgb,
}

/// Text drawn above each point or bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueLabels {
    pub precision: usize,
    pub suffix: String,
}

impl ValueLabels {
    pub fn new(precision: usize, suffix: &str) -> Self {
        Self {
            precision,
            suffix: suffix.to_string(),
        }
    }

    pub fn format(&self, value: f64) -> String {
        format!("{:.*}{}", self.precision, value, self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub ref_lines: Vec<RefLine>,
    /// x positions that should get a tick (the measured worker counts).
    pub x_ticks: Vec<f64>,
    /// Shade the area under each solid series.
    pub fill: bool,
    pub value_labels: Option<ValueLabels>,
    pub zero_based: bool,
}

impl LinePanel {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
            ref_lines: Vec::new(),
            x_ticks: Vec::new(),
            fill: false,
            value_labels: None,
            zero_based: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    pub fn x_bounds(&self) -> (f64, f64) {
        let xs = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .chain(self.x_ticks.iter().copied());
        let (lo, hi) = min_max(xs).unwrap_or((0.0, 1.0));
        let lo = if self.zero_based { lo.min(0.0) } else { lo };
        pad(lo, hi, 0.05)
    }

    pub fn y_bounds(&self) -> (f64, f64) {
        let ys = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .chain(self.ref_lines.iter().map(|r| r.y));
        let (lo, hi) = min_max(ys).unwrap_or((0.0, 1.0));
        let lo = if self.zero_based { lo.min(0.0) } else { lo };
        // Head room for value labels and the legend.
        let (lo, hi) = pad(lo, hi, 0.05);
        (lo, hi + (hi - lo) * 0.1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarGroup {
    pub label: Option<String>,
    /// One color per category, or a single color for the whole group.
    pub colors: Vec<Rgb>,
    /// One value per category; `None` leaves a gap.
    pub values: Vec<Option<f64>>,
}

impl BarGroup {
    pub fn color_at(&self, idx: usize) -> Rgb {
        if self.colors.is_empty() {
            TAB10[0]
        } else {
            self.colors[idx % self.colors.len()]
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub groups: Vec<BarGroup>,
    pub ref_line: Option<RefLine>,
    pub value_labels: Option<ValueLabels>,
}

impl BarPanel {
    /// Width of a single bar, in category units.
    pub fn bar_width(&self) -> f64 {
        0.8 / self.groups.len().max(1) as f64
    }

    /// Center of the bar for group `group` in category `category`.
    pub fn bar_center(&self, group: usize, category: usize) -> f64 {
        let n = self.groups.len().max(1) as f64;
        category as f64 + (group as f64 - n / 2.0 + 0.5) * self.bar_width()
    }

    pub fn y_max(&self) -> f64 {
        let top = self
            .groups
            .iter()
            .flat_map(|g| g.values.iter().flatten().copied())
            .chain(self.ref_line.iter().map(|r| r.y))
            .fold(0.0_f64, f64::max);
        if top > 0.0 { top * 1.15 } else { 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Line(LinePanel),
    Bar(BarPanel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: Option<String>,
    pub canvas: Canvas,
    pub rows: usize,
    pub cols: usize,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn single(canvas: Canvas, panel: Panel) -> Self {
        Self {
            title: None,
            canvas,
            rows: 1,
            cols: 1,
            panels: vec![panel],
        }
    }

    pub fn grid(canvas: Canvas, rows: usize, cols: usize, panels: Vec<Panel>) -> Self {
        Self {
            title: None,
            canvas,
            rows,
            cols,
            panels,
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn pad(lo: f64, hi: f64, frac: f64) -> (f64, f64) {
    if hi > lo {
        let margin = (hi - lo) * frac;
        (if lo == 0.0 { 0.0 } else { lo - margin }, hi + margin)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canvas_converts_inches() {
        let canvas = Canvas::new(10.0, 6.0, 150);
        assert_eq!(canvas.pixels(), (1500, 900));
        assert_eq!(canvas.pt(72.0), 150.0);
        assert_eq!(canvas.pt_px(12.0), 25);
    }

    #[test]
    fn palette_cycles() {
        let colors = palette(12);
        assert_eq!(colors.len(), 12);
        assert_eq!(colors[10], colors[0]);
    }

    #[test]
    fn line_bounds_cover_points_and_ticks() {
        let mut panel = LinePanel::new("t", "x", "y");
        panel.series.push(Series::new("s", TAB10[0], Marker::Circle, vec![(4.0, 2.0), (16.0, 8.0)]));
        panel.x_ticks = vec![4.0, 32.0];
        let (x_lo, x_hi) = panel.x_bounds();
        assert_eq!(x_lo, 0.0);
        assert!(x_hi > 32.0);
        let (y_lo, y_hi) = panel.y_bounds();
        assert_eq!(y_lo, 0.0);
        assert!(y_hi > 8.0);
    }

    #[test]
    fn degenerate_bounds_are_widened() {
        let mut panel = LinePanel::new("t", "x", "y");
        panel.zero_based = false;
        panel.series.push(Series::new("s", TAB10[0], Marker::None, vec![(4.0, 2.0)]));
        assert_eq!(panel.x_bounds(), (3.0, 5.0));
    }

    #[test]
    fn grouped_bars_are_centered_on_categories() {
        let panel = BarPanel {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            categories: vec!["a".into(), "b".into()],
            groups: vec![
                BarGroup { label: None, colors: vec![], values: vec![Some(1.0), Some(2.0)] },
                BarGroup { label: None, colors: vec![], values: vec![Some(3.0), None] },
            ],
            ref_line: None,
            value_labels: Some(ValueLabels::new(1, "s")),
        };
        assert_eq!(panel.bar_width(), 0.4);
        assert!((panel.bar_center(0, 1) - 0.8).abs() < 1e-9);
        assert!((panel.bar_center(1, 1) - 1.2).abs() < 1e-9);
        assert!((panel.y_max() - 3.45).abs() < 1e-9);
        assert_eq!(panel.value_labels.unwrap().format(12.34), "12.3s");
    }
}
