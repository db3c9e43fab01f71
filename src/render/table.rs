//! Fixed-width text tables for console summaries.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    width: usize,
    align: Align,
}

#[derive(Debug, Clone, Default)]
pub struct TextTable {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, header: impl Into<String>, width: usize, align: Align) -> Self {
        self.columns.push(Column {
            header: header.into(),
            width,
            align,
        });
        self
    }

    /// Missing trailing cells render blank; extra cells are dropped.
    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn line(&self, cells: &[String]) -> String {
        let mut out = String::new();
        for (idx, col) in self.columns.iter().enumerate() {
            let cell = cells.get(idx).map(String::as_str).unwrap_or("");
            if idx > 0 {
                out.push(' ');
            }
            let padded = match col.align {
                Align::Left => format!("{:<w$}", cell, w = col.width),
                Align::Right => format!("{:>w$}", cell, w = col.width),
            };
            out.push_str(&padded);
        }
        out.trim_end().to_string()
    }

    fn rule_width(&self) -> usize {
        self.columns.iter().map(|c| c.width).sum::<usize>() + self.columns.len().saturating_sub(1)
    }

    pub fn render(&self) -> String {
        let headers: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
        let rule = "-".repeat(self.rule_width());

        let mut lines = vec![self.line(&headers), rule];
        lines.extend(self.rows.iter().map(|row| self.line(row)));
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Section header framed by `=` rules.
pub fn banner(title: &str, width: usize) -> String {
    let rule = "=".repeat(width);
    format!("{}\n{}\n{}\n", rule, title, rule)
}

/// A number with fixed precision and suffix, or `N/A`.
pub fn num(value: Option<f64>, precision: usize, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.*}{}", precision, v, suffix),
        None => "N/A".to_string(),
    }
}
