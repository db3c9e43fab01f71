//! Presentation: console tables and chart files.

pub mod chart;
pub mod figure;
pub mod table;

pub use chart::render_figure;
pub use figure::{Canvas, Figure, Panel};
pub use table::{Align, TextTable, banner, num};
