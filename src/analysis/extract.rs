//! Run a grammar over a log and print what it matched.

use crate::Result;
use crate::log::{Measurement, parse_log_file};
use crate::render::{Align, TextTable};
use crate::spec::{builtin, load_grammar_file};

use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExtractArgs {
    pub log: PathBuf,

    /// Grammar JSON file.
    #[arg(long, conflicts_with = "builtin", required_unless_present = "builtin")]
    pub grammar: Option<PathBuf>,

    /// Built-in grammar: tiles, hybrid-tiles, hybrid-scaling, collapse, map-out, map-err.
    #[arg(long)]
    pub builtin: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

pub fn table(measurements: &[Measurement]) -> String {
    let mut table = TextTable::new()
        .column("Tile", 6, Align::Right)
        .column("Procs", 6, Align::Right)
        .column("Threads", 8, Align::Right)
        .column("Workers", 8, Align::Right)
        .column("Variant", 14, Align::Left)
        .column("Time (s)", 12, Align::Right);
    for m in measurements {
        table.row(vec![
            opt(&m.tile_size),
            m.process_count.to_string(),
            opt(&m.thread_count),
            m.workers().to_string(),
            opt(&m.variant),
            format!("{:.4}", m.elapsed_seconds),
        ]);
    }
    table.render()
}

pub fn run(args: &ExtractArgs) -> Result<()> {
    let grammar = match (&args.grammar, &args.builtin) {
        (Some(path), _) => load_grammar_file(path)?,
        (None, Some(name)) => builtin(name)?,
        (None, None) => anyhow::bail!("either --grammar or --builtin is required"),
    };
    let measurements = parse_log_file(&args.log, &grammar)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&measurements)?);
    } else {
        print!("{}", table(&measurements));
        println!("{} measurements", measurements.len());
    }
    Ok(())
}
