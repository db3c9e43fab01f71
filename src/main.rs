use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod analysis;
mod log;
mod model;
mod render;
mod spec;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "scaling-profile-viz")]
#[command(
    about = "Parse MPI/OpenMP benchmark logs, derive speedup and efficiency, and plot scaling charts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tile-size strong scaling of pure-MPI runs.
    Tiles(analysis::tiles::TilesArgs),

    /// Tile sizes per processes × threads configuration.
    HybridTiles(analysis::hybrid_tiles::HybridTilesArgs),

    /// Thread and process scaling phases per tile size.
    HybridScaling(analysis::hybrid_scaling::HybridScalingArgs),

    /// Code variants (collapse / no_collapse) over both scaling phases.
    Collapse(analysis::collapse::CollapseArgs),

    /// Pure-MPI vs hybrid strong scaling from profiler logs.
    Map(analysis::map::MapArgs),

    /// Measured speedup against Amdahl's or Gustafson's law.
    Model(analysis::model::ModelArgs),

    /// Print the measurements a grammar extracts from a log.
    Extract(analysis::extract::ExtractArgs),
}

fn main() -> Result<()> {
    // Diagnostics go to stderr so tables and JSON on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.cmd {
        Commands::Tiles(args) => analysis::tiles::run(args)?,
        Commands::HybridTiles(args) => analysis::hybrid_tiles::run(args)?,
        Commands::HybridScaling(args) => analysis::hybrid_scaling::run(args)?,
        Commands::Collapse(args) => analysis::collapse::run(args)?,
        Commands::Map(args) => analysis::map::run(args)?,
        Commands::Model(args) => analysis::model::run(args)?,
        Commands::Extract(args) => analysis::extract::run(args)?,
    }

    Ok(())
}
