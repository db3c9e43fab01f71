//! Grammars for the benchmark log families produced by the experiment scripts.

use crate::Result;
use crate::spec::grammar::{Grammar, GrammarMode, GrammarSpec};

use anyhow::bail;

pub const BUILTIN_NAMES: [&str; 6] = [
    "tiles",
    "hybrid-tiles",
    "hybrid-scaling",
    "collapse",
    "map-out",
    "map-err",
];

const MAX_TIME: &str = r"Max Local Computation Time.*?:\s*{time}\s*seconds";

fn spec_for(name: &str) -> Option<GrammarSpec> {
    let spec = match name {
        // === Testing Tile Size: 32x32 ===
        // Running test with tile size 32 at 24 processes...
        // Max Local Computation Time (across all ranks): 15.234 seconds
        "tiles" => GrammarSpec {
            mode: GrammarMode::Lines,
            rules: vec![
                r"Testing Tile Size:\s*{tile}{x}\d+".to_string(),
                r"at {procs} processes".to_string(),
                MAX_TIME.to_string(),
            ],
            ..Default::default()
        },
        // Configuration: 4 Processes × 6 Threads
        //   Tile Size: 16x16 ... Max Local Computation Time ...: 20.1 seconds
        "hybrid-tiles" => GrammarSpec {
            scope: Some(r"Configuration:\s*{procs}\s*Processes\s*{x}\s*{threads}\s*Threads".to_string()),
            record: Some(format!(r"Tile Size:\s*{{tile}}{{x}}\d+.*?{}", MAX_TIME)),
            ..Default::default()
        },
        // TILE SIZE: 16x16
        //   Configuration: 4 Processes × 2 Threads ... Max Local Computation Time ...: 20.1 seconds
        // Hybrid scaling tests completed
        "hybrid-scaling" => GrammarSpec {
            scope: Some(r"TILE SIZE:\s*{tile}{x}\d+".to_string()),
            scope_end: Some("Hybrid scaling tests completed".to_string()),
            record: Some(format!(
                r"Configuration:\s*{{procs}}\s*Processes\s*{{x}}\s*{{threads}}\s*Threads.*?{}",
                MAX_TIME
            )),
            ..Default::default()
        },
        // Running 8 Processes × 4 Threads (collapse)
        // Max Local Computation Time (across all ranks): 12.5 seconds
        "collapse" => GrammarSpec {
            record: Some(
                r"Running {procs} Processes {x} {threads} Threads \({variant}\).*?Max Local Computation Time \(across all ranks\):\s*{time}"
                    .to_string(),
            ),
            ..Default::default()
        },
        // MPI Processes: 16 ... Max Local Computation Time (across all ranks): 24.7 seconds
        "map-out" => GrammarSpec {
            record: Some(
                r"MPI Processes:\s+{procs}.*?Max Local Computation Time \(across all ranks\):\s+{time}\s+seconds"
                    .to_string(),
            ),
            ..Default::default()
        },
        // Profiling ... : mpirun -n 16 ./raytracer
        // Profiling time: 31 seconds
        "map-err" => GrammarSpec {
            mode: GrammarMode::Lines,
            rules: vec![
                r"mpirun -np? {procs}".to_string(),
                r"Profiling time:\s+{time}".to_string(),
            ],
            reset: true,
            ..Default::default()
        },
        _ => return None,
    };
    Some(GrammarSpec {
        name: name.to_string(),
        ..spec
    })
}

/// Look up and compile a built-in grammar by name.
pub fn builtin(name: &str) -> Result<Grammar> {
    match spec_for(name) {
        Some(spec) => spec.validate_and_build(),
        None => bail!(
            "unknown built-in grammar {:?} (available: {})",
            name,
            BUILTIN_NAMES.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Measurement;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_builtin_compiles() {
        for name in BUILTIN_NAMES {
            let grammar = builtin(name).unwrap();
            assert_eq!(grammar.name(), name);
        }
        assert!(builtin("nope").is_err());
    }

    #[test]
    fn tiles_parses_tile_and_time() {
        let text = "=== Testing Tile Size: 32x32 ===\n\
                    Running test with tile size 32x32 at 24 processes...\n\
                    Max Local Computation Time (across all ranks): 15.234 seconds\n";
        assert_eq!(
            builtin("tiles").unwrap().extract(text),
            vec![Measurement {
                tile_size: Some(32),
                process_count: 24,
                thread_count: None,
                variant: None,
                elapsed_seconds: 15.234,
            }]
        );
    }

    #[test]
    fn hybrid_tiles_reads_configuration_blocks() {
        let text = "Configuration: 4 Processes × 6 Threads\n\
                    Tile Size: 16x16\n\
                    Max Local Computation Time (across all ranks): 20.5 seconds\n\
                    Tile Size: 32x32\n\
                    Max Local Computation Time (across all ranks): 18.0 seconds\n\
                    Configuration: 8 Processes x 3 Threads\n\
                    Tile Size: 16x16\n\
                    Max Local Computation Time (across all ranks): 11.0 seconds\n";
        let got: Vec<(u32, Option<u32>, Option<u32>, f64)> = builtin("hybrid-tiles")
            .unwrap()
            .extract(text)
            .into_iter()
            .map(|m| (m.process_count, m.thread_count, m.tile_size, m.elapsed_seconds))
            .collect();
        assert_eq!(
            got,
            vec![
                (4, Some(6), Some(16), 20.5),
                (4, Some(6), Some(32), 18.0),
                (8, Some(3), Some(16), 11.0),
            ]
        );
    }

    #[test]
    fn hybrid_scaling_stops_at_completion_marker() {
        let text = "TILE SIZE: 16x16\n\
                    Configuration: 4 Processes × 2 Threads\n\
                    Max Local Computation Time (across all ranks): 40.0 seconds\n\
                    Configuration: 4 Processes × 4 Threads\n\
                    Max Local Computation Time (across all ranks): 20.0 seconds\n\
                    Hybrid scaling tests completed\n\
                    Configuration: 1 Processes × 1 Threads\n\
                    Max Local Computation Time (across all ranks): 1.0 seconds\n";
        let got: Vec<(Option<u32>, u32, Option<u32>)> = builtin("hybrid-scaling")
            .unwrap()
            .extract(text)
            .into_iter()
            .map(|m| (m.tile_size, m.process_count, m.thread_count))
            .collect();
        assert_eq!(got, vec![(Some(16), 4, Some(2)), (Some(16), 4, Some(4))]);
    }

    #[test]
    fn map_err_pairs_launch_with_profiling_time() {
        let text = "Profiling : mpirun -np 16 ./raytracer\n\
                    MAP: sampling\n\
                    Profiling time: 31 seconds\n\
                    Profiling : mpirun -n 32 ./raytracer\n\
                    Profiling time: 17 seconds\n";
        let got: Vec<(u32, f64)> = builtin("map-err")
            .unwrap()
            .extract(text)
            .into_iter()
            .map(|m| (m.process_count, m.elapsed_seconds))
            .collect();
        assert_eq!(got, vec![(16, 31.0), (32, 17.0)]);
    }
}
