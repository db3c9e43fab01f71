//! Aggregation model: fold measurements into timing tables keyed by configuration.
//!
//! Every fold is last-write-wins: a configuration measured twice keeps the
//! later time.

pub mod laws;
pub mod metrics;

use crate::log::Measurement;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Elapsed seconds per configuration key.
pub type TimingTable<K> = BTreeMap<K, f64>;

/// A hybrid run shape: MPI processes × OpenMP threads per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Config {
    pub procs: u32,
    pub threads: u32,
}

impl Config {
    pub fn new(procs: u32, threads: u32) -> Self {
        Self { procs, threads }
    }

    pub fn cores(&self) -> u64 {
        u64::from(self.procs) * u64::from(self.threads)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p×{}t", self.procs, self.threads)
    }
}

/// Label used for measurements that carry no variant.
pub const DEFAULT_VARIANT: &str = "default";

/// Fold measurements into one table; measurements without a key are dropped.
pub fn fold<K: Ord>(
    measurements: &[Measurement],
    key: impl Fn(&Measurement) -> Option<K>,
) -> TimingTable<K> {
    let mut out = TimingTable::new();
    for m in measurements {
        if let Some(k) = key(m) {
            out.insert(k, m.elapsed_seconds);
        }
    }
    out
}

/// Fold measurements into one table per group.
pub fn group<G: Ord, K: Ord>(
    measurements: &[Measurement],
    group: impl Fn(&Measurement) -> Option<G>,
    key: impl Fn(&Measurement) -> Option<K>,
) -> BTreeMap<G, TimingTable<K>> {
    let mut out: BTreeMap<G, TimingTable<K>> = BTreeMap::new();
    for m in measurements {
        if let (Some(g), Some(k)) = (group(m), key(m)) {
            out.entry(g).or_default().insert(k, m.elapsed_seconds);
        }
    }
    out
}

pub fn config_of(m: &Measurement) -> Option<Config> {
    Some(Config::new(m.process_count, m.thread_count?))
}

/// {tile_size: {processes: time}}
pub fn by_tile_then_procs(measurements: &[Measurement]) -> BTreeMap<u32, TimingTable<u32>> {
    group(measurements, |m| m.tile_size, |m| Some(m.process_count))
}

/// {(processes, threads): {tile_size: time}}
pub fn by_config_then_tile(measurements: &[Measurement]) -> BTreeMap<Config, TimingTable<u32>> {
    group(measurements, config_of, |m| m.tile_size)
}

/// {tile_size: {(processes, threads): time}}
pub fn by_tile_then_config(measurements: &[Measurement]) -> BTreeMap<u32, TimingTable<Config>> {
    group(measurements, |m| m.tile_size, config_of)
}

/// {variant: {(processes, threads): time}}
pub fn by_variant_then_config(measurements: &[Measurement]) -> BTreeMap<String, TimingTable<Config>> {
    group(
        measurements,
        |m| {
            Some(
                m.variant
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VARIANT.to_string()),
            )
        },
        config_of,
    )
}

/// A hybrid table split on a held-constant count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phases {
    /// procs == fixed, keyed by threads.
    pub threads: TimingTable<u32>,
    /// threads == fixed, keyed by procs.
    pub procs: TimingTable<u32>,
}

/// Split into "fixed processes, varying threads" and "fixed threads,
/// varying processes". The (fixed, fixed) run lands in both.
pub fn split_phases(table: &TimingTable<Config>, fixed: u32) -> Phases {
    let mut phases = Phases::default();
    for (config, time) in table {
        if config.procs == fixed {
            phases.threads.insert(config.threads, *time);
        }
        if config.threads == fixed {
            phases.procs.insert(config.procs, *time);
        }
    }
    phases
}

/// Sorted union of the keys of several tables.
pub fn union_keys<'a, K: Ord + Clone + 'a>(
    tables: impl IntoIterator<Item = &'a TimingTable<K>>,
) -> Vec<K> {
    let keys: BTreeSet<K> = tables
        .into_iter()
        .flat_map(|t| t.keys().cloned())
        .collect();
    keys.into_iter().collect()
}
