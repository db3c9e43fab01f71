//! Derived metrics over a timing table: speedup, efficiency, relative-to-best.
//!
//! A group whose baseline is missing, or whose baseline time is not a positive
//! finite number, gets an empty derived table and a warning. A single
//! configuration with an unusable time is left out of the derived table.

use crate::model::{Config, TimingTable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Number of workers a configuration key stands for.
pub trait Workers {
    fn workers(&self) -> f64;
}

impl Workers for u32 {
    fn workers(&self) -> f64 {
        f64::from(*self)
    }
}

impl Workers for Config {
    fn workers(&self) -> f64 {
        self.cores() as f64
    }
}

/// Reference configuration for speedup.
#[derive(Debug, Clone, PartialEq)]
pub enum Baseline<K> {
    /// The smallest key in the table.
    Smallest,
    Key(K),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derived<K: Ord> {
    pub baseline: Option<K>,
    pub speedup: BTreeMap<K, f64>,
    pub efficiency: BTreeMap<K, f64>,
}

impl<K: Ord> Derived<K> {
    fn empty() -> Self {
        Self {
            baseline: None,
            speedup: BTreeMap::new(),
            efficiency: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.speedup.is_empty()
    }
}

fn usable(time: f64) -> bool {
    time.is_finite() && time > 0.0
}

/// Speedup = T(baseline) / T(k); efficiency = speedup / (workers(k) /
/// workers(baseline)) × 100. `group` names the series in warnings.
pub fn derive<K>(group: &str, table: &TimingTable<K>, baseline: &Baseline<K>) -> Derived<K>
where
    K: Ord + Clone + Workers + fmt::Display,
{
    let base_key = match baseline {
        Baseline::Smallest => match table.keys().next() {
            Some(k) => k.clone(),
            None => return Derived::empty(),
        },
        Baseline::Key(k) => k.clone(),
    };

    let Some(&base_time) = table.get(&base_key) else {
        warn!(
            "reference configuration {} not found for {}; speedup omitted",
            base_key, group
        );
        return Derived::empty();
    };
    if !usable(base_time) {
        warn!(
            "reference time {} for {} at {} is not positive; speedup omitted",
            base_time, group, base_key
        );
        return Derived::empty();
    }

    let base_workers = base_key.workers();
    let mut out = Derived::empty();
    for (key, time) in table {
        if !usable(*time) {
            warn!("{}: skipping {} with unusable time {}", group, key, time);
            continue;
        }
        let speedup = base_time / time;
        out.speedup.insert(key.clone(), speedup);

        let scale = key.workers() / base_workers;
        if scale > 0.0 && scale.is_finite() {
            out.efficiency.insert(key.clone(), speedup / scale * 100.0);
        }
    }
    out.baseline = Some(base_key);
    out
}

/// Linear speedup a configuration would reach over the baseline.
pub fn ideal_speedup<K: Workers>(key: &K, baseline: &K) -> f64 {
    key.workers() / baseline.workers()
}

/// Fastest configuration of a table and every time relative to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Best<K: Ord> {
    pub key: K,
    pub time: f64,
    /// T(k) / T(best); 1.0 for the best key.
    pub relative: BTreeMap<K, f64>,
}

pub fn relative_to_best<K: Ord + Clone>(table: &TimingTable<K>) -> Option<Best<K>> {
    let (key, time) = table
        .iter()
        .filter(|(_, t)| usable(**t))
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let relative = table
        .iter()
        .filter(|(_, t)| usable(**t))
        .map(|(k, t)| (k.clone(), t / time))
        .collect();
    Some(Best {
        key: key.clone(),
        time: *time,
        relative,
    })
}
