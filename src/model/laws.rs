//! Theoretical scaling laws and measured speedup for strong/weak scaling runs.

use serde::{Deserialize, Serialize};

/// Amdahl's law: speedup of a fixed-size problem on `workers` workers.
pub fn amdahl(serial_fraction: f64, workers: f64) -> f64 {
    1.0 / (serial_fraction + (1.0 - serial_fraction) / workers)
}

/// Gustafson's law: scaled speedup when the problem grows with `workers`.
pub fn gustafson(serial_fraction: f64, workers: f64) -> f64 {
    serial_fraction + workers * (1.0 - serial_fraction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingKind {
    Strong,
    Weak,
}

impl ScalingKind {
    pub fn law_name(self) -> &'static str {
        match self {
            ScalingKind::Strong => "Amdahl's Law",
            ScalingKind::Weak => "Gustafson's Law",
        }
    }

    pub fn theoretical(self, serial_fraction: f64, workers: f64) -> f64 {
        match self {
            ScalingKind::Strong => amdahl(serial_fraction, workers),
            ScalingKind::Weak => gustafson(serial_fraction, workers),
        }
    }

    /// Measured speedup of (`workers`, `time`) against the first point
    /// (`base_workers`, `base_time`). Weak scaling scales the baseline time by
    /// the growth in workers, since the problem grew by the same factor.
    pub fn measured(self, base_workers: f64, base_time: f64, workers: f64, time: f64) -> f64 {
        match self {
            ScalingKind::Strong => base_time / time,
            ScalingKind::Weak => base_time * (workers / base_workers) / time,
        }
    }
}
