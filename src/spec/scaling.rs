//! Scaling model spec (model.json): measured points for a strong or weak
//! scaling experiment plus the serial fractions to compare against.
//!
//! JSON shape:
//! {
//!   "kind": "strong",                       // or "weak"
//!   "title": "Strong Scaling ...",          // optional
//!   "workers": [1, 2, 4, 8],
//!   "times":   [682.88, 358.231, 182.656, 97.6342],
//!   "serial_fractions": [0.1, 0.01, 0.001], // optional, defaults per kind
//!   "output": "strong_scaling_speedup_max.png"  // optional
//! }
//!
//! The first point is the baseline for measured speedup.

use crate::Result;
use crate::model::laws::ScalingKind;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ScalingModelSpec {
    pub kind: ScalingKind,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub workers: Vec<u32>,

    #[serde(default)]
    pub times: Vec<f64>,

    #[serde(default)]
    pub serial_fractions: Option<Vec<f64>>,

    #[serde(default)]
    pub output: Option<String>,
}

/// Validated scaling model.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingModel {
    pub kind: ScalingKind,
    pub title: String,
    /// (workers, time) in input order; the first point is the baseline.
    pub points: Vec<(u32, f64)>,
    pub serial_fractions: Vec<f64>,
    pub output: String,
}

impl ScalingModelSpec {
    pub fn validate_and_build(&self) -> Result<ScalingModel> {
        if self.workers.is_empty() {
            bail!("scaling model must list at least one worker count");
        }
        if self.workers.len() != self.times.len() {
            bail!(
                "scaling model has {} worker counts but {} times",
                self.workers.len(),
                self.times.len()
            );
        }
        for (w, t) in self.workers.iter().zip(&self.times) {
            if *w == 0 {
                bail!("worker count must be positive");
            }
            if !(t.is_finite() && *t > 0.0) {
                bail!("time for {} workers must be a positive number, got {}", w, t);
            }
        }

        let serial_fractions = match &self.serial_fractions {
            Some(fractions) => fractions.clone(),
            None => match self.kind {
                ScalingKind::Strong => vec![0.1, 0.01, 0.001],
                ScalingKind::Weak => vec![0.0001, 0.001, 0.01],
            },
        };
        for s in &serial_fractions {
            if !(0.0..=1.0).contains(s) {
                bail!("serial fraction {} is outside [0, 1]", s);
            }
        }

        let (title, output) = match self.kind {
            ScalingKind::Strong => (
                "Strong Scaling: Measured vs. Theoretical Speedup (Amdahl's Law)",
                "strong_scaling_speedup_max.png",
            ),
            ScalingKind::Weak => (
                "Weak Scaling: Measured vs. Theoretical Speedup (Gustafson's Law)",
                "weak_scaling_speedup_max.png",
            ),
        };

        Ok(ScalingModel {
            kind: self.kind,
            title: self.title.clone().unwrap_or_else(|| title.to_string()),
            points: self.workers.iter().copied().zip(self.times.iter().copied()).collect(),
            serial_fractions,
            output: self.output.clone().unwrap_or_else(|| output.to_string()),
        })
    }
}

pub fn load_scaling_model(path: &Path) -> Result<ScalingModel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read scaling model {}", path.display()))?;
    let spec: ScalingModelSpec = serde_json::from_str(&text)
        .with_context(|| format!("parse scaling model {}", path.display()))?;
    spec.validate_and_build()
        .with_context(|| format!("invalid scaling model {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_follow_kind() {
        let spec: ScalingModelSpec = serde_json::from_str(
            r#"{ "kind": "weak", "workers": [1, 4], "times": [10.8437, 11.4552] }"#,
        )
        .unwrap();
        let model = spec.validate_and_build().unwrap();
        assert_eq!(model.kind, ScalingKind::Weak);
        assert_eq!(model.serial_fractions, vec![0.0001, 0.001, 0.01]);
        assert_eq!(model.output, "weak_scaling_speedup_max.png");
        assert_eq!(model.points, vec![(1, 10.8437), (4, 11.4552)]);
    }

    #[test]
    fn rejects_inconsistent_input() {
        let bad = [
            r#"{ "kind": "strong", "workers": [], "times": [] }"#,
            r#"{ "kind": "strong", "workers": [1, 2], "times": [1.0] }"#,
            r#"{ "kind": "strong", "workers": [0], "times": [1.0] }"#,
            r#"{ "kind": "strong", "workers": [1], "times": [0.0] }"#,
            r#"{ "kind": "strong", "workers": [1], "times": [1.0], "serial_fractions": [1.5] }"#,
        ];
        for json in bad {
            let spec: ScalingModelSpec = serde_json::from_str(json).unwrap();
            assert!(spec.validate_and_build().is_err(), "accepted {}", json);
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "kind": "strong", "title": "T", "workers": [1, 2], "times": [4.0, 2.0], "serial_fractions": [0.5] }}"#
        )
        .unwrap();
        let model = load_scaling_model(file.path()).unwrap();
        assert_eq!(model.title, "T");
        assert_eq!(model.serial_fractions, vec![0.5]);
    }
}
