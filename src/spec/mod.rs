//! Spec layer: JSON schemas + validated in-memory structures.
//!
//! This module is intentionally separate from log reading and rendering.
//! It owns:
//! - log grammars (how measurements are matched in a log)
//! - the built-in grammars for every benchmark log family
//! - scaling model configurations (measured points + serial fractions)

pub mod builtin;
pub mod grammar;
pub mod scaling;

pub use builtin::{BUILTIN_NAMES, builtin};
pub use grammar::{Grammar, GrammarSpec, load_grammar_file};
pub use scaling::{ScalingModel, ScalingModelSpec, load_scaling_model};
