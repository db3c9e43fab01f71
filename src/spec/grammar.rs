//! Log grammar (grammar.json): how to recover measurements from a log file.
//!
//! JSON shape, block mode (one regex over the whole file, `.` matches newlines):
//! {
//!   "name": "hybrid-scaling",
//!   "mode": "block",
//!   "fields": { "variant": "collapse|no_collapse" },   // optional sub-pattern overrides
//!   "scope": "TILE SIZE:\\s*{tile}{x}\\d+",           // optional block header
//!   "scope_end": "Hybrid scaling tests completed",    // optional block terminator
//!   "record": "Configuration:\\s*{procs}\\s*Processes\\s*{x}\\s*{threads}\\s*Threads.*?:\\s*{time}\\s*seconds"
//! }
//!
//! Line mode (sticky state, one record per line that captures `time`):
//! {
//!   "name": "tiles",
//!   "mode": "lines",
//!   "rules": ["Testing Tile Size:\\s*{tile}{x}\\d+", "at {procs} processes", "Time.*?:\\s*{time}"],
//!   "reset": false
//! }
//!
//! `{tile}`, `{procs}`, `{threads}`, `{variant}` and `{time}` expand to named
//! capture groups; `{x}` accepts either `x` or `×`. Any other braces are left
//! to the regex engine.

use crate::Result;
use crate::log::Measurement;

use anyhow::{Context, bail};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Field names a grammar may capture, with their default sub-patterns.
pub const FIELDS: [(&str, &str); 5] = [
    ("tile", r"\d+"),
    ("procs", r"\d+"),
    ("threads", r"\d+"),
    ("variant", r"\w+"),
    ("time", r"\d+(?:\.\d+)?"),
];

/// Multiplication glyph between two counts.
const TIMES_GLYPH: &str = "[x×]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarMode {
    #[default]
    Block,
    Lines,
}

/// Raw grammar shape as it appears in grammar.json.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrammarSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mode: GrammarMode,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub scope_end: Option<String>,

    #[serde(default)]
    pub record: Option<String>,

    #[serde(default)]
    pub rules: Vec<String>,

    /// Line mode only: forget sticky fields after each emitted record.
    #[serde(default)]
    pub reset: bool,
}

/// Compiled, validated grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    kind: GrammarKind,
}

#[derive(Debug, Clone)]
enum GrammarKind {
    Block {
        scope: Option<Scope>,
        record: Regex,
    },
    Lines {
        rules: Vec<Regex>,
        reset: bool,
    },
}

#[derive(Debug, Clone)]
struct Scope {
    header: Regex,
    end: Option<Regex>,
}

impl GrammarSpec {
    /// Expand field placeholders, compile every template and check that the
    /// grammar can produce a process count and an elapsed time.
    pub fn validate_and_build(&self) -> Result<Grammar> {
        let name = if self.name.is_empty() {
            "custom".to_string()
        } else {
            self.name.clone()
        };

        let mut fields: BTreeMap<&str, String> = FIELDS
            .iter()
            .map(|(field, pattern)| (*field, pattern.to_string()))
            .collect();
        for (field, pattern) in &self.fields {
            match fields.get_mut(field.as_str()) {
                Some(slot) => *slot = pattern.clone(),
                None => bail!(
                    "grammar {}: unknown field {:?} (expected one of tile, procs, threads, variant, time)",
                    name,
                    field
                ),
            }
        }

        let kind = match self.mode {
            GrammarMode::Block => {
                let Some(record) = &self.record else {
                    bail!("grammar {}: block mode requires a \"record\" pattern", name);
                };
                if !self.rules.is_empty() {
                    bail!("grammar {}: \"rules\" are only valid in lines mode", name);
                }
                let record = compile(&name, "record", record, &fields, true)?;
                let scope = match &self.scope {
                    Some(header) => Some(Scope {
                        header: compile(&name, "scope", header, &fields, false)?,
                        end: self
                            .scope_end
                            .as_deref()
                            .map(|end| compile(&name, "scope_end", end, &fields, false))
                            .transpose()?,
                    }),
                    None => {
                        if self.scope_end.is_some() {
                            bail!("grammar {}: \"scope_end\" given without \"scope\"", name);
                        }
                        None
                    }
                };

                if !captures(&record, "time") {
                    bail!("grammar {}: record pattern must capture {{time}}", name);
                }
                let scope_has_procs = scope
                    .as_ref()
                    .map(|s| captures(&s.header, "procs"))
                    .unwrap_or(false);
                if !captures(&record, "procs") && !scope_has_procs {
                    bail!(
                        "grammar {}: record or scope pattern must capture {{procs}}",
                        name
                    );
                }

                GrammarKind::Block { scope, record }
            }
            GrammarMode::Lines => {
                if self.rules.is_empty() {
                    bail!("grammar {}: lines mode requires at least one rule", name);
                }
                if self.record.is_some() || self.scope.is_some() {
                    bail!(
                        "grammar {}: \"record\" and \"scope\" are only valid in block mode",
                        name
                    );
                }
                let mut rules = Vec::with_capacity(self.rules.len());
                for (idx, rule) in self.rules.iter().enumerate() {
                    rules.push(compile(&name, &format!("rules[{}]", idx), rule, &fields, false)?);
                }
                if !rules.iter().any(|r| captures(r, "time")) {
                    bail!("grammar {}: no rule captures {{time}}", name);
                }
                if !rules.iter().any(|r| captures(r, "procs")) {
                    bail!("grammar {}: no rule captures {{procs}}", name);
                }
                GrammarKind::Lines {
                    rules,
                    reset: self.reset,
                }
            }
        };

        Ok(Grammar { name, kind })
    }
}

/// Load and validate a grammar.json file.
pub fn load_grammar_file(path: &Path) -> Result<Grammar> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read grammar file {}", path.display()))?;
    let spec: GrammarSpec = serde_json::from_str(&text)
        .with_context(|| format!("parse grammar file {}", path.display()))?;
    spec.validate_and_build()
        .with_context(|| format!("invalid grammar file {}", path.display()))
}

fn expand(template: &str, fields: &BTreeMap<&str, String>) -> String {
    let mut out = template.replace("{x}", TIMES_GLYPH);
    for (field, pattern) in fields {
        out = out.replace(&format!("{{{}}}", field), &format!("(?P<{}>{})", field, pattern));
    }
    out
}

fn compile(
    grammar: &str,
    what: &str,
    template: &str,
    fields: &BTreeMap<&str, String>,
    dot_all: bool,
) -> Result<Regex> {
    let expanded = expand(template, fields);
    let pattern = if dot_all {
        format!("(?s){}", expanded)
    } else {
        expanded
    };
    Regex::new(&pattern).with_context(|| format!("grammar {}: bad {} pattern", grammar, what))
}

fn captures(re: &Regex, field: &str) -> bool {
    re.capture_names().flatten().any(|n| n == field)
}

/// Fields collected so far; later captures overwrite earlier ones.
#[derive(Debug, Clone, Default)]
struct Partial {
    tile: Option<u32>,
    procs: Option<u32>,
    threads: Option<u32>,
    variant: Option<String>,
    time: Option<f64>,
}

impl Partial {
    fn absorb(&mut self, caps: &Captures) {
        if let Some(v) = number(caps, "tile") {
            self.tile = Some(v);
        }
        if let Some(v) = number(caps, "procs") {
            self.procs = Some(v);
        }
        if let Some(v) = number(caps, "threads") {
            self.threads = Some(v);
        }
        if let Some(v) = caps.name("variant") {
            self.variant = Some(v.as_str().to_string());
        }
        if let Some(v) = number(caps, "time") {
            self.time = Some(v);
        }
    }

    fn finish(&self) -> Option<Measurement> {
        Some(Measurement {
            tile_size: self.tile,
            process_count: self.procs?,
            thread_count: self.threads,
            variant: self.variant.clone(),
            elapsed_seconds: self.time?,
        })
    }
}

fn number<T: std::str::FromStr>(caps: &Captures, field: &str) -> Option<T> {
    let m = caps.name(field)?;
    match m.as_str().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!("ignoring malformed {} value {:?}", field, m.as_str());
            None
        }
    }
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recover every measurement the grammar matches. Text that does not
    /// match, or matches with unparsable numbers, is skipped.
    pub fn extract(&self, text: &str) -> Vec<Measurement> {
        match &self.kind {
            GrammarKind::Block { scope: None, record } => records(record, text, &Partial::default()),
            GrammarKind::Block {
                scope: Some(scope),
                record,
            } => {
                let headers: Vec<Captures> = scope.header.captures_iter(text).collect();
                let mut out = Vec::new();
                for (idx, caps) in headers.iter().enumerate() {
                    let Some(whole) = caps.get(0) else {
                        continue;
                    };
                    let mut end = headers
                        .get(idx + 1)
                        .and_then(|next| next.get(0))
                        .map_or(text.len(), |m| m.start());
                    if let Some(stop) = &scope.end {
                        if let Some(m) = stop.find(&text[whole.end()..end]) {
                            end = whole.end() + m.start();
                        }
                    }

                    let mut inherited = Partial::default();
                    inherited.absorb(caps);
                    out.extend(records(record, &text[whole.start()..end], &inherited));
                }
                out
            }
            GrammarKind::Lines { rules, reset } => {
                let mut state = Partial::default();
                let mut out = Vec::new();
                for (lineno, line) in text.lines().enumerate() {
                    let Some(caps) = rules.iter().find_map(|r| r.captures(line)) else {
                        continue;
                    };
                    state.absorb(&caps);
                    if caps.name("time").is_none() {
                        continue;
                    }
                    match state.finish() {
                        Some(m) => {
                            out.push(m);
                            if *reset {
                                state = Partial::default();
                            }
                        }
                        None => tracing::debug!(
                            "{}: line {} has a time but no process count yet",
                            self.name,
                            lineno + 1
                        ),
                    }
                    state.time = None;
                }
                out
            }
        }
    }
}

fn records(record: &Regex, text: &str, inherited: &Partial) -> Vec<Measurement> {
    let mut out = Vec::new();
    for caps in record.captures_iter(text) {
        let mut partial = inherited.clone();
        partial.absorb(&caps);
        match partial.finish() {
            Some(m) => out.push(m),
            None => tracing::debug!("incomplete record skipped: {:?}", &caps[0]),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(record: &str) -> GrammarSpec {
        GrammarSpec {
            name: "test".to_string(),
            record: Some(record.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn placeholders_expand_to_named_groups() {
        let fields: BTreeMap<&str, String> =
            FIELDS.iter().map(|(f, p)| (*f, p.to_string())).collect();
        assert_eq!(
            expand(r"{procs}\s*{x}\s*{threads}\d{2}", &fields),
            r"(?P<procs>\d+)\s*[x×]\s*(?P<threads>\d+)\d{2}"
        );
    }

    #[test]
    fn block_record_spans_lines() {
        let grammar = block(
            r"Running {procs} Processes {x} {threads} Threads \({variant}\).*?Max Local Computation Time \(across all ranks\):\s*{time}",
        )
        .validate_and_build()
        .unwrap();

        let text = "Running 8 Processes × 4 Threads (collapse)\n\
                    rank 0 done\n\
                    Max Local Computation Time (across all ranks): 12.5 seconds\n\
                    Running 8 Processes x 8 Threads (no_collapse)\n\
                    Max Local Computation Time (across all ranks): 7.25 seconds\n";

        assert_eq!(
            grammar.extract(text),
            vec![
                Measurement {
                    tile_size: None,
                    process_count: 8,
                    thread_count: Some(4),
                    variant: Some("collapse".to_string()),
                    elapsed_seconds: 12.5,
                },
                Measurement {
                    tile_size: None,
                    process_count: 8,
                    thread_count: Some(8),
                    variant: Some("no_collapse".to_string()),
                    elapsed_seconds: 7.25,
                },
            ]
        );
    }

    #[test]
    fn scoped_blocks_inherit_header_fields() {
        let spec = GrammarSpec {
            name: "scoped".to_string(),
            scope: Some(r"TILE SIZE:\s*{tile}{x}\d+".to_string()),
            scope_end: Some("tests completed".to_string()),
            record: Some(
                r"Configuration:\s*{procs}\s*Processes\s*{x}\s*{threads}\s*Threads.*?Time.*?:\s*{time}\s*seconds"
                    .to_string(),
            ),
            ..Default::default()
        };
        let grammar = spec.validate_and_build().unwrap();

        let text = "TILE SIZE: 16x16\n\
                    Configuration: 4 Processes × 2 Threads\n\
                    Max Time: 10.0 seconds\n\
                    TILE SIZE: 32x32\n\
                    Configuration: 4 Processes × 4 Threads\n\
                    Max Time: 6.0 seconds\n\
                    tests completed\n\
                    Configuration: 9 Processes × 9 Threads\n\
                    Max Time: 1.0 seconds\n";

        let got: Vec<(Option<u32>, u32, Option<u32>, f64)> = grammar
            .extract(text)
            .into_iter()
            .map(|m| (m.tile_size, m.process_count, m.thread_count, m.elapsed_seconds))
            .collect();
        assert_eq!(
            got,
            vec![(Some(16), 4, Some(2), 10.0), (Some(32), 4, Some(4), 6.0)]
        );
    }

    #[test]
    fn line_rules_keep_sticky_state() {
        let spec = GrammarSpec {
            name: "lines".to_string(),
            mode: GrammarMode::Lines,
            rules: vec![
                r"Testing Tile Size:\s*{tile}x\d+".to_string(),
                r"at {procs} processes".to_string(),
                r"Max Local Computation Time.*?:\s*{time}\s*seconds".to_string(),
            ],
            ..Default::default()
        };
        let grammar = spec.validate_and_build().unwrap();

        let text = "Max Local Computation Time (across all ranks): 99.0 seconds\n\
                    === Testing Tile Size: 32x32 ===\n\
                    Running test with tile size 32 at 20 processes...\n\
                    Max Local Computation Time (across all ranks): 15.234 seconds\n\
                    Running test with tile size 32 at 40 processes...\n\
                    garbage line\n\
                    Max Local Computation Time (across all ranks): 8.5 seconds\n";

        let got: Vec<(Option<u32>, u32, f64)> = grammar
            .extract(text)
            .into_iter()
            .map(|m| (m.tile_size, m.process_count, m.elapsed_seconds))
            .collect();
        assert_eq!(got, vec![(Some(32), 20, 15.234), (Some(32), 40, 8.5)]);
    }

    #[test]
    fn reset_forgets_process_count_after_record() {
        let spec = GrammarSpec {
            mode: GrammarMode::Lines,
            rules: vec![
                r"mpirun -np? {procs}".to_string(),
                r"Profiling time:\s+{time}".to_string(),
            ],
            reset: true,
            ..Default::default()
        };
        let grammar = spec.validate_and_build().unwrap();

        let text = "Profiling: mpirun -n 4 ./app\nProfiling time: 120 seconds\nProfiling time: 5 seconds\n";
        let got: Vec<(u32, f64)> = grammar
            .extract(text)
            .into_iter()
            .map(|m| (m.process_count, m.elapsed_seconds))
            .collect();
        assert_eq!(got, vec![(4, 120.0)]);
    }

    #[test]
    fn field_overrides_narrow_matches() {
        let mut spec = block(r"{procs} ranks \({variant}\): {time}");
        spec.fields
            .insert("variant".to_string(), "collapse|no_collapse".to_string());
        let grammar = spec.validate_and_build().unwrap();

        let got = grammar.extract("4 ranks (collapse): 1.5\n4 ranks (other): 2.0\n");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].variant.as_deref(), Some("collapse"));
    }

    #[test]
    fn validation_rejects_incomplete_grammars() {
        let err = block(r"{procs} ranks").validate_and_build().unwrap_err();
        assert!(err.to_string().contains("{time}"));

        let err = block(r"took {time}").validate_and_build().unwrap_err();
        assert!(err.to_string().contains("{procs}"));

        let mut spec = block(r"{procs} {time}");
        spec.fields.insert("nodes".to_string(), r"\d+".to_string());
        let err = spec.validate_and_build().unwrap_err();
        assert!(err.to_string().contains("unknown field"));

        let spec = GrammarSpec {
            mode: GrammarMode::Lines,
            ..Default::default()
        };
        assert!(spec.validate_and_build().is_err());
    }

    #[test]
    fn grammar_json_round_trips_through_serde() {
        let json = r#"{
            "name": "from-json",
            "mode": "lines",
            "rules": ["P={procs}", "T={time}"]
        }"#;
        let spec: GrammarSpec = serde_json::from_str(json).unwrap();
        let grammar = spec.validate_and_build().unwrap();
        assert_eq!(grammar.name(), "from-json");
        assert_eq!(grammar.extract("P=2\nT=3.5\n").len(), 1);
    }

    #[test]
    fn load_grammar_file_reports_path() {
        let err = load_grammar_file(Path::new("/nonexistent/grammar.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/grammar.json"));
    }
}
