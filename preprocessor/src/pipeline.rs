// pipeline.rs — Pipeline state and pass orchestration
//
// Runs the preprocessing passes in order over one source text. Every symbol
// table is created inside the run and handed back in the result, so nothing
// survives between invocations and concurrent callers never share state.
//
// Preconditions: none.
// Postconditions: on success, the text after `terminal` plus all tables and
//                 warnings produced on the way.
// Failure modes: the first pass error aborts the run; no text is returned.
// Side effects: a `tracing` debug event per completed pass.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::diag::{Diagnostic, PreprocessError};
use crate::dispatch::{DispatchTable, Parameter};
use crate::enums::EnumTable;
use crate::id::FunctionId;
use crate::pass::{descriptor, required_passes, PassId};

/// First line written by the command-line wrapper.
pub const BANNER: &str = "/* Generated by: JSFX Pre-Processor */";

// ── Results ────────────────────────────────────────────────────────────────

/// Text and symbol tables produced by one pipeline run.
#[derive(Debug)]
pub struct Preprocessed {
    pub output: String,
    pub warnings: Vec<Diagnostic>,
    pub enums: EnumTable,
    pub dispatch: DispatchTable,
    /// Passes that ran, in order.
    pub passes: Vec<PassId>,
}

impl Preprocessed {
    /// Serializable view of the symbol tables.
    pub fn symbols(&self) -> SymbolReport {
        SymbolReport::new(&self.enums, &self.dispatch)
    }
}

/// A pass failed; no output is produced.
#[derive(Debug, Error)]
#[error("{failing_pass}: {error}")]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
    #[source]
    pub error: PreprocessError,
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run every pass over `source`.
pub fn preprocess(source: &str) -> Result<Preprocessed, PreprocessError> {
    run_pipeline(source, PassId::SynthesizeDispatch).map_err(|e| e.error)
}

/// Run the passes needed to produce the output of `terminal`.
pub fn run_pipeline(source: &str, terminal: PassId) -> Result<Preprocessed, PipelineError> {
    let passes = required_passes(terminal);
    let mut state = Preprocessed {
        output: source.to_string(),
        warnings: Vec::new(),
        enums: EnumTable::new(),
        dispatch: DispatchTable::new(),
        passes: Vec::with_capacity(passes.len()),
    };

    for &pass_id in &passes {
        let t = Instant::now();
        let fail = |error| PipelineError {
            failing_pass: pass_id,
            error,
        };
        match pass_id {
            PassId::ExpandSequences => {
                state.output = crate::sequence::expand_sequences(&state.output).map_err(fail)?;
            }
            PassId::AllocateEnums => {
                let result = crate::enums::allocate_enums(&state.output).map_err(fail)?;
                state.output = result.text;
                state.enums = result.table;
                state.warnings.extend(result.warnings);
            }
            PassId::SynthesizeDispatch => {
                let result = crate::dispatch::synthesize_dispatch(&state.output).map_err(fail)?;
                state.output = result.text;
                state.dispatch = result.table;
            }
        }
        let desc = descriptor(pass_id);
        tracing::debug!(
            pass = desc.name,
            elapsed_ms = t.elapsed().as_secs_f64() * 1000.0,
            bytes = state.output.len(),
            postcondition = desc.invariants,
            "pass complete"
        );
        state.passes.push(pass_id);
    }

    Ok(state)
}

// ── Symbol report ──────────────────────────────────────────────────────────

/// Symbol tables of one run, for `--emit symbols`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolReport {
    pub enums: Vec<EnumReport>,
    pub dispatch: Vec<DispatchReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumReport {
    pub group: String,
    pub count: u64,
    pub count_uses: u32,
    pub values: Vec<EnumValueReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValueReport {
    pub suffix: String,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub group: String,
    pub parameters: Vec<String>,
    pub functions: Vec<FunctionReport>,
    pub tree_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionReport {
    pub name: String,
    pub id: FunctionId,
}

impl SymbolReport {
    pub fn new(enums: &EnumTable, dispatch: &DispatchTable) -> Self {
        let enums = enums
            .groups()
            .map(|g| EnumReport {
                group: g.name().to_string(),
                count: g.peek(),
                count_uses: g.count_uses(),
                values: g
                    .ordered_suffixes()
                    .iter()
                    .filter_map(|s| {
                        g.id_of(s).map(|id| EnumValueReport {
                            suffix: s.clone(),
                            id,
                        })
                    })
                    .collect(),
            })
            .collect();
        let dispatch = dispatch
            .groups()
            .map(|g| DispatchReport {
                group: g.name().to_string(),
                parameters: g.parameters().iter().map(Parameter::signature).collect(),
                functions: g
                    .functions()
                    .map(|(name, id)| FunctionReport {
                        name: name.to_string(),
                        id,
                    })
                    .collect(),
                tree_depth: g.tree().depth(),
            })
            .collect();
        Self { enums, dispatch }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds.
///
/// `source_hash`: SHA-256 of the raw source text.
/// `preprocessor_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub preprocessor_version: &'static str,
}

#[derive(Serialize)]
struct ProvenanceJson<'a> {
    source_hash: String,
    preprocessor_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    /// Serialize provenance as JSON for `--emit build-info`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ProvenanceJson {
            source_hash: self.source_hash_hex(),
            preprocessor_version: self.preprocessor_version,
        })
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Compute provenance from source text.
pub fn compute_provenance(source: &str) -> Provenance {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let mut source_hash = [0u8; 32];
    source_hash.copy_from_slice(&hasher.finalize());

    Provenance {
        source_hash,
        preprocessor_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::GroupKind;

    const SOURCE: &str = "\
{#k=0,1}voice#vk;{#}
n = voice#;
function {fx}(x) ();
a = {fx}gain;
y = {fx: a}(spl0);
";

    #[test]
    fn full_run_applies_passes_in_order() {
        let result = preprocess(SOURCE).expect("preprocess");
        assert_eq!(result.passes, required_passes(PassId::SynthesizeDispatch));
        assert!(result.output.starts_with("0/*voice:v0*/;1/*voice:v1*/;\nn = 2/*voice: v0, v1*/;\n"));
        assert!(result.output.contains("a = 1/*gain*/;\n"));
        assert!(result.output.ends_with("y = fx(a, spl0);\n"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn terminal_pass_stops_early() {
        let result = run_pipeline(SOURCE, PassId::ExpandSequences).expect("expand");
        assert_eq!(result.passes, vec![PassId::ExpandSequences]);
        assert!(result.output.starts_with("voice#v0;voice#v1;\n"));
        assert!(result.enums.is_empty());
        assert!(result.dispatch.is_empty());
    }

    #[test]
    fn failing_pass_is_reported() {
        let err = run_pipeline("{g}foo", PassId::SynthesizeDispatch).unwrap_err();
        assert_eq!(err.failing_pass, PassId::SynthesizeDispatch);
        assert!(matches!(
            err.error,
            PreprocessError::UndefinedGroup {
                kind: GroupKind::Dispatch,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "synthesize_dispatch: reference to undefined function group `g`: {g}foo"
        );
    }

    #[test]
    fn runs_do_not_share_tables() {
        let first = preprocess("k#a k#b k#").expect("first");
        let second = preprocess("k#z k#").expect("second");
        assert_eq!(first.output, "0/*k:a*/ 1/*k:b*/ 2/*k: a, b*/");
        assert_eq!(second.output, "0/*k:z*/ 1/*k: z*/");
    }

    #[test]
    fn symbol_report_lists_tables() {
        let report = preprocess(SOURCE).expect("preprocess").symbols();
        assert_eq!(
            report.enums,
            vec![EnumReport {
                group: "voice".into(),
                count: 2,
                count_uses: 1,
                values: vec![
                    EnumValueReport { suffix: "v0".into(), id: 0 },
                    EnumValueReport { suffix: "v1".into(), id: 1 },
                ],
            }]
        );
        assert_eq!(report.dispatch.len(), 1);
        assert_eq!(report.dispatch[0].parameters, vec!["x".to_string()]);
        assert_eq!(
            report.dispatch[0].functions,
            vec![FunctionReport { name: "gain".into(), id: FunctionId(1) }]
        );
        assert_eq!(report.dispatch[0].tree_depth, 1);
    }

    #[test]
    fn symbol_report_serializes() {
        let report = preprocess("k#a k#").expect("preprocess").symbols();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["enums"][0]["group"], "k");
        assert_eq!(json["enums"][0]["values"][0]["id"], 0);
        assert_eq!(json["dispatch"], serde_json::json!([]));
    }

    #[test]
    fn provenance_is_deterministic() {
        let a = compute_provenance("k#a");
        let b = compute_provenance("k#a");
        let c = compute_provenance("k#b");
        assert_eq!(a.source_hash, b.source_hash);
        assert_ne!(a.source_hash, c.source_hash);
        assert_eq!(a.source_hash_hex().len(), 64);
    }

    #[test]
    fn provenance_of_empty_source() {
        let p = compute_provenance("");
        assert_eq!(
            p.source_hash_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
