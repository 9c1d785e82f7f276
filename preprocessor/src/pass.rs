// pass.rs — Pass descriptor module: metadata, dependency resolution, artifacts
//
// Declares the three preprocessing passes and the order they depend on each
// other in. The pipeline runner uses this to run only the prefix needed for
// an intermediate `--emit` target, and logs each pass under its descriptor.

use std::collections::HashSet;
use std::fmt;

// ── Pass identifiers ───────────────────────────────────────────────────────

/// Identifies each preprocessing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    ExpandSequences,
    AllocateEnums,
    SynthesizeDispatch,
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", descriptor(*self).name)
    }
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a preprocessing pass.
pub struct PassDescriptor {
    /// Human-readable name for logs and verbose output.
    pub name: &'static str,
    /// Passes whose output text this pass consumes.
    pub inputs: &'static [PassId],
    /// Postcondition, reported with the pass in debug logs.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::ExpandSequences => PassDescriptor {
            name: "expand_sequences",
            inputs: &[],
            invariants: "every closed, well-formed range block unrolled",
        },
        PassId::AllocateEnums => PassDescriptor {
            name: "allocate_enums",
            inputs: &[PassId::ExpandSequences],
            invariants: "enum references and counts replaced by numeric literals",
        },
        PassId::SynthesizeDispatch => PassDescriptor {
            name: "synthesize_dispatch",
            inputs: &[PassId::AllocateEnums],
            invariants: "declarations replaced by balanced dispatchers",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in execution order.
pub const ALL_PASSES: [PassId; 3] = [
    PassId::ExpandSequences,
    PassId::AllocateEnums,
    PassId::SynthesizeDispatch,
];

/// Compute the ordered set of passes needed to produce `terminal`.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
