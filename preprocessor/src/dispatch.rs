// dispatch.rs — Symbolic function dispatch
//
// Recognises, in order:
//   1. declarations   `function {GROUP}(P1, P2*, ...)`  → group table
//   2. call sites     `{GROUP} FUNC`                    → `ID/*FUNC*/`
//   3. declarations again, each replaced by a synthesized dispatcher
//   4. shorthands     `{GROUP: EXPR}(ARGS)`             → `GROUP(EXPR, ARGS)`
//
// JSFX has no function pointers, so a dispatcher takes an integer selector
// and walks a balanced comparison tree (see `tree`) down to a direct call.
//
// Preconditions: none.
// Postconditions: no dispatch macro syntax remains.
// Failure modes: UndefinedGroup for call sites or shorthands naming an
//                undeclared group; DuplicateDispatchGroup; IdSpaceExhausted
//                past `u32::MAX` functions.
// Side effects: none.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::diag::{GroupKind, PreprocessError};
use crate::id::{FunctionId, SequentialAllocator};
use crate::rewrite::{group, try_replace_all, DISPATCH_NAME};
use crate::tree::{self, DispatchTree};

/// Name of the generated selector parameter.
pub const SELECTOR: &str = "function_id";

/// Marks a by-reference parameter in a declaration.
const REFERENCE_MARKER: char = '*';

// ── Patterns ────────────────────────────────────────────────────────────────

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let n = DISPATCH_NAME;
        Regex::new(&format!(
            r"function\s*\{{\s*({n})\s*\}}\s*\(\s*({n}\*?(?:\s*,\s*{n}\*?)*)?\s*\)"
        ))
        .expect("declaration pattern is valid")
    })
}

fn call_site_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let n = DISPATCH_NAME;
        Regex::new(&format!(r"\{{\s*({n})\s*\}}\s*({n})")).expect("call site pattern is valid")
    })
}

fn shorthand_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let n = DISPATCH_NAME;
        Regex::new(&format!(r"\{{\s*({n})\s*:([^}}]*)\}}\s*\(([^)]*)\)"))
            .expect("shorthand pattern is valid")
    })
}

// ── Parameters ──────────────────────────────────────────────────────────────

/// One formal parameter of a dispatch group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub by_reference: bool,
}

impl Parameter {
    /// Canonicalize the `index`-th declared parameter. Positional names
    /// (`arg0`, `arg7`, ...) and the selector name are renumbered to
    /// `arg{index}`.
    pub fn canonical(raw: &str, index: usize) -> Self {
        let raw = raw.trim();
        let (base, by_reference) = match raw.strip_suffix(REFERENCE_MARKER) {
            Some(base) => (base, true),
            None => (raw, false),
        };
        let name = if is_positional(base) || base == SELECTOR {
            format!("arg{index}")
        } else {
            base.to_string()
        };
        Self { name, by_reference }
    }

    /// Form used in the dispatcher's signature (marker kept).
    pub fn signature(&self) -> String {
        if self.by_reference {
            format!("{}{}", self.name, REFERENCE_MARKER)
        } else {
            self.name.clone()
        }
    }
}

fn is_positional(name: &str) -> bool {
    name.strip_prefix("arg")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

// ── Group state ─────────────────────────────────────────────────────────────

/// One declared dispatch group.
#[derive(Debug, Clone)]
pub struct DispatchGroup {
    name: String,
    parameters: Vec<Parameter>,
    ids: SequentialAllocator,
    id_of: HashMap<String, FunctionId>,
    ordered_functions: Vec<String>,
}

impl DispatchGroup {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
            ids: SequentialAllocator::starting_at(1),
            id_of: HashMap::new(),
            ordered_functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Id of `function`, allocating the next one on first reference.
    /// Never returns the sentinel.
    pub fn allocate(&mut self, function: &str) -> Result<FunctionId, PreprocessError> {
        if let Some(&id) = self.id_of.get(function) {
            return Ok(id);
        }
        let id = self
            .ids
            .allocate()
            .and_then(|raw| u32::try_from(raw).ok())
            .map(FunctionId)
            .ok_or_else(|| PreprocessError::IdSpaceExhausted {
                kind: GroupKind::Dispatch,
                group: self.name.clone(),
            })?;
        self.id_of.insert(function.to_string(), id);
        self.ordered_functions.push(function.to_string());
        Ok(id)
    }

    /// Id the next new function would receive.
    pub fn peek(&self) -> FunctionId {
        FunctionId(u32::try_from(self.ids.peek()).unwrap_or(u32::MAX))
    }

    pub fn id_of(&self, function: &str) -> Option<FunctionId> {
        self.id_of.get(function).copied()
    }

    /// Functions with their ids, in first-reference order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, FunctionId)> {
        self.ordered_functions
            .iter()
            .map(|f| (f.as_str(), self.id_of[f]))
    }

    /// Decision tree over the sentinel and every allocated id.
    pub fn tree(&self) -> DispatchTree {
        let mut ids: Vec<FunctionId> = std::iter::once(FunctionId::NONE)
            .chain(self.functions().map(|(_, id)| id))
            .collect();
        ids.sort();
        DispatchTree::build(&ids)
    }

    /// JSFX source of the dispatcher function.
    pub fn dispatcher_source(&self) -> String {
        let args = self
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let callee: HashMap<FunctionId, &str> = self.functions().map(|(f, id)| (id, f)).collect();
        let call = |id: FunctionId| match callee.get(&id) {
            Some(function) => format!("{function}({args})"),
            None => "0".to_string(),
        };
        let body = tree::render(&self.tree(), SELECTOR, &call);

        let signature = std::iter::once(SELECTOR.to_string())
            .chain(self.parameters.iter().map(Parameter::signature))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "function {}({}) ({};\n);",
            self.name,
            signature,
            tree::indent(&body)
        )
    }
}

/// All dispatch groups declared during one invocation.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    groups: BTreeMap<String, DispatchGroup>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, parameters: Vec<Parameter>) -> Result<(), PreprocessError> {
        if self.groups.contains_key(name) {
            return Err(PreprocessError::DuplicateDispatchGroup {
                group: name.to_string(),
            });
        }
        self.groups
            .insert(name.to_string(), DispatchGroup::new(name, parameters));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DispatchGroup> {
        self.groups.get(name)
    }

    fn lookup(&self, name: &str, reference: &str) -> Result<&DispatchGroup, PreprocessError> {
        self.groups.get(name).ok_or_else(|| undefined(name, reference))
    }

    fn lookup_mut(&mut self, name: &str, reference: &str) -> Result<&mut DispatchGroup, PreprocessError> {
        self.groups
            .get_mut(name)
            .ok_or_else(|| undefined(name, reference))
    }

    /// Groups in name order.
    pub fn groups(&self) -> impl Iterator<Item = &DispatchGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn undefined(name: &str, reference: &str) -> PreprocessError {
    PreprocessError::UndefinedGroup {
        kind: GroupKind::Dispatch,
        group: name.to_string(),
        reference: reference.to_string(),
    }
}

fn parse_parameters(list: &str) -> Vec<Parameter> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',')
        .enumerate()
        .map(|(index, raw)| Parameter::canonical(raw, index))
        .collect()
}

// ── Pass driver ─────────────────────────────────────────────────────────────

/// Output of the dispatch pass.
#[derive(Debug)]
pub struct DispatchOutput {
    pub text: String,
    pub table: DispatchTable,
}

/// Run declaration, call-site, synthesis and shorthand rewriting over
/// `source` with a fresh table.
pub fn synthesize_dispatch(source: &str) -> Result<DispatchOutput, PreprocessError> {
    let mut table = DispatchTable::new();

    for caps in declaration_re().captures_iter(source) {
        table.declare(group(&caps, 1), parse_parameters(group(&caps, 2)))?;
    }

    let text = try_replace_all(call_site_re(), source, |caps| {
        let (name, function) = (group(caps, 1), group(caps, 2));
        let id = table.lookup_mut(name, group(caps, 0))?.allocate(function)?;
        Ok(format!("{id}/*{function}*/"))
    })?;

    let text = try_replace_all(declaration_re(), &text, |caps| {
        let name = group(caps, 1);
        Ok(table.lookup(name, group(caps, 0))?.dispatcher_source())
    })?;

    let text = try_replace_all(shorthand_re(), &text, |caps| {
        let (name, expr, args) = (group(caps, 1), group(caps, 2).trim(), group(caps, 3).trim());
        table.lookup(name, group(caps, 0))?;
        if args.is_empty() {
            Ok(format!("{name}({expr})"))
        } else {
            Ok(format!("{name}({expr}, {args})"))
        }
    })?;

    Ok(DispatchOutput { text, table })
}

// ── Tests ───────────────────────────────────────────────────────────────────
