// enums.rs — Auto-numbered enumerations (`KEY#SUFFIX`, `KEY#SUFFIX(N)`, `KEY#`, `KEY##`)
//
// Three whole-text passes, each completing before the next starts:
//   A. forced values `KEY#SUFFIX(N)` are bound and rewritten to `KEY#SUFFIX`;
//   B. references `KEY#SUFFIX` become numeric ids (existing or freshly allocated);
//   C. count markers `KEY#` / `KEY##` become the group's current total.
// Forcing runs first so that a forced suffix already has its id wherever a
// plain reference to it appears.
//
// Preconditions: none.
// Postconditions: no enum macro syntax remains; every group that was never
//                 counted yields a W0101 warning.
// Failure modes: InvalidForcedValue, ConflictingForcedAssignment,
//                UndefinedGroup, GroupCountedTwice, IdSpaceExhausted. The
//                first one aborts.
// Side effects: warnings are also logged through `tracing`.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::diag::{codes, DiagLevel, Diagnostic, GroupKind, PreprocessError};
use crate::id::SequentialAllocator;
use crate::rewrite::{group, try_replace_all, ENUM_NAME};

// ── Patterns ────────────────────────────────────────────────────────────────

fn forced_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"({ENUM_NAME})#({ENUM_NAME})\(([0-9]+)\)"))
            .expect("forced enum pattern is valid")
    })
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"({ENUM_NAME})#({ENUM_NAME})")).expect("enum reference pattern is valid")
    })
}

fn count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"({ENUM_NAME})#(#?)")).expect("enum count pattern is valid"))
}

// ── Group state ─────────────────────────────────────────────────────────────

/// One enumeration namespace.
#[derive(Debug, Clone)]
pub struct EnumGroup {
    name: String,
    ids: SequentialAllocator,
    assigned: HashMap<String, u64>,
    forced: HashMap<u64, String>,
    ordered_suffixes: Vec<String>,
    count_uses: u32,
    counted_once_only: bool,
}

/// How a count marker was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountUse {
    pub total: u64,
    /// True for the first count marker of the group.
    pub first: bool,
}

impl EnumGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ids: SequentialAllocator::new(),
            assigned: HashMap::new(),
            forced: HashMap::new(),
            ordered_suffixes: Vec::new(),
            count_uses: 0,
            counted_once_only: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `suffix` to the explicit value `value`. The group total must
    /// stay representable, so `u64::MAX` itself cannot be forced.
    pub fn force(&mut self, suffix: &str, value: u64) -> Result<(), PreprocessError> {
        let floor = value
            .checked_add(1)
            .ok_or_else(|| PreprocessError::InvalidForcedValue {
                group: self.name.clone(),
                suffix: suffix.to_string(),
                literal: value.to_string(),
            })?;
        self.ids.raise_floor(floor);
        if let Some(existing) = self.forced.get(&value) {
            if existing != suffix {
                return Err(self.conflict(format!(
                    "{value} bound to both `{existing}` and `{suffix}`"
                )));
            }
        }
        if let Some(&existing) = self.assigned.get(suffix) {
            if existing != value {
                return Err(self.conflict(format!(
                    "`{suffix}` forced to both {existing} and {value}"
                )));
            }
        }
        self.forced.insert(value, suffix.to_string());
        if self.assigned.insert(suffix.to_string(), value).is_none() {
            self.ordered_suffixes.push(suffix.to_string());
        }
        Ok(())
    }

    /// Id of `suffix`, allocating the next free one on first reference.
    pub fn reference(&mut self, suffix: &str) -> Result<u64, PreprocessError> {
        if let Some(&id) = self.assigned.get(suffix) {
            return Ok(id);
        }
        let id = self
            .ids
            .allocate()
            .ok_or_else(|| PreprocessError::IdSpaceExhausted {
                kind: GroupKind::Enum,
                group: self.name.clone(),
            })?;
        self.assigned.insert(suffix.to_string(), id);
        self.ordered_suffixes.push(suffix.to_string());
        Ok(id)
    }

    /// Record a count marker. `once_only` is the `KEY##` form.
    pub fn count(&mut self, once_only: bool) -> Result<CountUse, PreprocessError> {
        if self.assigned.is_empty() {
            let marker = if once_only { "##" } else { "#" };
            return Err(PreprocessError::UndefinedGroup {
                kind: GroupKind::Enum,
                group: self.name.clone(),
                reference: format!("{}{}", self.name, marker),
            });
        }
        if self.counted_once_only || (once_only && self.count_uses > 0) {
            return Err(PreprocessError::GroupCountedTwice {
                group: self.name.clone(),
            });
        }
        self.count_uses += 1;
        self.counted_once_only = once_only;
        Ok(CountUse {
            total: self.ids.peek(),
            first: self.count_uses == 1,
        })
    }

    /// Total number of values the group spans (the next free id).
    pub fn peek(&self) -> u64 {
        self.ids.peek()
    }

    pub fn id_of(&self, suffix: &str) -> Option<u64> {
        self.assigned.get(suffix).copied()
    }

    /// Suffixes in first-assignment order.
    pub fn ordered_suffixes(&self) -> &[String] {
        &self.ordered_suffixes
    }

    pub fn count_uses(&self) -> u32 {
        self.count_uses
    }

    fn conflict(&self, detail: String) -> PreprocessError {
        PreprocessError::ConflictingForcedAssignment {
            group: self.name.clone(),
            detail,
        }
    }
}

/// All enum groups seen during one invocation, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    groups: BTreeMap<String, EnumGroup>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group `key`, created on first use.
    pub fn group_mut(&mut self, key: &str) -> &mut EnumGroup {
        self.groups
            .entry(key.to_string())
            .or_insert_with(|| EnumGroup::new(key))
    }

    pub fn get(&self, key: &str) -> Option<&EnumGroup> {
        self.groups.get(key)
    }

    /// Groups in name order.
    pub fn groups(&self) -> impl Iterator<Item = &EnumGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ── Pass driver ─────────────────────────────────────────────────────────────

/// Output of the enum pass.
#[derive(Debug)]
pub struct EnumOutput {
    pub text: String,
    pub table: EnumTable,
    pub warnings: Vec<Diagnostic>,
}

/// Run passes A, B and C over `source` with a fresh table.
pub fn allocate_enums(source: &str) -> Result<EnumOutput, PreprocessError> {
    let mut table = EnumTable::new();

    let text = try_replace_all(forced_re(), source, |caps| {
        let (key, suffix, literal) = (group(caps, 1), group(caps, 2), group(caps, 3));
        let value: u64 = literal
            .parse()
            .map_err(|_| PreprocessError::InvalidForcedValue {
                group: key.to_string(),
                suffix: suffix.to_string(),
                literal: literal.to_string(),
            })?;
        table.group_mut(key).force(suffix, value)?;
        Ok(format!("{key}#{suffix}"))
    })?;

    let text = try_replace_all(reference_re(), &text, |caps| {
        let (key, suffix) = (group(caps, 1), group(caps, 2));
        let id = table.group_mut(key).reference(suffix)?;
        Ok(format!("{id}/*{key}:{suffix}*/"))
    })?;

    let text = try_replace_all(count_re(), &text, |caps| {
        let (key, once_only) = (group(caps, 1), !group(caps, 2).is_empty());
        let Some(enum_group) = table.groups.get_mut(key) else {
            return Err(PreprocessError::UndefinedGroup {
                kind: GroupKind::Enum,
                group: key.to_string(),
                reference: group(caps, 0).to_string(),
            });
        };
        let used = enum_group.count(once_only)?;
        if used.first {
            Ok(format!(
                "{}/*{}: {}*/",
                used.total,
                key,
                enum_group.ordered_suffixes().join(", ")
            ))
        } else {
            Ok(format!("{}/*{}*/", used.total, key))
        }
    })?;

    let warnings = uncounted_warnings(&table);
    Ok(EnumOutput {
        text,
        table,
        warnings,
    })
}

fn uncounted_warnings(table: &EnumTable) -> Vec<Diagnostic> {
    table
        .groups()
        .filter(|g| g.count_uses() == 0)
        .map(|g| {
            tracing::warn!(group = g.name(), "enum group is not counted");
            Diagnostic::new(DiagLevel::Warning, format!("group `{}` is not counted", g.name()))
                .with_code(codes::W0101)
                .with_hint(format!("reference `{}#` where the number of values is needed", g.name()))
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────
