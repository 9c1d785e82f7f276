// diag.rs — Diagnostics and error model
//
// Shared diagnostic types used by every preprocessing pass. Fatal conditions
// are `PreprocessError` values (the pipeline stops at the first one);
// warnings are `Diagnostic` values collected alongside the output.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use thiserror::Error;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0101`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable codes, grouped by pass: E00xx sequences, E01xx enums, E02xx dispatch.
pub mod codes {
    use super::DiagCode;

    pub const E0001: DiagCode = DiagCode("E0001"); // range bound out of range
    pub const E0002: DiagCode = DiagCode("E0002"); // template reopens itself
    pub const E0101: DiagCode = DiagCode("E0101"); // invalid forced value
    pub const E0102: DiagCode = DiagCode("E0102"); // conflicting forced assignment
    pub const E0103: DiagCode = DiagCode("E0103"); // count of undefined enum group
    pub const E0104: DiagCode = DiagCode("E0104"); // group counted twice
    pub const E0105: DiagCode = DiagCode("E0105"); // enum ids exhausted
    pub const E0201: DiagCode = DiagCode("E0201"); // undeclared dispatch group
    pub const E0202: DiagCode = DiagCode("E0202"); // dispatch group declared twice
    pub const E0203: DiagCode = DiagCode("E0203"); // function ids exhausted
    pub const W0101: DiagCode = DiagCode("W0101"); // enum group never counted
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Fatal errors ─────────────────────────────────────────────────────────

/// Which macro family an undefined group reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Enum,
    Dispatch,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Enum => write!(f, "enum"),
            GroupKind::Dispatch => write!(f, "function"),
        }
    }
}

/// A fatal preprocessing error. Any of these aborts the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("range bound `{literal}` of `{{#{name}=...}}` is out of range")]
    InvalidRangeBound { name: String, literal: String },

    #[error("expansion of `{{#{name}=...}}` reopens a range block")]
    SelfReproducingTemplate { name: String },

    #[error("invalid enum forcing `{group}#{suffix}({literal})`")]
    InvalidForcedValue {
        group: String,
        suffix: String,
        literal: String,
    },

    #[error("conflicting enum forcing in `{group}`: {detail}")]
    ConflictingForcedAssignment { group: String, detail: String },

    #[error("reference to undefined {kind} group `{group}`: {reference}")]
    UndefinedGroup {
        kind: GroupKind,
        group: String,
        reference: String,
    },

    #[error("group `{group}` counted more than once")]
    GroupCountedTwice { group: String },

    #[error("{kind} group `{group}` has no ids left to allocate")]
    IdSpaceExhausted { kind: GroupKind, group: String },

    #[error("function group `{{{group}}}` declared more than once")]
    DuplicateDispatchGroup { group: String },
}

impl PreprocessError {
    /// Stable code for this error.
    pub fn code(&self) -> DiagCode {
        match self {
            PreprocessError::InvalidRangeBound { .. } => codes::E0001,
            PreprocessError::SelfReproducingTemplate { .. } => codes::E0002,
            PreprocessError::InvalidForcedValue { .. } => codes::E0101,
            PreprocessError::ConflictingForcedAssignment { .. } => codes::E0102,
            PreprocessError::UndefinedGroup {
                kind: GroupKind::Enum,
                ..
            } => codes::E0103,
            PreprocessError::UndefinedGroup {
                kind: GroupKind::Dispatch,
                ..
            } => codes::E0201,
            PreprocessError::GroupCountedTwice { .. } => codes::E0104,
            PreprocessError::IdSpaceExhausted {
                kind: GroupKind::Enum,
                ..
            } => codes::E0105,
            PreprocessError::IdSpaceExhausted {
                kind: GroupKind::Dispatch,
                ..
            } => codes::E0203,
            PreprocessError::DuplicateDispatchGroup { .. } => codes::E0202,
        }
    }

    /// Render as an error-level diagnostic with a remediation hint.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::new(DiagLevel::Error, self.to_string()).with_code(self.code());
        match self {
            PreprocessError::SelfReproducingTemplate { .. } => {
                diag.with_hint("a body must not produce `{#` when repeated")
            }
            PreprocessError::ConflictingForcedAssignment { .. } => {
                diag.with_hint("each forced value may be bound to exactly one suffix")
            }
            PreprocessError::UndefinedGroup {
                kind: GroupKind::Enum,
                ..
            } => diag.with_hint("reference at least one value before counting the group"),
            PreprocessError::UndefinedGroup {
                kind: GroupKind::Dispatch,
                group,
                ..
            } => diag.with_hint(format!("declare it with `function {{{group}}}(...)`")),
            PreprocessError::GroupCountedTwice { .. } => {
                diag.with_hint("use `KEY#` for counts that are referenced repeatedly")
            }
            _ => diag,
        }
    }
}
