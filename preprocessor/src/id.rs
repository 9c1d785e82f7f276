// id.rs — Sequential identifier allocation for enum values and dispatch targets
//
// Ids are handed out in allocation (source) order, so the same input always
// yields the same numbering. Allocators live inside per-invocation group
// tables and never outlive one pipeline run.

use std::fmt;

/// Identifier of a function inside one dispatch group.
///
/// `FunctionId::NONE` (0) is the dispatch sentinel: "no function selected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub const NONE: FunctionId = FunctionId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic counter. `allocate` returns strictly increasing values; `peek`
/// reports the value the next `allocate` would return, which is also the
/// number of values the counter spans.
#[derive(Debug, Clone, Default)]
pub struct SequentialAllocator {
    next: u64,
}

impl SequentialAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Next id, or `None` once `peek` could no longer represent the total.
    pub fn allocate(&mut self) -> Option<u64> {
        let id = self.next;
        self.next = self.next.checked_add(1)?;
        Some(id)
    }

    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Move the counter up to `floor` if it is currently below it.
    /// Never moves it down.
    pub fn raise_floor(&mut self, floor: u64) {
        self.next = self.next.max(floor);
    }
}
