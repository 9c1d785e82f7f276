// tree.rs — Balanced binary dispatch tree and its JSFX rendering
//
// `DispatchTree::build` is a pure function from a sorted id sequence to a
// decision tree; `render` turns a tree into nested ternary expressions.
// Keeping the two apart lets the split rule be tested without formatting.

use crate::id::FunctionId;

/// Decision tree over function ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTree {
    /// Selects exactly this id. `FunctionId::NONE` renders as the constant 0.
    Leaf(FunctionId),
    /// `selector < threshold ? below : above`.
    Branch {
        threshold: FunctionId,
        below: Box<DispatchTree>,
        above: Box<DispatchTree>,
    },
}

impl DispatchTree {
    /// Build the tree for `ids`, which must be strictly ascending.
    ///
    /// The range `[low, high)` is split at `mid = ceil((low + high) / 2)`;
    /// the branch tests `selector < ids[mid]`. An empty sequence selects the
    /// sentinel.
    pub fn build(ids: &[FunctionId]) -> DispatchTree {
        match ids {
            [] => DispatchTree::Leaf(FunctionId::NONE),
            [id] => DispatchTree::Leaf(*id),
            _ => {
                let mid = ids.len().div_ceil(2);
                DispatchTree::Branch {
                    threshold: ids[mid],
                    below: Box::new(Self::build(&ids[..mid])),
                    above: Box::new(Self::build(&ids[mid..])),
                }
            }
        }
    }

    /// Number of comparisons on the longest path.
    pub fn depth(&self) -> usize {
        match self {
            DispatchTree::Leaf(_) => 0,
            DispatchTree::Branch { below, above, .. } => 1 + below.depth().max(above.depth()),
        }
    }

    /// Id the tree selects for `selector`.
    pub fn route(&self, selector: u32) -> FunctionId {
        match self {
            DispatchTree::Leaf(id) => *id,
            DispatchTree::Branch {
                threshold,
                below,
                above,
            } => {
                if selector < threshold.0 {
                    below.route(selector)
                } else {
                    above.route(selector)
                }
            }
        }
    }

    /// Leaf ids, left to right.
    pub fn leaves(&self) -> Vec<FunctionId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<FunctionId>) {
        match self {
            DispatchTree::Leaf(id) => out.push(*id),
            DispatchTree::Branch { below, above, .. } => {
                below.collect_leaves(out);
                above.collect_leaves(out);
            }
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Render `tree` as a JSFX expression testing `selector`. `call` produces the
/// call expression for each non-sentinel leaf.
pub fn render<F>(tree: &DispatchTree, selector: &str, call: &F) -> String
where
    F: Fn(FunctionId) -> String,
{
    match tree {
        DispatchTree::Leaf(id) if id.is_none() => "0".to_string(),
        DispatchTree::Leaf(id) => call(*id),
        DispatchTree::Branch {
            threshold,
            below,
            above,
        } => format!(
            "({} < {} ?{}{}\n)",
            selector,
            threshold,
            indent(&render(below, selector, call)),
            indent(&format!(": {}", render(above, selector, call))),
        ),
    }
}

/// Start `code` on a new line and indent every line by one tab.
pub fn indent(code: &str) -> String {
    format!("\n\t{}", code.trim().replace('\n', "\n\t"))
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<FunctionId> {
        (0..=n).map(FunctionId).collect()
    }

    fn name_call(id: FunctionId) -> String {
        format!("f{}()", id.0)
    }

    #[test]
    fn sentinel_only() {
        let tree = DispatchTree::build(&ids(0));
        assert_eq!(tree, DispatchTree::Leaf(FunctionId::NONE));
        assert_eq!(render(&tree, "function_id", &name_call), "0");
    }

    #[test]
    fn empty_input_selects_sentinel() {
        assert_eq!(DispatchTree::build(&[]), DispatchTree::Leaf(FunctionId::NONE));
    }

    #[test]
    fn midpoint_split_rule() {
        // [0, 1, 2]: mid = ceil(3 / 2) = 2 → test `< 2`, left [0, 1], right [2]
        let tree = DispatchTree::build(&ids(2));
        assert_eq!(
            tree,
            DispatchTree::Branch {
                threshold: FunctionId(2),
                below: Box::new(DispatchTree::Branch {
                    threshold: FunctionId(1),
                    below: Box::new(DispatchTree::Leaf(FunctionId(0))),
                    above: Box::new(DispatchTree::Leaf(FunctionId(1))),
                }),
                above: Box::new(DispatchTree::Leaf(FunctionId(2))),
            }
        );
    }

    #[test]
    fn threshold_uses_id_value_not_index() {
        let sparse = [FunctionId(0), FunctionId(4), FunctionId(9)];
        let tree = DispatchTree::build(&sparse);
        assert_eq!(tree.route(0), FunctionId(0));
        assert_eq!(tree.route(4), FunctionId(4));
        assert_eq!(tree.route(8), FunctionId(4));
        assert_eq!(tree.route(9), FunctionId(9));
    }

    #[test]
    fn routes_every_id_to_itself() {
        for n in 0..40 {
            let all = ids(n);
            let tree = DispatchTree::build(&all);
            for id in &all {
                assert_eq!(tree.route(id.0), *id, "n = {n}");
            }
            assert_eq!(tree.leaves(), all);
        }
    }

    #[test]
    fn depth_is_logarithmic() {
        for n in 0..100u32 {
            let len = n as usize + 1;
            let expected = usize::BITS as usize - (len - 1).leading_zeros() as usize;
            assert_eq!(DispatchTree::build(&ids(n)).depth(), expected, "len = {len}");
        }
    }

    #[test]
    fn render_two_functions() {
        let tree = DispatchTree::build(&ids(2));
        assert_eq!(
            render(&tree, "function_id", &name_call),
            "(function_id < 2 ?\n\t(function_id < 1 ?\n\t\t0\n\t\t: f1()\n\t)\n\t: f2()\n)"
        );
    }

    #[test]
    fn indent_trims_and_prefixes_lines() {
        assert_eq!(indent("  a\nb  "), "\n\ta\n\tb");
    }
}
