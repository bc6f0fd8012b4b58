//! Generation units and setup resolution.
//!
//! A generation unit is one describe/context block together with all of its direct `it`
//! children; each unit becomes one test class. Partitioning happens in a single pre-order
//! walk before anything is rendered.

use crate::ast::{BlockId, BlockKind, SpecTree};
use crate::naming::snakify;

/// One test class worth of `it` blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUnit {
    /// The describe or context every test shares as parent.
    pub parent: BlockId,
    /// Sibling `it` blocks in source order.
    pub tests: Vec<BlockId>,
}

/// Splits the tree into units, ordered by the position of each unit's first `it`.
pub fn partition(tree: &SpecTree) -> Vec<GenerationUnit> {
    let mut units = Vec::new();
    visit(tree, SpecTree::ROOT, &mut units);
    units
}

fn visit(tree: &SpecTree, id: BlockId, units: &mut Vec<GenerationUnit>) {
    let mut emitted = false;
    for (child, block) in tree.children(id) {
        match block.kind {
            BlockKind::It if !emitted => {
                units.push(GenerationUnit {
                    parent: id,
                    tests: tree
                        .children(id)
                        .filter(|(_, b)| b.kind == BlockKind::It)
                        .map(|(sibling, _)| sibling)
                        .collect(),
                });
                emitted = true;
            }
            kind if kind.is_structural() => visit(tree, child, units),
            _ => {}
        }
    }
}

/// Describe/context chain from the outermost block down to `parent`, root excluded.
pub fn scope_chain(tree: &SpecTree, parent: BlockId) -> Vec<BlockId> {
    let mut chain: Vec<BlockId> = std::iter::once(parent)
        .chain(tree.ancestors(parent))
        .filter(|&id| id != SpecTree::ROOT)
        .collect();
    chain.reverse();
    chain
}

/// Setup and teardown blocks that apply to the tests of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// `before` and `let` blocks, outermost scope first, declaration order within a scope.
    pub setups: Vec<BlockId>,
    /// `after` blocks in the same order.
    pub teardowns: Vec<BlockId>,
}

/// Collects the setup and teardown chain for tests whose parent is `parent`.
///
/// A `let` replaces an earlier `let` of the same name declared in the same scope. Lets in
/// different scopes all run; the inner one runs later and so wins.
pub fn resolve(tree: &SpecTree, parent: BlockId) -> Resolution {
    let mut resolution = Resolution::default();
    for scope in scope_chain(tree, parent) {
        let mut local: Vec<BlockId> = Vec::new();
        for (child, block) in tree.children(scope) {
            match block.kind {
                BlockKind::Before => local.push(child),
                BlockKind::Let => {
                    let name = snakify(&block.label);
                    local.retain(|&earlier| {
                        let earlier = tree.get(earlier);
                        earlier.kind != BlockKind::Let || snakify(&earlier.label) != name
                    });
                    local.push(child);
                }
                BlockKind::After => resolution.teardowns.push(child),
                _ => {}
            }
        }
        resolution.setups.extend(local);
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn labels(tree: &SpecTree, ids: &[BlockId]) -> Vec<String> {
        ids.iter().map(|&id| tree.get(id).label.clone()).collect()
    }

    #[test]
    fn siblings_share_one_unit() {
        let tree = parse(
            "describe \"A\":\n    context \"B\":\n        it \"x\": pass\n        it \"y\": pass\n",
        )
        .unwrap();
        let units = partition(&tree);
        assert_eq!(units.len(), 1);
        assert_eq!(labels(&tree, &units[0].tests), vec!["x", "y"]);
    }

    #[test]
    fn units_follow_first_test_position() {
        let source = "\
describe \"A\":
    it \"a1\": pass
    context \"B\":
        it \"b1\": pass
    it \"a2\": pass
describe \"C\":
    context \"D\":
        it \"d1\": pass
    it \"c1\": pass
";
        let tree = parse(source).unwrap();
        let parents: Vec<String> = partition(&tree)
            .iter()
            .map(|u| tree.get(u.parent).label.clone())
            .collect();
        assert_eq!(parents, vec!["A", "B", "D", "C"]);

        let first = &partition(&tree)[0];
        assert_eq!(labels(&tree, &first.tests), vec!["a1", "a2"]);
    }

    #[test]
    fn setups_run_outer_to_inner() {
        let source = "\
describe \"A\":
    before \"p\": pass
    context \"B\":
        before \"q\": pass
        it \"x\": pass
";
        let tree = parse(source).unwrap();
        let unit = &partition(&tree)[0];
        let resolution = resolve(&tree, unit.parent);
        assert_eq!(labels(&tree, &resolution.setups), vec!["p", "q"]);
    }

    #[test]
    fn let_override_is_same_scope_only() {
        let source = "\
describe \"A\":
    let \"x\": 1
    let \"y\": 0
    let \"x\": 2
    context \"B\":
        let \"x\": 3
        it \"z\": pass
";
        let tree = parse(source).unwrap();
        let unit = &partition(&tree)[0];
        let resolution = resolve(&tree, unit.parent);
        let bodies: Vec<&str> = resolution
            .setups
            .iter()
            .map(|&id| tree.get(id).body[0].text.as_str())
            .collect();
        assert_eq!(bodies, vec!["return 0", "return 2", "return 3"]);
    }

    #[test]
    fn setups_declared_after_tests_still_apply() {
        let tree = parse(
            "describe \"A\":\n    it \"x\": pass\n    before \"late\": pass\n    after \"done\": pass\n",
        )
        .unwrap();
        let resolution = resolve(&tree, partition(&tree)[0].parent);
        assert_eq!(labels(&tree, &resolution.setups), vec!["late"]);
        assert_eq!(labels(&tree, &resolution.teardowns), vec!["done"]);
    }
}
