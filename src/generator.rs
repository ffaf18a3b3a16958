//! Seedable random tree generator, a test utility for property-style checks
//! (engine agreement, bound validity, edit-count bounds).

use indextree::{Arena, NodeId};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

pub struct SimpleTreeGenerator {
    rng: Xoshiro256PlusPlus,
    alphabet: Vec<char>,
}

impl SimpleTreeGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            alphabet: ('a'..='z').collect(),
        }
    }

    fn random_label(&mut self) -> char {
        let idx = self.rng.gen_range(0..self.alphabet.len());
        self.alphabet[idx]
    }

    /// Generates a tree with exactly `tree_size` nodes in bracket notation.
    /// New nodes attach to a random node that still has fanout capacity.
    pub fn generate_tree(&mut self, tree_size: usize, max_fanout: usize) -> String {
        assert!(tree_size >= 1);
        let mut arena: Arena<char> = Arena::with_capacity(tree_size);
        let label = self.random_label();
        let root = arena.new_node(label);
        let mut open: Vec<NodeId> = vec![root];

        for _ in 1..tree_size {
            let slot = self.rng.gen_range(0..open.len());
            let parent = open[slot];
            let label = self.random_label();
            let child = arena.new_node(label);
            parent.append(child, &mut arena);
            if parent.children(&arena).count() >= max_fanout {
                open.swap_remove(slot);
            }
            open.push(child);
        }

        Self::to_bracket(&arena, root)
    }

    /// Applies `n_edits` random label changes to a generated tree (one-char
    /// labels), returning the modified bracket string. The edit distance to
    /// the original is at most `n_edits`.
    pub fn modify_tree(&mut self, tree: &str, n_edits: usize) -> String {
        let mut labels: Vec<char> = tree.chars().filter(|c| *c != '{' && *c != '}').collect();
        for _ in 0..n_edits {
            if labels.is_empty() {
                break;
            }
            let pos = self.rng.gen_range(0..labels.len());
            labels[pos] = self.random_label();
        }
        let mut out = String::with_capacity(tree.len());
        let mut next_label = labels.iter();
        for c in tree.chars() {
            match c {
                '{' | '}' => out.push(c),
                _ => out.push(*next_label.next().unwrap()),
            }
        }
        out
    }

    fn to_bracket(arena: &Arena<char>, root: NodeId) -> String {
        use indextree::NodeEdge;
        let mut out = String::with_capacity(arena.count() * 3);
        for edge in root.traverse(arena) {
            match edge {
                NodeEdge::Start(nid) => {
                    out.push('{');
                    out.push(*arena.get(nid).unwrap().get());
                }
                NodeEdge::End(_) => out.push('}'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::UnitCostModel;
    use crate::indexing::{Indexer, TreeIndex};
    use crate::parsing::{parse_single, LabelDict};
    use crate::ted::touzet::Touzet;
    use crate::ted::zhang_shasha::ZhangShasha;
    use crate::ted::TedEngine;

    #[test]
    fn test_generates_requested_size() {
        let mut gen = SimpleTreeGenerator::new(42);
        for size in [1usize, 2, 5, 17, 40] {
            let tree = gen.generate_tree(size, 4);
            let mut ld = LabelDict::new();
            let parsed = parse_single(tree, &mut ld).unwrap();
            assert_eq!(parsed.count(), size);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let t1 = SimpleTreeGenerator::new(7).generate_tree(12, 3);
        let t2 = SimpleTreeGenerator::new(7).generate_tree(12, 3);
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_modified_tree_stays_within_edit_budget() {
        let mut gen = SimpleTreeGenerator::new(123);
        let original = gen.generate_tree(14, 3);
        let modified = gen.modify_tree(&original, 3);

        let mut ld = LabelDict::new();
        let t1 = parse_single(original, &mut ld).unwrap();
        let t2 = parse_single(modified, &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&t1, &ld);
        let i2 = TreeIndex::index_tree(&t2, &ld);
        let mut zs = ZhangShasha::new(UnitCostModel);
        assert!(zs.ted(&i1, &i2) <= 3.0);
    }

    #[test]
    fn test_engines_agree_on_random_trees() {
        let mut gen = SimpleTreeGenerator::new(99);
        for _ in 0..5 {
            let s1 = gen.generate_tree(10, 3);
            let s2 = gen.modify_tree(&s1, 2);
            let mut ld = LabelDict::new();
            let t1 = parse_single(s1, &mut ld).unwrap();
            let t2 = parse_single(s2, &mut ld).unwrap();
            let i1 = TreeIndex::index_tree(&t1, &ld);
            let i2 = TreeIndex::index_tree(&t2, &ld);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let mut touzet = Touzet::new(UnitCostModel);
            let exact = zs.ted(&i1, &i2);
            assert_eq!(touzet.ted(&i1, &i2), exact);
        }
    }
}
