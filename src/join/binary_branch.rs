//! Binary branch candidates after Tang et al. Every node is condensed into
//! the triple (own label, first-child label, right-sibling label); two trees
//! within edit distance `k` differ in at most `5 k` binary branches, so the
//! L1 distance of the branch vectors divided by five is a valid lower bound.

use crate::join::Candidates;
use crate::parsing::{LabelId, ParsedTree};
use indextree::NodeEdge;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::cmp::min;

pub type BinaryBranchVector = FxHashMap<i32, i32>;
pub struct BinaryBranchTuple(pub usize, pub BinaryBranchVector);

// Binary branch triple (own label, first-child label, right-sibling label).
type BBTriple = (LabelId, Option<LabelId>, Option<LabelId>);

const BB_BOUND_FACTOR: usize = 5;

/// Interns binary branch triples across a collection so the per-tree vectors
/// stay comparable.
#[derive(Debug, Default, Clone)]
pub struct BinaryBranchConverter {
    binary_branch_id_map: FxHashMap<BBTriple, i32>,
    bb_id: i32,
}

impl BinaryBranchConverter {
    pub fn create(&mut self, trees: &[ParsedTree]) -> Vec<BinaryBranchTuple> {
        trees
            .iter()
            .map(|tree| BinaryBranchTuple(tree.count(), self.create_vector(tree)))
            .collect_vec()
    }

    fn create_vector(&mut self, tree: &ParsedTree) -> BinaryBranchVector {
        let Some(root) = tree.iter().next() else {
            panic!("tree is empty");
        };
        let root_id = tree.get_node_id(root).unwrap();
        let mut branch_vector = BinaryBranchVector::default();

        for edge in root_id.traverse(tree) {
            let NodeEdge::Start(nid) = edge else {
                continue;
            };
            let own_label = *tree.get(nid).unwrap().get();
            let first_child_label = nid
                .children(tree)
                .next()
                .map(|c| *tree.get(c).unwrap().get());
            let right_sibling_label = tree
                .get(nid)
                .unwrap()
                .next_sibling()
                .map(|s| *tree.get(s).unwrap().get());

            let triple: BBTriple = (own_label, first_child_label, right_sibling_label);
            let bb_id = self.binary_branch_id_map.entry(triple).or_insert_with(|| {
                self.bb_id += 1;
                self.bb_id
            });
            branch_vector
                .entry(*bb_id)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }

        branch_vector
    }
}

/// Binary branch lower bound with threshold semantics: `k + 1` signals the
/// pair is out.
pub fn binary_branch_lb(t1: &BinaryBranchTuple, t2: &BinaryBranchTuple, k: usize) -> usize {
    let (t1s, t2s) = (t1.0, t2.0);
    if t1s.abs_diff(t2s) > k {
        return k + 1;
    }
    let mut intersection_size = 0usize;

    for (branch, count) in t1.1.iter() {
        let Some(t2count) = t2.1.get(branch) else {
            continue;
        };
        intersection_size += min(*t2count, *count) as usize;
    }

    ((t1s + t2s) - (2 * intersection_size)) / BB_BOUND_FACTOR
}

/// All pairs whose binary branch bound stays within the threshold.
pub fn candidates(tuples: &[BinaryBranchTuple], k: usize) -> Candidates {
    let mut result = vec![];
    for i in 0..tuples.len() {
        for j in 0..i {
            if binary_branch_lb(&tuples[i], &tuples[j], k) <= k {
                result.push((i, j));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{naive_self_join, verify_candidates, VerificationAlgorithm};
    use crate::parsing::{parse_single, LabelDict};

    fn collection(strs: &[&str]) -> (Vec<ParsedTree>, LabelDict) {
        let mut ld = LabelDict::new();
        let trees = strs
            .iter()
            .map(|s| parse_single((*s).to_owned(), &mut ld).unwrap())
            .collect();
        (trees, ld)
    }

    #[test]
    fn test_identical_trees_have_zero_bound() {
        let (trees, _) = collection(&["{a{b}{c}}", "{a{b}{c}}"]);
        let mut converter = BinaryBranchConverter::default();
        let tuples = converter.create(&trees);
        assert_eq!(binary_branch_lb(&tuples[0], &tuples[1], 3), 0);
    }

    #[test]
    fn test_branch_vectors_separate_sibling_orders() {
        let (trees, _) = collection(&["{a{b}{c}}", "{a{c}{b}}"]);
        let mut converter = BinaryBranchConverter::default();
        let tuples = converter.create(&trees);
        // Orders differ, so the branch triples differ.
        assert!(binary_branch_lb(&tuples[0], &tuples[1], 5) > 0);
    }

    #[test]
    fn test_candidates_are_lossless() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{c}{b}}",
            "{a{b}{c}{d}}",
            "{a{b{e}}{c}}",
            "{x{y{z}}}",
        ]);
        for k in 1..=3usize {
            let mut converter = BinaryBranchConverter::default();
            let tuples = converter.create(&trees);
            let cands = candidates(&tuples, k);
            let (mut filtered, _) =
                verify_candidates(&trees, &ld, &cands, k, VerificationAlgorithm::Touzet);
            let mut reference = naive_self_join(&trees, &ld, k, VerificationAlgorithm::Touzet);
            filtered.sort_by_key(|r| (r.tree_id_1, r.tree_id_2));
            reference.sort_by_key(|r| (r.tree_id_1, r.tree_id_2));
            assert_eq!(filtered, reference, "binary branch filter lost pairs at k={k}");
        }
    }
}
