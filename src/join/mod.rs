//! Tree similarity joins: candidate generation over histogram and label-set
//! filters, then verification with a thresholded TED engine.

pub mod binary_branch;
pub mod histograms;
pub mod tjoin;

use crate::cost::UnitCostModel;
use crate::indexing::{AptedIndex, Indexer, TreeIndex};
use crate::parsing::{LabelDict, ParsedTree};
use crate::ted::apted::Apted;
use crate::ted::touzet::{Touzet, TouzetVariant};
use crate::ted::zhang_shasha::ZhangShasha;
use crate::ted::TedEngine;
use serde::Serialize;

/// One verified join result pair with its exact distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinResultElement {
    pub tree_id_1: usize,
    pub tree_id_2: usize,
    pub ted_value: f64,
}

pub type Candidate = (usize, usize);
pub type Candidates = Vec<Candidate>;

/// Which engine verifies the candidate pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationAlgorithm {
    #[default]
    Touzet,
    TouzetDepthPruning,
    ZhangShasha,
    Apted,
}

/// Runs the chosen engine over every candidate pair and keeps the pairs
/// within the threshold. Returns the results together with the accumulated
/// subproblem count of the verification.
pub fn verify_candidates(
    trees: &[ParsedTree],
    label_dict: &LabelDict,
    candidates: &[Candidate],
    k: usize,
    algorithm: VerificationAlgorithm,
) -> (Vec<JoinResultElement>, u64) {
    let mut results = vec![];
    let mut subproblems = 0u64;

    match algorithm {
        VerificationAlgorithm::Apted => {
            let indexes = trees
                .iter()
                .map(|t| AptedIndex::index_tree(t, label_dict))
                .collect::<Vec<_>>();
            let mut engine = Apted::new(UnitCostModel);
            for (id1, id2) in candidates.iter().copied() {
                let dist = engine.ted_k(&indexes[id1], &indexes[id2], k);
                subproblems += engine.subproblem_count();
                if dist <= k as f64 {
                    results.push(JoinResultElement {
                        tree_id_1: id1,
                        tree_id_2: id2,
                        ted_value: dist,
                    });
                }
            }
        }
        _ => {
            let indexes = trees
                .iter()
                .map(|t| TreeIndex::index_tree(t, label_dict))
                .collect::<Vec<_>>();
            let mut engine: Box<dyn TedEngine> = match algorithm {
                VerificationAlgorithm::ZhangShasha => Box::new(ZhangShasha::new(UnitCostModel)),
                VerificationAlgorithm::TouzetDepthPruning => Box::new(Touzet::with_variant(
                    UnitCostModel,
                    TouzetVariant::DepthPruning,
                )),
                _ => Box::new(Touzet::new(UnitCostModel)),
            };
            for (id1, id2) in candidates.iter().copied() {
                let dist = engine.ted_k(&indexes[id1], &indexes[id2], k);
                subproblems += engine.subproblem_count();
                if dist <= k as f64 {
                    results.push(JoinResultElement {
                        tree_id_1: id1,
                        tree_id_2: id2,
                        ted_value: dist,
                    });
                }
            }
        }
    }

    (results, subproblems)
}

/// Self join without any filter: every pair is verified. The ground truth
/// the filtered pipelines are measured against.
pub fn naive_self_join(
    trees: &[ParsedTree],
    label_dict: &LabelDict,
    k: usize,
    algorithm: VerificationAlgorithm,
) -> Vec<JoinResultElement> {
    let mut candidates = vec![];
    for i in 0..trees.len() {
        for j in 0..i {
            candidates.push((i, j));
        }
    }
    verify_candidates(trees, label_dict, &candidates, k, algorithm).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_single;

    fn collection(strs: &[&str]) -> (Vec<ParsedTree>, LabelDict) {
        let mut ld = LabelDict::new();
        let trees = strs
            .iter()
            .map(|s| parse_single((*s).to_owned(), &mut ld).unwrap())
            .collect();
        (trees, ld)
    }

    #[test]
    fn test_naive_self_join_finds_close_pairs() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{b}{d}}",
            "{a{b}{c}{d}}",
            "{x{y{z}}}",
        ]);
        let result = naive_self_join(&trees, &ld, 1, VerificationAlgorithm::Touzet);
        let mut pairs = result
            .iter()
            .map(|r| (r.tree_id_1.min(r.tree_id_2), r.tree_id_1.max(r.tree_id_2)))
            .collect::<Vec<_>>();
        pairs.sort();
        // (1, 2) qualifies too: deleting c turns tree 2 into tree 1.
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_verifiers_agree() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{c}{b}}",
            "{a{b{c{d}}}}",
            "{a{b}}",
            "{e{f}{g}{h}}",
        ]);
        let algorithms = [
            VerificationAlgorithm::Touzet,
            VerificationAlgorithm::TouzetDepthPruning,
            VerificationAlgorithm::ZhangShasha,
            VerificationAlgorithm::Apted,
        ];
        let reference = naive_self_join(&trees, &ld, 3, VerificationAlgorithm::ZhangShasha);
        for algo in algorithms {
            let mut result = naive_self_join(&trees, &ld, 3, algo);
            result.sort_by_key(|r| (r.tree_id_1, r.tree_id_2));
            let mut expected = reference.clone();
            expected.sort_by_key(|r| (r.tree_id_1, r.tree_id_2));
            assert_eq!(result, expected, "{algo:?} disagrees with ZhangShasha");
        }
    }
}
