//! T-Join candidate generation: per-node label set elements ordered by
//! global token frequency, a prefix filter over the first `k + 1` nodes, and
//! a three-stage inverted list that prunes on descendant, ancestor and
//! right-left region counts with the threshold remainder of each stage.

use crate::join::Candidates;
use crate::parsing::{LabelDict, LabelFreqOrdering, LabelId, ParsedTree};
use indextree::NodeEdge;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// One node of a tree in its label set: interned label, postorder position
/// and the region counts the positional filter runs on.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelSetElement {
    pub id: LabelId,
    pub postorder_id: i32,
    pub weight: usize,
    pub weight_so_far: usize,
    pub ancestors: i32,
    pub descendants: i32,
}

/// A converted tree: its size and node elements sorted by the global
/// frequency ordering (rare labels first).
pub type LabelSet = (usize, Vec<LabelSetElement>);

pub struct LabelSetConverter;

impl LabelSetConverter {
    pub fn create(
        trees: &[ParsedTree],
        ordering: &LabelFreqOrdering,
    ) -> Vec<LabelSet> {
        trees
            .iter()
            .map(|tree| Self::create_single(tree, ordering))
            .collect_vec()
    }

    pub fn create_single(tree: &ParsedTree, ordering: &LabelFreqOrdering) -> LabelSet {
        let tree_size = tree.count();
        let Some(root) = tree.iter().next() else {
            panic!("tree is empty");
        };
        let root_id = tree.get_node_id(root).unwrap();

        let mut elements = Vec::with_capacity(tree_size);
        // Subtree sizes accumulate along the traversal path; the path length
        // is the ancestor count.
        let mut frames: Vec<i32> = vec![0];
        let mut postorder_id = 0i32;
        let mut label_count = std::collections::HashMap::<LabelId, usize>::new();

        for edge in root_id.traverse(tree) {
            match edge {
                NodeEdge::Start(_) => frames.push(0),
                NodeEdge::End(nid) => {
                    let descendants = frames.pop().unwrap();
                    let label = *tree.get(nid).unwrap().get();
                    *label_count.entry(label).or_insert(0) += 1;
                    elements.push(LabelSetElement {
                        id: label,
                        postorder_id,
                        weight: 0,
                        weight_so_far: 0,
                        ancestors: frames.len() as i32 - 1,
                        descendants,
                    });
                    *frames.last_mut().unwrap() += descendants + 1;
                    postorder_id += 1;
                }
            }
        }

        for e in elements.iter_mut() {
            e.weight = label_count[&e.id];
        }

        // Global inverse frequency ordering; postorder id breaks ties so the
        // copy order of repeated labels is consistent across trees.
        elements.sort_by_key(|e| {
            let freq = ordering
                .get_by_id(e.id)
                .copied()
                .unwrap_or(usize::MAX);
            (freq, e.id, e.postorder_id)
        });
        let mut weight_sum = 0;
        for e in elements.iter_mut() {
            weight_sum += 1;
            e.weight_so_far = weight_sum;
        }

        (tree_size, elements)
    }
}

type StageThree = BTreeMap<i32, Vec<usize>>;
type StageTwo = BTreeMap<i32, StageThree>;
type StageOne = BTreeMap<i32, StageTwo>;

/// Three-stage inverted list: label id, then descendant count, ancestor
/// count and right-left count, each stage consuming part of the threshold.
pub struct TwoStageInvertedList {
    il_index: Vec<StageOne>,
    pre_candidates: u64,
    il_lookups: u64,
}

impl TwoStageInvertedList {
    pub fn new(nr_of_labels: usize) -> Self {
        Self {
            il_index: vec![StageOne::new(); nr_of_labels],
            pre_candidates: 0,
            il_lookups: 0,
        }
    }

    /// Adds every element of the set under its label and region counts.
    pub fn index_set(&mut self, tree_id: usize, set: &LabelSet) {
        let (tree_size, elements) = set;
        for e in elements.iter() {
            let right_left = *tree_size as i32 - e.descendants - e.ancestors - 1;
            self.il_index[e.id as usize]
                .entry(e.descendants)
                .or_default()
                .entry(e.ancestors)
                .or_default()
                .entry(right_left)
                .or_default()
                .push(tree_id);
        }
    }

    /// Collects all indexed trees holding a node with the queried label
    /// whose region counts fit within the distance threshold.
    pub fn lookup(
        &mut self,
        label_id: LabelId,
        descendants: i32,
        ancestors: i32,
        tree_size: usize,
        candidates: &mut FxHashSet<usize>,
        k: usize,
    ) {
        let right_left = tree_size as i32 - descendants - ancestors - 1;
        let k = k as i32;

        let start_desc = (descendants - k).max(0);
        for (desc, anc_map) in self.il_index[label_id as usize].range(start_desc..) {
            self.il_lookups += 1;
            let threshold_stage1 = k - (descendants - desc).abs();
            if threshold_stage1 < 0 {
                continue;
            }
            let start_anc = (ancestors - threshold_stage1).max(0);
            for (anc, rl_map) in anc_map.range(start_anc..) {
                let threshold_stage2 = threshold_stage1 - (ancestors - anc).abs();
                if threshold_stage2 < 0 {
                    continue;
                }
                let start_rl = (right_left - threshold_stage2).max(0);
                for (rl, tree_ids) in rl_map.range(start_rl..) {
                    let threshold_stage3 = threshold_stage2 - (right_left - rl).abs();
                    if threshold_stage3 < 0 {
                        continue;
                    }
                    for tree_id in tree_ids.iter() {
                        candidates.insert(*tree_id);
                    }
                }
            }
        }
        self.pre_candidates += candidates.len() as u64;
    }

    pub fn nr_of_pre_candidates(&self) -> u64 {
        self.pre_candidates
    }

    pub fn nr_of_il_lookups(&self) -> u64 {
        self.il_lookups
    }
}

/// Scans the collection once: each tree's prefix (its first `k + 1` nodes in
/// frequency order) is probed against the index of all earlier trees, then
/// the full set joins the index. Size filtering comes for free through the
/// region bounds.
pub fn tjoin_candidates(
    sets: &[LabelSet],
    nr_of_labels: usize,
    k: usize,
) -> Candidates {
    let mut index = TwoStageInvertedList::new(nr_of_labels);
    let mut candidates = vec![];

    for (tree_id, set) in sets.iter().enumerate() {
        let (tree_size, elements) = set;
        let mut pre_candidates = FxHashSet::default();
        for e in elements.iter().take(k + 1) {
            index.lookup(
                e.id,
                e.descendants,
                e.ancestors,
                *tree_size,
                &mut pre_candidates,
                k,
            );
        }
        for other in pre_candidates.into_iter() {
            if sets[other].0.abs_diff(*tree_size) <= k {
                candidates.push((tree_id, other));
            }
        }
        index.index_set(tree_id, set);
    }

    candidates
}
