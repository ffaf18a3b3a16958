//! Histogram converters and inverted-list candidate indexes. Every tree is
//! condensed into label, leaf-distance and degree histograms in one
//! traversal; candidate generation scans the collection once, building the
//! inverted lists incrementally so every pair is discovered exactly once.

use crate::join::Candidates;
use crate::parsing::{LabelDict, LabelId, ParsedTree};
use indextree::NodeEdge;

use std::collections::HashMap;

pub type Histogram<K = u32, V = u32> = HashMap<K, V>;

/// Label histograms change by at most two per edit operation.
const LABEL_BOUND_FACTOR: usize = 2;
/// A deletion moves the parent's degree bucket and drops one bucket.
const DEGREE_BOUND_FACTOR: usize = 3;

/// Converts the collection and runs the combined candidate lookup.
pub fn collection_index_lookup(
    tree_collection: &[ParsedTree],
    label_dict: &LabelDict,
    k: usize,
) -> Candidates {
    let (_, degree_hist, label_hist) = create_collection_histograms(tree_collection);
    index_lookup(&degree_hist, &label_hist, label_dict, k)
}

/// Combined lookup: label-histogram prefix filter first, degree-histogram
/// filter on the surviving pairs. Both bounds are valid lower bounds, so no
/// qualifying pair is lost.
pub fn index_lookup(
    degree_hist: &[(usize, Histogram)],
    label_hist: &[(usize, Histogram<LabelId, u32>)],
    label_dict: &LabelDict,
    k: usize,
) -> Candidates {
    let candidates = label_index_lookup(label_hist, label_dict, k);

    candidates
        .into_iter()
        .filter(|(t1, t2)| {
            let (t1size, t1hist) = &degree_hist[*t1];
            let (t2size, t2hist) = &degree_hist[*t2];

            let intersection_size = t1hist.iter().fold(0, |intersection, (degree, count)| {
                intersection + std::cmp::min(count, t2hist.get(degree).unwrap_or(&0))
            }) as usize;

            ((t1size + t2size) - (2 * intersection_size)) / DEGREE_BOUND_FACTOR <= k
        })
        .collect()
}

/// Label-histogram candidates. The inverted list maps a label id to the
/// `(tree_id, count)` postings of all trees seen so far; intersection
/// counters accumulate while scanning the postings of the current tree.
pub fn label_index_lookup(
    label_hist: &[(usize, Histogram<LabelId, u32>)],
    label_dict: &LabelDict,
    k: usize,
) -> Candidates {
    let mut candidates = vec![];
    let mut il_index: Vec<Vec<(usize, u32)>> = vec![vec![]; label_dict.len() + 1];

    // Counts the label overlap of the current tree with every earlier tree.
    let mut intersections_count = vec![0u32; label_hist.len()];

    for (tree_id, (tree_size, tree_label_histogram)) in label_hist.iter().enumerate() {
        let mut pre_candidates = vec![];

        // A tree within threshold size pairs with label-disjoint trees too;
        // any qualifying disjoint partner is itself at most k nodes, so the
        // pair is found when the later of the two is scanned.
        if *tree_size <= k {
            intersections_count[..tree_id]
                .iter_mut()
                .enumerate()
                .for_each(|(other_tree_id, count)| {
                    pre_candidates.push(other_tree_id);
                    *count += 1;
                });
        }

        for (label_id, label_count) in tree_label_histogram.iter() {
            for (other_tree_id, other_label_count) in il_index[*label_id as usize].iter() {
                let intersection_size = *std::cmp::min(other_label_count, label_count);
                if intersections_count[*other_tree_id] == 0 && intersection_size > 0 {
                    pre_candidates.push(*other_tree_id);
                }
                intersections_count[*other_tree_id] = std::cmp::min(
                    intersections_count[*other_tree_id] + intersection_size,
                    *tree_size as u32,
                )
            }
            il_index[*label_id as usize].push((tree_id, *label_count));
        }

        for pre_cand_id in pre_candidates.iter() {
            let other_tree_size = label_hist[*pre_cand_id].0;
            if (tree_size + other_tree_size)
                .saturating_sub(2 * intersections_count[*pre_cand_id] as usize)
                / LABEL_BOUND_FACTOR
                <= k
            {
                candidates.push((tree_id, *pre_cand_id));
            }
            intersections_count[*pre_cand_id] = 0;
        }
    }

    candidates
}

/// Degree-histogram candidates, standalone variant.
pub fn degree_index_lookup(degree_hist: &[(usize, Histogram)], k: usize) -> Candidates {
    let mut candidates = vec![];
    let max_degree = degree_hist
        .iter()
        .flat_map(|(_, h)| h.keys().copied())
        .max()
        .unwrap_or(0) as usize;
    let mut il_index: Vec<Vec<(usize, u32)>> = vec![vec![]; max_degree + 1];
    let mut intersections_count = vec![0usize; degree_hist.len()];

    for (tree_id, (tree_size, tree_degree_histogram)) in degree_hist.iter().enumerate() {
        let mut pre_candidates = vec![];

        if *tree_size <= k {
            intersections_count[..tree_id]
                .iter_mut()
                .enumerate()
                .for_each(|(other_tree_id, count)| {
                    pre_candidates.push(other_tree_id);
                    *count += 1;
                });
        }

        for (degree_id, degrees_count) in tree_degree_histogram.iter() {
            for (other_tree_id, other_count) in il_index[*degree_id as usize].iter() {
                let intersection_size = *std::cmp::min(other_count, degrees_count);
                if intersections_count[*other_tree_id] == 0 && intersection_size > 0 {
                    pre_candidates.push(*other_tree_id);
                }
                intersections_count[*other_tree_id] += intersection_size as usize;
            }
            il_index[*degree_id as usize].push((tree_id, *degrees_count));
        }

        for pre_cand_id in pre_candidates.iter() {
            let other_tree_size = degree_hist[*pre_cand_id].0;
            if (tree_size + other_tree_size)
                .saturating_sub(2 * intersections_count[*pre_cand_id])
                / DEGREE_BOUND_FACTOR
                <= k
            {
                candidates.push((tree_id, *pre_cand_id))
            }
            intersections_count[*pre_cand_id] = 0;
        }
    }

    candidates
}

/// Leaf-distance-histogram candidates. A single edit can shift the leaf
/// distance of a whole ancestor chain, so this filter has no constant-factor
/// guarantee; it is a heuristic pre-filter for experiments, not part of the
/// lossless pipeline.
pub fn leaf_index_lookup(leaf_hist: &[(usize, Histogram)], k: usize) -> Candidates {
    let mut candidates = vec![];
    let max_dist = leaf_hist
        .iter()
        .flat_map(|(_, h)| h.keys().copied())
        .max()
        .unwrap_or(0) as usize;
    let mut il_index: Vec<Vec<(usize, u32)>> = vec![vec![]; max_dist + 1];
    let mut intersections_count = vec![0usize; leaf_hist.len()];

    for (tree_id, (tree_size, tree_leaf_histogram)) in leaf_hist.iter().enumerate() {
        let mut pre_candidates = vec![];

        for (leaf_distance, leaf_distance_count) in tree_leaf_histogram.iter() {
            for (other_tree_id, other_count) in il_index[*leaf_distance as usize].iter() {
                let intersection_size = *std::cmp::min(other_count, leaf_distance_count);
                if intersections_count[*other_tree_id] == 0 && intersection_size > 0 {
                    pre_candidates.push(*other_tree_id);
                }
                intersections_count[*other_tree_id] += intersection_size as usize;
            }
            il_index[*leaf_distance as usize].push((tree_id, *leaf_distance_count));
        }

        for pre_cand_id in pre_candidates.iter() {
            let other_tree_size = leaf_hist[*pre_cand_id].0;
            if (tree_size + other_tree_size)
                .saturating_sub(2 * intersections_count[*pre_cand_id])
                <= k
            {
                candidates.push((tree_id, *pre_cand_id))
            }
            intersections_count[*pre_cand_id] = 0;
        }
    }

    candidates
}

/// Creates and returns Leaf, Degree and Label histogram collections;
/// the first element of each pair is the tree size.
pub fn create_collection_histograms(
    tree_collection: &[ParsedTree],
) -> (
    Vec<(usize, Histogram)>,
    Vec<(usize, Histogram)>,
    Vec<(usize, Histogram<LabelId, u32>)>,
) {
    let (mut leaf_hists, mut degree_hists, mut label_hists) = (
        Vec::with_capacity(tree_collection.len()),
        Vec::with_capacity(tree_collection.len()),
        Vec::with_capacity(tree_collection.len()),
    );

    tree_collection.iter().for_each(|tree| {
        let (leaf, degree, label) = create_tree_histograms(tree);
        leaf_hists.push((tree.count(), leaf));
        degree_hists.push((tree.count(), degree));
        label_hists.push((tree.count(), label));
    });

    (leaf_hists, degree_hists, label_hists)
}

/// Creates and returns Leaf, Degree and Label histograms of one tree in a
/// single traversal. The leaf distance of a node is the maximum child leaf
/// distance plus one; the degree is the child count.
pub fn create_tree_histograms(
    tree: &ParsedTree,
) -> (Histogram, Histogram, Histogram<LabelId, u32>) {
    let Some(root) = tree.iter().next() else {
        panic!("Unable to get tree root, but tree is not empty!");
    };
    let (mut label, mut degree, mut leaf) = (
        Histogram::<LabelId, u32>::new(),
        Histogram::new(),
        Histogram::new(),
    );
    let root_id = tree.get_node_id(root).unwrap();

    // (degree, max child leaf distance) frames along the traversal path.
    let mut frames: Vec<(u32, u32)> = vec![(0, 0)];
    for edge in root_id.traverse(tree) {
        match edge {
            NodeEdge::Start(_) => frames.push((0, 0)),
            NodeEdge::End(nid) => {
                let (node_degree, max_child_leaf_dist) = frames.pop().unwrap();
                let leaf_dist = max_child_leaf_dist + 1;

                degree
                    .entry(node_degree)
                    .and_modify(|count| *count += 1)
                    .or_insert(1);
                leaf.entry(leaf_dist)
                    .and_modify(|count| *count += 1)
                    .or_insert(1);
                let node_label = tree.get(nid).unwrap().get();
                label
                    .entry(*node_label)
                    .and_modify(|count| *count += 1)
                    .or_insert(1);

                let parent = frames.last_mut().unwrap();
                parent.0 += 1;
                parent.1 = parent.1.max(leaf_dist);
            }
        }
    }

    (leaf, degree, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{
        naive_self_join, verify_candidates, JoinResultElement, VerificationAlgorithm,
    };
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
    fn test_histogram_traversals() {
        let tree_str = "{a{b{c}{d{c}}{b}}{f{g}{x}}}".to_owned();
        let mut ld = LabelDict::new();
        let pt = parse_single(tree_str, &mut ld).unwrap();

        let (leaf, degree, label) = create_tree_histograms(&pt);

        assert_eq!(leaf, HashMap::from([(1, 5), (2, 2), (3, 1), (4, 1)]));
        assert_eq!(degree, HashMap::from([(0, 5), (1, 1), (2, 2), (3, 1)]));
        assert_eq!(
            label,
            HashMap::from([(0, 1), (1, 2), (2, 2), (3, 1), (4, 1), (5, 1), (6, 1)])
        );
    }

    #[test]
    fn test_label_lookup_keeps_close_pairs() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{b}{d}}",
            "{a{b}{c}{d}}",
            "{x{y{z}}}",
        ]);
        let (_, _, label_hist) = create_collection_histograms(&trees);
        let candidates = label_index_lookup(&label_hist, &ld, 2);
        assert!(candidates.contains(&(1, 0)));
        assert!(candidates.contains(&(2, 0)));
        assert!(candidates.contains(&(2, 1)));
        assert!(!candidates.contains(&(3, 0)));
    }

    #[test]
    fn test_pipeline_matches_naive_join() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{c}{b}}",
            "{a{b}{c}{d}}",
            "{a{b{e}}{c}}",
            "{x{y{z}}}",
            "{x{y}{z}}",
            "{q}",
            "{a{b}}",
        ]);
        for k in 1..=4usize {
            let candidates = collection_index_lookup(&trees, &ld, k);
            let (mut filtered, _) = verify_candidates(
                &trees,
                &ld,
                &candidates,
                k,
                VerificationAlgorithm::Touzet,
            );
            let mut reference = naive_self_join(&trees, &ld, k, VerificationAlgorithm::Touzet);
            let norm = |r: &JoinResultElement| {
                (
                    r.tree_id_1.min(r.tree_id_2),
                    r.tree_id_1.max(r.tree_id_2),
                    r.ted_value as u64,
                )
            };
            let mut filtered = filtered.drain(..).map(|r| norm(&r)).collect::<Vec<_>>();
            let mut reference = reference.drain(..).map(|r| norm(&r)).collect::<Vec<_>>();
            filtered.sort();
            reference.sort();
            assert_eq!(filtered, reference, "pipeline diverges at k={k}");
        }
    }

    #[test]
    fn test_result_count_grows_with_threshold() {
        let (trees, ld) = collection(&[
            "{a{b}{c}}",
            "{a{c}{b}}",
            "{a{b}{c}{d}}",
            "{a{b{e}}{c}}",
            "{e{f}{g}}",
        ]);
        let mut previous = 0;
        for k in 1..=6usize {
            let candidates = collection_index_lookup(&trees, &ld, k);
            let (result, _) =
                verify_candidates(&trees, &ld, &candidates, k, VerificationAlgorithm::Touzet);
            assert!(result.len() >= previous);
            previous = result.len();
        }
    }
}
