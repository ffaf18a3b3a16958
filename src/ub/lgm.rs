//! Label-guided greedy mapping, a linear-ish upper bound on TED. Nodes with
//! equal labels are matched greedily in postorder, the raw matching is then
//! revised into a valid TED mapping, and remaining gaps can be filled with
//! rename pairs. The cost of the final mapping upper-bounds the exact
//! distance. Unit costs only.

use crate::indexing::TreeIndex;
use crate::parsing::LabelId;
use rustc_hash::FxHashMap;

pub struct GreedyMapper;

type MappingPair = (i32, i32);

impl GreedyMapper {
    /// Greedy label matching revised into a valid TED mapping.
    pub fn lb_mapping(t1: &TreeIndex, t2: &TreeIndex, k: usize) -> Vec<MappingPair> {
        let mut candidates: FxHashMap<LabelId, Vec<i32>> = FxHashMap::default();
        for (label, postings) in t2.inverted_list_label_id_to_postl.iter() {
            candidates.insert(*label, postings.clone());
        }

        let mut mapping = vec![];
        for i in 0..t1.tree_size() as i32 {
            let label = t1.postl_to_label_id[i as usize];
            let Some(postings) = candidates.get_mut(&label) else {
                continue;
            };
            let found = postings
                .iter()
                .position(|j| Self::k_relevant(t1, t2, i, *j, k as i32));
            if let Some(pos) = found {
                let j = postings.remove(pos);
                mapping.push((i, j));
            }
        }

        Self::to_ted_mapping(t1, t2, &mapping)
    }

    /// `lb_mapping` plus gap filling: nodes strictly between two mapped pairs
    /// are paired up as renames when they sit in corresponding regions.
    pub fn lb_mapping_fill_gaps(t1: &TreeIndex, t2: &TreeIndex, k: usize) -> Vec<MappingPair> {
        let mapping = Self::lb_mapping(t1, t2, k);
        let filled = Self::fill_gaps_in_mapping(t1, t2, &mapping, k);
        Self::to_ted_mapping(t1, t2, &filled)
    }

    /// Unit cost of a mapping: all unmapped nodes are deleted or inserted,
    /// mapped pairs pay nothing (equal labels) or a rename covered by the
    /// same formula bound.
    pub fn mapping_cost(t1: &TreeIndex, t2: &TreeIndex, mapping: &[MappingPair]) -> f64 {
        let mut cost = (t1.tree_size() + t2.tree_size()) as f64 - 2.0 * mapping.len() as f64;
        for (i, j) in mapping.iter() {
            if t1.postl_to_label_id[*i as usize] != t2.postl_to_label_id[*j as usize] {
                cost += 1.0;
            }
        }
        cost
    }

    /// Upper bound with threshold semantics: the mapping cost if it is at
    /// most `k`, infinity otherwise.
    pub fn verify(t1: &TreeIndex, t2: &TreeIndex, k: usize) -> f64 {
        let mapping = Self::lb_mapping_fill_gaps(t1, t2, k);
        let cost = Self::mapping_cost(t1, t2, &mapping);
        if cost <= k as f64 {
            cost
        } else {
            f64::INFINITY
        }
    }

    /// Unthresholded upper bound: every pair is relevant at `k = |T1|+|T2|`.
    pub fn ub(t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        let k = t1.tree_size() + t2.tree_size();
        let mapping = Self::lb_mapping_fill_gaps(t1, t2, k);
        Self::mapping_cost(t1, t2, &mapping)
    }

    fn k_relevant(t1: &TreeIndex, t2: &TreeIndex, x: i32, y: i32, k: i32) -> bool {
        let t1_size = t1.tree_size() as i32;
        let t2_size = t2.tree_size() as i32;
        let x_size = t1.postl_to_size[x as usize];
        let y_size = t2.postl_to_size[y as usize];
        let lower_bound = ((t1_size - (x + 1)) - (t2_size - (y + 1))).abs()
            + (x_size - y_size).abs()
            + (((x + 1) - x_size) - ((y + 1) - y_size)).abs();
        lower_bound <= k
    }

    /// Revises a one-to-one mapping, sorted by the first component, into a
    /// valid TED mapping. Pairs violating monotonicity are dropped; the
    /// ancestor condition is enforced by counting mapped descendants and
    /// mapped nodes to the left of every node, which must agree on both
    /// sides of a kept pair.
    fn to_ted_mapping(t1: &TreeIndex, t2: &TreeIndex, mapping: &[MappingPair]) -> Vec<MappingPair> {
        let mut ted_mapping = vec![];

        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();
        let mut t1_count_mapped_desc = vec![0i32; t1_size];
        let mut t2_count_mapped_desc = vec![0i32; t2_size];
        let mut t1_count_mapped_left = vec![0i32; t1_size];
        let mut t2_count_mapped_left = vec![0i32; t2_size];

        let mut t1_i = 0i32;
        let mut t2_i = 0i32;
        let mut prev_t2 = -1i32;
        let mut mapped_t1_node_processed = false;
        let mut mapped_t2_node_processed = false;

        for (cur_t1, cur_t2) in mapping.iter().copied() {
            // Monotonicity test on the second component.
            if cur_t2 < prev_t2 {
                continue;
            }

            // A node smaller than the counter has already been processed as
            // non-mapped; roll its contribution forward differently below.
            if cur_t1 < t1_i {
                t1_i = cur_t1;
                mapped_t1_node_processed = true;
            }
            if cur_t2 < t2_i {
                t2_i = cur_t2;
                mapped_t2_node_processed = true;
            }
            if cur_t1 == t1_i {
                mapped_t1_node_processed = false;
            }
            if cur_t2 == t2_i {
                mapped_t2_node_processed = false;
            }

            // Nodes before cur_t1 that are not in the mapping.
            while t1_i < cur_t1 {
                let parent = t1.postl_to_parent[t1_i as usize];
                if parent > -1 {
                    t1_count_mapped_desc[parent as usize] += t1_count_mapped_desc[t1_i as usize];
                    let rl = t1.postl_to_rl[t1_i as usize];
                    if rl > -1 && t1.postl_to_size[t1_i as usize] == 1 {
                        t1_count_mapped_left[rl as usize] = t1_count_mapped_left[t1_i as usize];
                    }
                    if t1.postl_to_prel[parent as usize] + 1 == t1.postl_to_prel[t1_i as usize] {
                        t1_count_mapped_left[parent as usize] =
                            t1_count_mapped_left[t1_i as usize];
                    }
                }
                t1_i += 1;
            }
            while t2_i < cur_t2 {
                let parent = t2.postl_to_parent[t2_i as usize];
                if parent > -1 {
                    t2_count_mapped_desc[parent as usize] += t2_count_mapped_desc[t2_i as usize];
                    let rl = t2.postl_to_rl[t2_i as usize];
                    if rl > -1 && t2.postl_to_size[t2_i as usize] == 1 {
                        t2_count_mapped_left[rl as usize] = t2_count_mapped_left[t2_i as usize];
                    }
                    if t2.postl_to_prel[parent as usize] + 1 == t2.postl_to_prel[t2_i as usize] {
                        t2_count_mapped_left[parent as usize] =
                            t2_count_mapped_left[t2_i as usize];
                    }
                }
                t2_i += 1;
            }

            // Ancestor and left-of conditions: the counters must agree.
            if t1_count_mapped_desc[cur_t1 as usize] != t2_count_mapped_desc[cur_t2 as usize] {
                continue;
            }
            if t1_count_mapped_left[cur_t1 as usize] != t2_count_mapped_left[cur_t2 as usize] {
                continue;
            }

            // Process cur_t1 as a mapped node.
            if !mapped_t1_node_processed {
                let parent = t1.postl_to_parent[t1_i as usize];
                if parent > -1 {
                    t1_count_mapped_desc[parent as usize] +=
                        t1_count_mapped_desc[t1_i as usize] + 1;
                    let rl = t1.postl_to_rl[t1_i as usize];
                    if rl > -1 {
                        if t1.postl_to_size[t1_i as usize] == 1 {
                            t1_count_mapped_left[rl as usize] =
                                t1_count_mapped_left[t1_i as usize] + 1;
                        } else {
                            t1_count_mapped_left[rl as usize] += 1;
                        }
                    }
                    if t1.postl_to_prel[parent as usize] + 1 == t1.postl_to_prel[t1_i as usize] {
                        t1_count_mapped_left[parent as usize] =
                            t1_count_mapped_left[t1_i as usize];
                    }
                }
                t1_i += 1;
            } else {
                let parent = t1.postl_to_parent[t1_i as usize];
                if parent > -1 {
                    t1_count_mapped_desc[parent as usize] += 1;
                }
                t1_i += 1;
            }
            if !mapped_t2_node_processed {
                let parent = t2.postl_to_parent[t2_i as usize];
                if parent > -1 {
                    t2_count_mapped_desc[parent as usize] +=
                        t2_count_mapped_desc[t2_i as usize] + 1;
                    let rl = t2.postl_to_rl[t2_i as usize];
                    if rl > -1 {
                        if t2.postl_to_size[t2_i as usize] == 1 {
                            t2_count_mapped_left[rl as usize] =
                                t2_count_mapped_left[t2_i as usize] + 1;
                        } else {
                            t2_count_mapped_left[rl as usize] += 1;
                        }
                    }
                    if t2.postl_to_prel[parent as usize] + 1 == t2.postl_to_prel[t2_i as usize] {
                        t2_count_mapped_left[parent as usize] =
                            t2_count_mapped_left[t2_i as usize];
                    }
                }
                t2_i += 1;
            } else {
                let parent = t2.postl_to_parent[t2_i as usize];
                if parent > -1 {
                    t2_count_mapped_desc[parent as usize] += 1;
                }
                t2_i += 1;
            }

            ted_mapping.push((cur_t1, cur_t2));
            prev_t2 = cur_t2;
        }

        ted_mapping
    }

    /// True iff `i` relates to the gap endpoints in T1 the same way `j`
    /// relates to them in T2 (descendant of the gap end, ancestor of the gap
    /// begin).
    fn if_in_corresponding_regions(
        t1: &TreeIndex,
        t2: &TreeIndex,
        t1_begin_gap: i32,
        i: i32,
        t1_end_gap: i32,
        t2_begin_gap: i32,
        j: i32,
        t2_end_gap: i32,
    ) -> bool {
        let desc = |t: &TreeIndex, n: i32, e: i32| -> bool {
            e >= 0 && n < e && t.postl_to_lld[e as usize] <= n
        };
        let anc = |t: &TreeIndex, n: i32, b: i32| -> bool {
            b >= 0 && b < n && t.postl_to_lld[n as usize] <= b
        };
        desc(t1, i, t1_end_gap) == desc(t2, j, t2_end_gap)
            && anc(t1, i, t1_begin_gap) == anc(t2, j, t2_begin_gap)
    }

    /// Pairs up unmapped nodes lying strictly between two consecutive mapped
    /// pairs; labels are disregarded, such pairs pay a rename.
    fn fill_gaps_in_mapping(
        t1: &TreeIndex,
        t2: &TreeIndex,
        mapping: &[MappingPair],
        k: usize,
    ) -> Vec<MappingPair> {
        let mut filled = vec![];
        let mut prev: MappingPair = (-1, -1);

        for cur in mapping.iter().copied() {
            let mut i = prev.0 + 1;
            let mut j = prev.1 + 1;
            while i < cur.0 && j < cur.1 {
                if Self::k_relevant(t1, t2, i, j, k as i32)
                    && Self::if_in_corresponding_regions(
                        t1, t2, prev.0, i, cur.0, prev.1, j, cur.1,
                    )
                {
                    filled.push((i, j));
                    i += 1;
                    j += 1;
                } else if t1.postl_to_size[i as usize] <= t2.postl_to_size[j as usize] {
                    i += 1;
                } else {
                    j += 1;
                }
            }
            filled.push(cur);
            prev = cur;
        }

        filled
    }
}
