//! Tree edit distance with an optimal path strategy, after APTED by Pawlik
//! and Augsten.
//!
//! [1] M. Pawlik and N. Augsten. RTED: A Robust Algorithm for the Tree Edit
//!     Distance. PVLDB. 2011.
//!
//! [2] M. Pawlik and N. Augsten. A Memory-Efficient Tree Edit Distance
//!     Algorithm. DEXA. 2014.
//!
//! [3] M. Pawlik and N. Augsten. Efficient Computation of the Tree Edit
//!     Distance. ACM Transactions on Database Systems (TODS). 2015.
//!
//! [4] M. Pawlik and N. Augsten. Tree edit distance: Robust and
//!     memory-efficient. Information Systems. 2016.
//!
//! The strategy matrix weighs all three decompositions (left, right, inner
//! path) per subtree pair from the precomputed cost sums. Subtree pairs with
//! a single-node side short-circuit through `spf1`; left and right paths run
//! a keyroot forest DP along their spine (`spf_l`/`spf_r`), inner paths run
//! the dedicated `spf_a` that closes the still-open pairs of every inner
//! path node bottom-up.

use crate::cost::CostModel;
use crate::indexing::AptedIndex;
use crate::matrix::Matrix;
use crate::parsing::LabelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathType {
    Left,
    Right,
    Inner,
}

pub struct Apted<C: CostModel> {
    costs: C,
    /// Distances between subtree pairs excluding the root operation costs,
    /// indexed by preorder pairs.
    delta: Matrix<f64>,
    subproblem_counter: u64,
}

impl<C: CostModel> Apted<C> {
    pub fn new(costs: C) -> Self {
        Self {
            costs,
            delta: Matrix::new(0, 0, 0.0),
            subproblem_counter: 0,
        }
    }

    pub fn ted(&mut self, t1: &AptedIndex, t2: &AptedIndex) -> f64 {
        self.subproblem_counter = 0;
        let strategy = self.compute_opt_strategy_postl(t1, t2);
        self.ted_init(t1, t2);
        self.gted(t1, t2, 0, 0, &strategy)
    }

    /// Falls through to `ted`; the strategy machinery has no threshold
    /// support.
    pub fn ted_k(&mut self, t1: &AptedIndex, t2: &AptedIndex, _k: usize) -> f64 {
        self.ted(t1, t2)
    }

    pub fn subproblem_count(&self) -> u64 {
        self.subproblem_counter
    }

    #[inline(always)]
    fn label(t: &AptedIndex, prel: i32) -> LabelId {
        t.prel_to_label_id_[prel as usize]
    }

    /// Chooses, for every subtree pair, the decomposition path minimising the
    /// estimated number of subproblems. Runs in postorder over both trees;
    /// cost rows of a node are pushed up to its parent once the node is done.
    /// Path ids: negative for left paths, positive for right and inner paths,
    /// offset by `|T1|` when the path is in the second tree.
    fn compute_opt_strategy_postl(&mut self, t1: &AptedIndex, t2: &AptedIndex) -> Matrix<f64> {
        let size1 = t1.c.tree_size;
        let size2 = t2.c.tree_size;
        let mut strategy = Matrix::new(size1, size2, 0.0f64);
        // Per-node cost rows, indexed by (postorder in T1, postorder in T2).
        let mut cost1_l = Matrix::new(size1, size2, 0.0f64);
        let mut cost1_r = Matrix::new(size1, size2, 0.0f64);
        let mut cost1_i = Matrix::new(size1, size2, 0.0f64);
        let mut cost2_l = vec![0.0f64; size2];
        let mut cost2_r = vec![0.0f64; size2];
        let mut cost2_i = vec![0.0f64; size2];
        let mut cost2_path = vec![0i32; size2];
        let path_id_offset = size1 as i32;

        for v in 0..size1 {
            let v_in_prel = t1.postl_to_prel_[v] as usize;
            let is_v_leaf = t1.is_leaf(v_in_prel as i32);
            let parent_v_prel = t1.prel_to_parent_[v_in_prel];
            let parent_v_postl = if parent_v_prel != -1 {
                t1.prel_to_postl_[parent_v_prel as usize] as usize
            } else {
                usize::MAX
            };

            let size_v = t1.prel_to_size_[v_in_prel];
            let left_path_v =
                -(t1.prer_to_prel_[(t1.prel_to_prer_[v_in_prel] + size_v - 1) as usize] + 1);
            let right_path_v = v_in_prel as i32 + size_v - 1 + 1;

            if is_v_leaf {
                for i in 0..size2 {
                    let w_prel = t2.postl_to_prel_[i] as usize;
                    *strategy.at(v_in_prel, w_prel) = v_in_prel as f64;
                }
            }

            cost2_l.fill(0.0);
            cost2_r.fill(0.0);
            cost2_i.fill(0.0);
            cost2_path.fill(0);

            for w in 0..size2 {
                let w_in_prel = t2.postl_to_prel_[w] as usize;
                let parent_w_prel = t2.prel_to_parent_[w_in_prel];
                let parent_w_postl = if parent_w_prel != -1 {
                    t2.prel_to_postl_[parent_w_prel as usize] as usize
                } else {
                    usize::MAX
                };
                let size_w = t2.prel_to_size_[w_in_prel];
                if t2.is_leaf(w_in_prel as i32) {
                    cost2_l[w] = 0.0;
                    cost2_r[w] = 0.0;
                    cost2_i[w] = 0.0;
                    cost2_path[w] = w_in_prel as i32;
                }

                let mut min_cost = f64::MAX;
                let mut strategy_path = -1i32;

                if size_v <= 1 || size_w <= 1 {
                    min_cost = size_v.max(size_w) as f64;
                } else {
                    let mut tmp_cost = size_v as f64
                        * t2.prel_to_cost_left_[w_in_prel] as f64
                        + cost1_l.read_at(v, w);
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = left_path_v;
                    }
                    tmp_cost = size_v as f64 * t2.prel_to_cost_right_[w_in_prel] as f64
                        + cost1_r.read_at(v, w);
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = right_path_v;
                    }
                    tmp_cost = size_v as f64 * t2.prel_to_cost_all_[w_in_prel] as f64
                        + cost1_i.read_at(v, w);
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = strategy.read_at(v_in_prel, w_in_prel) as i32 + 1;
                    }
                    tmp_cost =
                        size_w as f64 * t1.prel_to_cost_left_[v_in_prel] as f64 + cost2_l[w];
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = -(t2.prer_to_prel_
                            [(t2.prel_to_prer_[w_in_prel] + size_w - 1) as usize]
                            + path_id_offset
                            + 1);
                    }
                    tmp_cost =
                        size_w as f64 * t1.prel_to_cost_right_[v_in_prel] as f64 + cost2_r[w];
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = w_in_prel as i32 + size_w - 1 + path_id_offset + 1;
                    }
                    tmp_cost =
                        size_w as f64 * t1.prel_to_cost_all_[v_in_prel] as f64 + cost2_i[w];
                    if tmp_cost < min_cost {
                        min_cost = tmp_cost;
                        strategy_path = cost2_path[w] + path_id_offset + 1;
                    }
                }

                if parent_v_prel != -1 {
                    *cost1_r.at(parent_v_postl, w) += min_cost;
                    let tmp_cost = -min_cost + cost1_i.read_at(v, w);
                    if tmp_cost < cost1_i.read_at(parent_v_postl, w) {
                        *cost1_i.at(parent_v_postl, w) = tmp_cost;
                        let propagated = strategy.read_at(v_in_prel, w_in_prel);
                        *strategy.at(parent_v_prel as usize, w_in_prel) = propagated;
                    }
                    if t1.prel_to_type_right_[v_in_prel] {
                        *cost1_i.at(parent_v_postl, w) += cost1_r.read_at(parent_v_postl, w);
                        *cost1_r.at(parent_v_postl, w) += cost1_r.read_at(v, w) - min_cost;
                    }
                    if t1.prel_to_type_left_[v_in_prel] {
                        *cost1_l.at(parent_v_postl, w) += cost1_l.read_at(v, w);
                    } else {
                        *cost1_l.at(parent_v_postl, w) += min_cost;
                    }
                }
                if parent_w_prel != -1 {
                    cost2_r[parent_w_postl] += min_cost;
                    let tmp_cost = -min_cost + cost2_i[w];
                    if tmp_cost < cost2_i[parent_w_postl] {
                        cost2_i[parent_w_postl] = tmp_cost;
                        cost2_path[parent_w_postl] = cost2_path[w];
                    }
                    if t2.prel_to_type_right_[w_in_prel] {
                        cost2_i[parent_w_postl] += cost2_r[parent_w_postl];
                        cost2_r[parent_w_postl] += cost2_r[w] - min_cost;
                    }
                    if t2.prel_to_type_left_[w_in_prel] {
                        cost2_l[parent_w_postl] += cost2_l[w];
                    } else {
                        cost2_l[parent_w_postl] += min_cost;
                    }
                }

                *strategy.at(v_in_prel, w_in_prel) = strategy_path as f64;
            }
        }
        strategy
    }

    /// Prefills delta for pairs with a single-node side: with the roots
    /// mapped to each other, the only completion is inserting or deleting the
    /// rest of the non-trivial subtree.
    fn ted_init(&mut self, t1: &AptedIndex, t2: &AptedIndex) {
        let size1 = t1.c.tree_size;
        let size2 = t2.c.tree_size;
        self.delta = Matrix::new(size1, size2, 0.0);

        for i in 0..size1 {
            for j in 0..size2 {
                if t1.prel_to_size_[i] == 1 && t2.prel_to_size_[j] == 1 {
                    continue;
                }
                if t1.prel_to_size_[i] == 1 {
                    *self.delta.at(i, j) = t2.prel_to_subtree_ins_cost_[j]
                        - self.costs.ins(Self::label(t2, j as i32));
                } else if t2.prel_to_size_[j] == 1 {
                    *self.delta.at(i, j) = t1.prel_to_subtree_del_cost_[i]
                        - self.costs.del(Self::label(t1, i as i32));
                }
            }
        }
    }

    fn strategy_path_type(
        path_id: i32,
        path_id_offset: i32,
        current_root: i32,
        subtree_size: i32,
    ) -> PathType {
        if path_id < 0 {
            return PathType::Left;
        }
        let mut path = path_id.abs() - 1;
        if path >= path_id_offset {
            path -= path_id_offset;
        }
        if path == current_root + subtree_size - 1 {
            PathType::Right
        } else {
            PathType::Inner
        }
    }

    /// General TED recursion: decompose along the strategy path, solve the
    /// subtrees hanging off the path recursively, then run the single-path
    /// function for the path itself.
    fn gted(
        &mut self,
        t1: &AptedIndex,
        t2: &AptedIndex,
        cur1: i32,
        cur2: i32,
        strategy: &Matrix<f64>,
    ) -> f64 {
        let size1 = t1.prel_to_size_[cur1 as usize];
        let size2 = t2.prel_to_size_[cur2 as usize];

        if size1 == 1 || size2 == 1 {
            return self.spf1(t1, cur1, t2, cur2);
        }

        let strategy_path_id = strategy.read_at(cur1 as usize, cur2 as usize) as i32;
        let path_id_offset = t1.c.tree_size as i32;

        if strategy_path_id.abs() - 1 < path_id_offset {
            // Path in the left-hand tree. All path ids encode the leaf the
            // path ends in: left and right ids name the outermost leaves,
            // inner ids the leaf propagated by the strategy computation.
            let path_type =
                Self::strategy_path_type(strategy_path_id, path_id_offset, cur1, size1);
            let path_leaf = strategy_path_id.abs() - 1;
            let mut current = path_leaf;
            loop {
                let parent = t1.prel_to_parent_[current as usize];
                if parent < cur1 {
                    break;
                }
                for child in t1.prel_to_children_[parent as usize].iter() {
                    if *child != current {
                        self.gted(t1, t2, *child, cur2, strategy);
                    }
                }
                current = parent;
            }
            return match path_type {
                PathType::Left => self.spf_l(t1, t2, cur1, cur2, false),
                PathType::Right => self.spf_r(t1, t2, cur1, cur2, false),
                PathType::Inner => self.spf_a(t1, t2, cur1, cur2, path_leaf, false),
            };
        }

        // Path in the right-hand tree; the single-path functions run with
        // swapped inputs.
        let path_type = Self::strategy_path_type(strategy_path_id, path_id_offset, cur2, size2);
        let path_leaf = strategy_path_id.abs() - path_id_offset - 1;
        let mut current = path_leaf;
        loop {
            let parent = t2.prel_to_parent_[current as usize];
            if parent < cur2 {
                break;
            }
            for child in t2.prel_to_children_[parent as usize].iter() {
                if *child != current {
                    self.gted(t1, t2, cur1, *child, strategy);
                }
            }
            current = parent;
        }
        match path_type {
            PathType::Left => self.spf_l(t2, t1, cur2, cur1, true),
            PathType::Right => self.spf_r(t2, t1, cur2, cur1, true),
            PathType::Inner => self.spf_a(t2, t1, cur2, cur1, path_leaf, true),
        }
    }

    /// Distances where one of the subtrees is a single node: either delete
    /// it, or map it to the cheapest node of the other subtree.
    fn spf1(&mut self, t1: &AptedIndex, root1: i32, t2: &AptedIndex, root2: i32) -> f64 {
        let size1 = t1.prel_to_size_[root1 as usize];
        let size2 = t2.prel_to_size_[root2 as usize];

        if size1 == 1 && size2 == 1 {
            let max_cost = self.costs.del(Self::label(t1, root1)) + self.costs.ins(Self::label(t2, root2));
            let ren_cost = self
                .costs
                .ren(Self::label(t1, root1), Self::label(t2, root2));
            return ren_cost.min(max_cost);
        }
        if size1 == 1 {
            let mut cost = t2.prel_to_subtree_ins_cost_[root2 as usize];
            let max_cost = cost + self.costs.del(Self::label(t1, root1));
            let mut min_ren_minus_ins = cost;
            for i in root2..root2 + size2 {
                let node_ren_minus_ins = self
                    .costs
                    .ren(Self::label(t1, root1), Self::label(t2, i))
                    - self.costs.ins(Self::label(t2, i));
                if node_ren_minus_ins < min_ren_minus_ins {
                    min_ren_minus_ins = node_ren_minus_ins;
                }
            }
            cost += min_ren_minus_ins;
            return cost.min(max_cost);
        }
        // size2 == 1
        let mut cost = t1.prel_to_subtree_del_cost_[root1 as usize];
        let max_cost = cost + self.costs.ins(Self::label(t2, root2));
        let mut min_ren_minus_del = cost;
        for i in root1..root1 + size1 {
            let node_ren_minus_del = self
                .costs
                .ren(Self::label(t1, i), Self::label(t2, root2))
                - self.costs.del(Self::label(t1, i));
            if node_ren_minus_del < min_ren_minus_del {
                min_ren_minus_del = node_ren_minus_del;
            }
        }
        cost += min_ren_minus_del;
        cost.min(max_cost)
    }

    /// Keyroots of the decomposition of `subtree_root` along the path ending
    /// in `path_leaf`, in descending preorder (deepest processed first).
    fn collect_keyroots(
        t: &AptedIndex,
        subtree_root: i32,
        path_leaf: i32,
        left: bool,
    ) -> Vec<i32> {
        let mut keyroots = vec![];
        let mut stack = vec![(subtree_root, path_leaf)];
        while let Some((root, leaf)) = stack.pop() {
            keyroots.push(root);
            let mut path_node = leaf;
            while path_node > root {
                let parent = t.prel_to_parent_[path_node as usize];
                for child in t.prel_to_children_[parent as usize].iter() {
                    if *child != path_node {
                        let child_leaf = if left {
                            t.prel_to_lld(*child)
                        } else {
                            t.prel_to_rld(*child)
                        };
                        stack.push((*child, child_leaf));
                    }
                }
                path_node = parent;
            }
        }
        // Descendant keyroots must close their subtree pairs first.
        keyroots.sort_unstable_by(|a, b| b.cmp(a));
        keyroots
    }

    /// Single-path function for the left path: Zhang-Shasha style forest DP
    /// between the left-hand subtree and every keyroot of the right-hand
    /// subtree.
    fn spf_l(
        &mut self,
        it1: &AptedIndex,
        it2: &AptedIndex,
        cur1: i32,
        cur2: i32,
        trees_swapped: bool,
    ) -> f64 {
        let keyroots = Self::collect_keyroots(it2, cur2, it2.prel_to_lld(cur2), true);
        let size1 = it1.prel_to_size_[cur1 as usize] as usize;
        let size2 = it2.prel_to_size_[cur2 as usize] as usize;
        let mut forestdist = Matrix::new(size1 + 1, size2 + 1, 0.0f64);
        for kr in keyroots.iter() {
            self.tree_edit_dist(it1, it2, cur1, *kr, &mut forestdist, trees_swapped);
        }
        forestdist.read_at(size1, size2)
    }

    /// Single-path function for the right path; mirror image of `spf_l` in
    /// right-to-left postorder.
    fn spf_r(
        &mut self,
        it1: &AptedIndex,
        it2: &AptedIndex,
        cur1: i32,
        cur2: i32,
        trees_swapped: bool,
    ) -> f64 {
        let keyroots = Self::collect_keyroots(it2, cur2, it2.prel_to_rld(cur2), false);
        let size1 = it1.prel_to_size_[cur1 as usize] as usize;
        let size2 = it2.prel_to_size_[cur2 as usize] as usize;
        let mut forestdist = Matrix::new(size1 + 1, size2 + 1, 0.0f64);
        for kr in keyroots.iter() {
            self.rev_tree_edit_dist(it1, it2, cur1, *kr, &mut forestdist, trees_swapped);
        }
        forestdist.read_at(size1, size2)
    }

    /// Single-path function for an inner path ending in `path_leaf`. The
    /// recursion in `gted` solved every subtree pair hanging off the path,
    /// so the pairs still open are exactly those of the path nodes
    /// themselves. They are closed bottom-up along the path: one forest pass
    /// per path node against the right-hand keyroot decomposition, each pass
    /// reading only distances closed by the recursion, by a lower path node,
    /// or by a deeper keyroot of the same pass. The pass for the subtree
    /// root yields the result.
    fn spf_a(
        &mut self,
        it1: &AptedIndex,
        it2: &AptedIndex,
        cur1: i32,
        cur2: i32,
        path_leaf: i32,
        trees_swapped: bool,
    ) -> f64 {
        let keyroots = Self::collect_keyroots(it2, cur2, it2.prel_to_lld(cur2), true);
        let size2 = it2.prel_to_size_[cur2 as usize] as usize;

        let mut result = 0.0;
        let mut path_node = path_leaf;
        loop {
            let size1 = it1.prel_to_size_[path_node as usize] as usize;
            let mut forestdist = Matrix::new(size1 + 1, size2 + 1, 0.0f64);
            for kr in keyroots.iter() {
                self.tree_edit_dist(it1, it2, path_node, *kr, &mut forestdist, trees_swapped);
            }
            result = forestdist.read_at(size1, size2);
            if path_node == cur1 {
                break;
            }
            path_node = it1.prel_to_parent_[path_node as usize];
        }
        result
    }

    fn tree_edit_dist(
        &mut self,
        it1: &AptedIndex,
        it2: &AptedIndex,
        it1_subtree: i32,
        it2_subtree: i32,
        forestdist: &mut Matrix<f64>,
        trees_swapped: bool,
    ) {
        // Global left-to-right postorder of both subtree roots.
        let i = it1.prel_to_postl_[it1_subtree as usize];
        let j = it2.prel_to_postl_[it2_subtree as usize];
        let ioff = it1.postl_to_lld_[i as usize] - 1;
        let joff = it2.postl_to_lld_[j as usize] - 1;

        let label1 = |i1: i32| Self::label(it1, it1.postl_to_prel_[i1 as usize]);
        let label2 = |j1: i32| Self::label(it2, it2.postl_to_prel_[j1 as usize]);

        for i1 in 1..=(i - ioff) {
            let cost = if trees_swapped {
                self.costs.ins(label1(i1 + ioff))
            } else {
                self.costs.del(label1(i1 + ioff))
            };
            *forestdist.at(i1 as usize, 0) = forestdist.read_at(i1 as usize - 1, 0) + cost;
        }
        for j1 in 1..=(j - joff) {
            let cost = if trees_swapped {
                self.costs.del(label2(j1 + joff))
            } else {
                self.costs.ins(label2(j1 + joff))
            };
            *forestdist.at(0, j1 as usize) = forestdist.read_at(0, j1 as usize - 1) + cost;
        }

        for i1 in 1..=(i - ioff) {
            for j1 in 1..=(j - joff) {
                self.subproblem_counter += 1;
                let u = if trees_swapped {
                    self.costs.ren(label2(j1 + joff), label1(i1 + ioff))
                } else {
                    self.costs.ren(label1(i1 + ioff), label2(j1 + joff))
                };
                let da = forestdist.read_at(i1 as usize - 1, j1 as usize)
                    + if trees_swapped {
                        self.costs.ins(label1(i1 + ioff))
                    } else {
                        self.costs.del(label1(i1 + ioff))
                    };
                let db = forestdist.read_at(i1 as usize, j1 as usize - 1)
                    + if trees_swapped {
                        self.costs.del(label2(j1 + joff))
                    } else {
                        self.costs.ins(label2(j1 + joff))
                    };

                if it1.postl_to_lld_[(i1 + ioff) as usize] == it1.postl_to_lld_[i as usize]
                    && it2.postl_to_lld_[(j1 + joff) as usize] == it2.postl_to_lld_[j as usize]
                {
                    let dc = forestdist.read_at(i1 as usize - 1, j1 as usize - 1) + u;
                    let closed = forestdist.read_at(i1 as usize - 1, j1 as usize - 1);
                    *forestdist.at(i1 as usize, j1 as usize) = da.min(db).min(dc);
                    let p1 = it1.postl_to_prel_[(i1 + ioff) as usize] as usize;
                    let p2 = it2.postl_to_prel_[(j1 + joff) as usize] as usize;
                    if trees_swapped {
                        *self.delta.at(p2, p1) = closed;
                    } else {
                        *self.delta.at(p1, p2) = closed;
                    }
                } else {
                    let fi = (it1.postl_to_lld_[(i1 + ioff) as usize] - 1 - ioff) as usize;
                    let fj = (it2.postl_to_lld_[(j1 + joff) as usize] - 1 - joff) as usize;
                    let p1 = it1.postl_to_prel_[(i1 + ioff) as usize] as usize;
                    let p2 = it2.postl_to_prel_[(j1 + joff) as usize] as usize;
                    let subtree = if trees_swapped {
                        self.delta.read_at(p2, p1)
                    } else {
                        self.delta.read_at(p1, p2)
                    };
                    let dc = forestdist.read_at(fi, fj) + subtree + u;
                    *forestdist.at(i1 as usize, j1 as usize) = da.min(db).min(dc);
                }
            }
        }
    }

    fn rev_tree_edit_dist(
        &mut self,
        it1: &AptedIndex,
        it2: &AptedIndex,
        it1_subtree: i32,
        it2_subtree: i32,
        forestdist: &mut Matrix<f64>,
        trees_swapped: bool,
    ) {
        // Same DP in right-to-left postorder with rightmost leaf descendants.
        let i = it1.prel_to_postr_[it1_subtree as usize];
        let j = it2.prel_to_postr_[it2_subtree as usize];
        let ioff = it1.postr_to_rld_[i as usize] - 1;
        let joff = it2.postr_to_rld_[j as usize] - 1;

        let label1 = |i1: i32| Self::label(it1, it1.postr_to_prel_[i1 as usize]);
        let label2 = |j1: i32| Self::label(it2, it2.postr_to_prel_[j1 as usize]);

        for i1 in 1..=(i - ioff) {
            let cost = if trees_swapped {
                self.costs.ins(label1(i1 + ioff))
            } else {
                self.costs.del(label1(i1 + ioff))
            };
            *forestdist.at(i1 as usize, 0) = forestdist.read_at(i1 as usize - 1, 0) + cost;
        }
        for j1 in 1..=(j - joff) {
            let cost = if trees_swapped {
                self.costs.del(label2(j1 + joff))
            } else {
                self.costs.ins(label2(j1 + joff))
            };
            *forestdist.at(0, j1 as usize) = forestdist.read_at(0, j1 as usize - 1) + cost;
        }

        for i1 in 1..=(i - ioff) {
            for j1 in 1..=(j - joff) {
                self.subproblem_counter += 1;
                let u = if trees_swapped {
                    self.costs.ren(label2(j1 + joff), label1(i1 + ioff))
                } else {
                    self.costs.ren(label1(i1 + ioff), label2(j1 + joff))
                };
                let da = forestdist.read_at(i1 as usize - 1, j1 as usize)
                    + if trees_swapped {
                        self.costs.ins(label1(i1 + ioff))
                    } else {
                        self.costs.del(label1(i1 + ioff))
                    };
                let db = forestdist.read_at(i1 as usize, j1 as usize - 1)
                    + if trees_swapped {
                        self.costs.del(label2(j1 + joff))
                    } else {
                        self.costs.ins(label2(j1 + joff))
                    };

                if it1.postr_to_rld_[(i1 + ioff) as usize] == it1.postr_to_rld_[i as usize]
                    && it2.postr_to_rld_[(j1 + joff) as usize] == it2.postr_to_rld_[j as usize]
                {
                    let closed = forestdist.read_at(i1 as usize - 1, j1 as usize - 1);
                    let dc = closed + u;
                    *forestdist.at(i1 as usize, j1 as usize) = da.min(db).min(dc);
                    let p1 = it1.postr_to_prel_[(i1 + ioff) as usize] as usize;
                    let p2 = it2.postr_to_prel_[(j1 + joff) as usize] as usize;
                    if trees_swapped {
                        *self.delta.at(p2, p1) = closed;
                    } else {
                        *self.delta.at(p1, p2) = closed;
                    }
                } else {
                    let fi = (it1.postr_to_rld_[(i1 + ioff) as usize] - 1 - ioff) as usize;
                    let fj = (it2.postr_to_rld_[(j1 + joff) as usize] - 1 - joff) as usize;
                    let p1 = it1.postr_to_prel_[(i1 + ioff) as usize] as usize;
                    let p2 = it2.postr_to_prel_[(j1 + joff) as usize] as usize;
                    let subtree = if trees_swapped {
                        self.delta.read_at(p2, p1)
                    } else {
                        self.delta.read_at(p1, p2)
                    };
                    let dc = forestdist.read_at(fi, fj) + subtree + u;
                    *forestdist.at(i1 as usize, j1 as usize) = da.min(db).min(dc);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::UnitCostModel;
    use crate::indexing::{Indexer, TreeIndex};
    use crate::parsing::{parse_single, LabelDict};
    use crate::ted::zhang_shasha::ZhangShasha;
    use crate::ted::TedEngine;

    fn apted_of(s1: &str, s2: &str) -> f64 {
        let mut ld = LabelDict::new();
        let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
        let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
        let i1 = AptedIndex::index_tree(&t1, &ld);
        let i2 = AptedIndex::index_tree(&t2, &ld);
        let mut apted = Apted::new(UnitCostModel);
        apted.ted(&i1, &i2)
    }

    #[test]
    fn test_identity() {
        assert_eq!(apted_of("{a}", "{a}"), 0.0);
        assert_eq!(apted_of("{a{b{c}{d}}{e}}", "{a{b{c}{d}}{e}}"), 0.0);
    }

    #[test]
    fn test_single_node_pairs() {
        assert_eq!(apted_of("{a}", "{b}"), 1.0);
        assert_eq!(apted_of("{a}", "{b{a}}"), 1.0);
        assert_eq!(apted_of("{x{y}{z}}", "{x}"), 2.0);
    }

    #[test]
    fn test_spec_scenarios() {
        assert_eq!(apted_of("{a{b}{c}}", "{a{b}}"), 1.0);
        assert_eq!(apted_of("{a{b}{c}}", "{a{c}{b}}"), 2.0);
        assert_eq!(apted_of("{a{b{c}}}", "{a{c}}"), 1.0);
        assert_eq!(apted_of("{a{b}{c}{d}}", "{e{f}{g}{h}}"), 4.0);
    }

    #[test]
    fn test_agrees_with_zhang_shasha() {
        let pairs = [
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
            ("{a{b{d}{e{g}}}{c{f}}}", "{a{b{d}{e}}{c{f{g}}}}"),
            ("{a{b{c}{d}{e}}{f}}", "{b{a{c}{e}}{f{d}}}"),
            ("{0{1{2}{3}}{4{5{6}{7}}{8}}}", "{0{4{5{6}{7}}{8}}{1{2}{3}}}"),
        ];
        for (s1, s2) in pairs {
            let mut ld = LabelDict::new();
            let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
            let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
            let zi1 = TreeIndex::index_tree(&t1, &ld);
            let zi2 = TreeIndex::index_tree(&t2, &ld);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let expected = zs.ted(&zi1, &zi2);

            let ai1 = AptedIndex::index_tree(&t1, &ld);
            let ai2 = AptedIndex::index_tree(&t2, &ld);
            let mut apted = Apted::new(UnitCostModel);
            assert_eq!(apted.ted(&ai1, &ai2), expected, "{s1} vs {s2}");
        }
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("{a{b}{c}}", "{a{c}{b}}"),
            ("{a{b{c{d}}}}", "{a{b}}"),
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
        ];
        for (s1, s2) in pairs {
            assert_eq!(apted_of(s1, s2), apted_of(s2, s1));
        }
    }

    #[test]
    fn test_inner_path_single_path_function() {
        // preorder T1: a=0, b=1, c=2, d=3, e=4, f=5, g=6; the trees differ
        // only in the leaf under b, so the distance is one rename.
        let mut ld = LabelDict::new();
        let t1 = parse_single("{a{b{c}}{d{e}}{f{g}}}".to_owned(), &mut ld).unwrap();
        let t2 = parse_single("{a{b{x}}{d{e}}{f{g}}}".to_owned(), &mut ld).unwrap();
        let i1 = AptedIndex::index_tree(&t1, &ld);
        let i2 = AptedIndex::index_tree(&t2, &ld);

        let mut apted = Apted::new(UnitCostModel);
        apted.ted_init(&i1, &i2);

        // Hand-built strategy: left paths everywhere, except the root pair
        // decomposes along the inner path a -> d -> e (leaf preorder 4,
        // neither the leftmost nor the rightmost leaf).
        let size1 = i1.c.tree_size;
        let size2 = i2.c.tree_size;
        let mut strategy = Matrix::new(size1, size2, 0.0f64);
        for v in 0..size1 {
            let left_id = -(i1.prel_to_lld(v as i32) + 1);
            for w in 0..size2 {
                *strategy.at(v, w) = left_id as f64;
            }
        }
        *strategy.at(0, 0) = 5.0;
        assert_eq!(
            Apted::<UnitCostModel>::strategy_path_type(5, size1 as i32, 0, size1 as i32),
            PathType::Inner
        );

        assert_eq!(apted.gted(&i1, &i2, 0, 0, &strategy), 1.0);
    }

    #[test]
    fn test_inner_paths_agree_on_heavy_middle_children() {
        // Bushy middle children make the inner decomposition the cheapest
        // estimate, so the computed strategies exercise spf_a as well.
        let pairs = [
            (
                "{a{b}{c{x{q}{r}}{y{s}{t}}{z}}{d}}",
                "{a{b}{c{x{q}{r}}{y{s}}{z{t}}}{d}}",
            ),
            (
                "{r{l}{m{u{v{w}}}{x{y{z}}}}{n}}",
                "{r{l}{m{u{v}}{x{y{z}{w}}}}{n}}",
            ),
        ];
        for (s1, s2) in pairs {
            let mut ld = LabelDict::new();
            let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
            let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
            let zi1 = TreeIndex::index_tree(&t1, &ld);
            let zi2 = TreeIndex::index_tree(&t2, &ld);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let expected = zs.ted(&zi1, &zi2);

            let ai1 = AptedIndex::index_tree(&t1, &ld);
            let ai2 = AptedIndex::index_tree(&t2, &ld);
            let mut apted = Apted::new(UnitCostModel);
            assert_eq!(apted.ted(&ai1, &ai2), expected, "{s1} vs {s2}");
        }
    }

    #[test]
    fn test_counts_subproblems() {
        let mut ld = LabelDict::new();
        let t1 = parse_single("{a{b{c}}{d}}".to_owned(), &mut ld).unwrap();
        let t2 = parse_single("{a{b}{d{c}}}".to_owned(), &mut ld).unwrap();
        let i1 = AptedIndex::index_tree(&t1, &ld);
        let i2 = AptedIndex::index_tree(&t2, &ld);
        let mut apted = Apted::new(UnitCostModel);
        apted.ted(&i1, &i2);
        assert!(apted.subproblem_count() > 0);
    }
}
