//! JEDI-Order baseline using the algorithm by Lusheng Wang and Kaizhong
//! Zhang, "Space efficient algorithms for ordered tree comparison",
//! Algorithmica 51.3 (2008). Constrained edit distance over ordered trees in
//! O(|T1|*|T2|) time; the matrices are indexed by subtree height on the T1
//! axis and rows are recycled along the favorable-child order, which bounds
//! memory to O(height(T1)*|T2|).

use crate::cost::CostModel;
use crate::indexing::TreeIndex;
use crate::matrix::Matrix;

pub struct WangJedi<C: CostModel> {
    costs: C,
    dt: Matrix<f64>,
    df: Matrix<f64>,
    /// Child-sequence edit distance rows, current and previous.
    e: Matrix<f64>,
    e0: Matrix<f64>,
    del_forest: Matrix<f64>,
    del_tree: Matrix<f64>,
    fav_child_dt: Matrix<f64>,
    del_t1_subtree: Vec<f64>,
    del_f1_subtree: Vec<f64>,
    ins_t2_subtree: Vec<f64>,
    ins_f2_subtree: Vec<f64>,
    subproblem_counter: u64,
}

impl<C: CostModel> WangJedi<C> {
    pub fn new(costs: C) -> Self {
        Self {
            costs,
            dt: Matrix::new(0, 0, 0.0),
            df: Matrix::new(0, 0, 0.0),
            e: Matrix::new(0, 0, 0.0),
            e0: Matrix::new(0, 0, 0.0),
            del_forest: Matrix::new(0, 0, 0.0),
            del_tree: Matrix::new(0, 0, 0.0),
            fav_child_dt: Matrix::new(0, 0, 0.0),
            del_t1_subtree: vec![],
            del_f1_subtree: vec![],
            ins_t2_subtree: vec![],
            ins_f2_subtree: vec![],
            subproblem_counter: 0,
        }
    }

    pub fn jedi(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        self.subproblem_counter = 0;

        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();
        let t1_height = t1.postl_to_height[t1_size - 1] as usize;

        self.del_t1_subtree = vec![0.0; t1_size + 1];
        self.del_f1_subtree = vec![0.0; t1_size + 1];
        self.ins_t2_subtree = vec![0.0; t2_size + 1];
        self.ins_f2_subtree = vec![0.0; t2_size + 1];
        self.dt = Matrix::new(t1_height + 1, t2_size + 1, f64::INFINITY);
        self.df = Matrix::new(t1_height + 1, t2_size + 1, f64::INFINITY);
        self.e0 = Matrix::new(t1_height + 1, t2_size + 1, 0.0);
        self.e = Matrix::new(t1_height + 1, t2_size + 1, 0.0);
        self.del_forest = Matrix::new(t1_height + 1, t2_size + 1, f64::INFINITY);
        self.del_tree = Matrix::new(t1_height + 1, t2_size + 1, f64::INFINITY);
        self.fav_child_dt = Matrix::new(t1_height + 1, t2_size + 1, f64::INFINITY);

        // Costs of deleting/inserting whole subtrees and subforests.
        for i in 1..=t1_size {
            let mut del = 0.0;
            for c in t1.postl_to_children[i - 1].iter() {
                del += self.del_t1_subtree[*c as usize + 1];
            }
            self.del_f1_subtree[i] = del;
            self.del_t1_subtree[i] = del + self.costs.del(t1.postl_to_label_id[i - 1]);
        }
        for j in 1..=t2_size {
            let mut ins = 0.0;
            for c in t2.postl_to_children[j - 1].iter() {
                ins += self.ins_t2_subtree[*c as usize + 1];
            }
            self.ins_f2_subtree[j] = ins;
            self.ins_t2_subtree[j] = ins + self.costs.ins(t2.postl_to_label_id[j - 1]);
        }

        for x in 1..=t1_size {
            // Postorder id from the favorable child order.
            let i = t1.favorder_to_postl[x - 1] as usize + 1;
            let h_i = t1.postl_to_height[i - 1] as usize;
            for j in 1..=t2_size {
                self.subproblem_counter += 1;
                let children1 = &t1.postl_to_children[i - 1];
                let children2 = &t2.postl_to_children[j - 1];

                // Cost for deletion of node i.
                let (min_for_del, min_tree_del) = if children1.is_empty() {
                    // A leaf has no child forest for F2 to map into.
                    (f64::INFINITY, f64::INFINITY)
                } else {
                    (
                        self.del_forest.read_at(h_i, j - 1),
                        self.del_tree.read_at(h_i, j - 1),
                    )
                };

                // Cost for insertion of node j.
                let (min_for_ins, min_tree_ins) = if children2.is_empty() {
                    (f64::INFINITY, f64::INFINITY)
                } else {
                    let mut for_ins = f64::INFINITY;
                    let mut tree_ins = f64::INFINITY;
                    for c2 in children2.iter() {
                        for_ins = for_ins.min(
                            self.df.read_at(h_i, *c2 as usize + 1)
                                - self.ins_f2_subtree[*c2 as usize + 1],
                        );
                        tree_ins = tree_ins.min(
                            self.dt.read_at(h_i, *c2 as usize + 1)
                                - self.ins_t2_subtree[*c2 as usize + 1],
                        );
                    }
                    (
                        for_ins + self.ins_f2_subtree[j],
                        tree_ins + self.ins_t2_subtree[j],
                    )
                };

                // Cost for rename: align the child sequences.
                let min_for_ren = if children1.is_empty() {
                    self.ins_f2_subtree[j]
                } else if children2.is_empty() {
                    self.del_f1_subtree[i]
                } else {
                    self.e
                        .read_at(h_i, children2[children2.len() - 1] as usize + 1)
                };

                let for_dist = min_for_del.min(min_for_ins).min(min_for_ren);
                *self.df.at(h_i, j) = for_dist;
                let min_tree_ren = for_dist
                    + self
                        .costs
                        .ren(t1.postl_to_label_id[i - 1], t2.postl_to_label_id[j - 1]);
                *self.dt.at(h_i, j) = min_tree_del.min(min_tree_ins).min(min_tree_ren);

                // Push this node's rows into its parent's state.
                if i != t1_size {
                    let parent = t1.postl_to_parent[i - 1] as usize;
                    let p_i = t1.postl_to_height[parent] as usize;
                    let parent_children = &t1.postl_to_children[parent];

                    // Case 1: i is the favorable child of its parent.
                    if t1.postl_to_fav_child[parent] == (i - 1) as i32 {
                        let dt_i = self.dt.read_at(h_i, j);
                        let df_i = self.df.read_at(h_i, j);
                        *self.fav_child_dt.at(p_i, j) = dt_i;
                        *self.del_forest.at(p_i, j - 1) =
                            self.del_f1_subtree[parent + 1] + df_i - self.del_f1_subtree[i];
                        *self.del_tree.at(p_i, j - 1) =
                            self.del_t1_subtree[parent + 1] + dt_i - self.del_t1_subtree[i];
                        *self.e.at(p_i, 0) = 0.0;
                        for (t, c2) in children2.iter().enumerate() {
                            let prev = if t == 0 {
                                self.e.read_at(p_i, 0)
                            } else {
                                self.e.read_at(p_i, children2[t - 1] as usize + 1)
                            };
                            *self.e.at(p_i, *c2 as usize + 1) =
                                prev + self.ins_t2_subtree[*c2 as usize + 1];
                        }
                    }
                    // Case 2: i is the leftmost child (favorable or not) or
                    // not the favorable child.
                    if (!parent_children.is_empty() && parent_children[0] == (i - 1) as i32)
                        || t1.postl_to_fav_child[parent] != (i - 1) as i32
                    {
                        let dt_i = self.dt.read_at(h_i, j);
                        let df_i = self.df.read_at(h_i, j);
                        let del_forest_cand =
                            self.del_f1_subtree[parent + 1] + df_i - self.del_f1_subtree[i];
                        let del_tree_cand =
                            self.del_t1_subtree[parent + 1] + dt_i - self.del_t1_subtree[i];
                        let cur_forest = self.del_forest.read_at(p_i, j - 1);
                        let cur_tree = self.del_tree.read_at(p_i, j - 1);
                        *self.del_forest.at(p_i, j - 1) = cur_forest.min(del_forest_cand);
                        *self.del_tree.at(p_i, j - 1) = cur_tree.min(del_tree_cand);

                        // Shift the sequence DP by one row: e0 is the row
                        // without subtree i, e the row with it.
                        *self.e0.at(p_i, 0) = self.e.read_at(p_i, 0);
                        for c2 in children2.iter() {
                            *self.e0.at(p_i, *c2 as usize + 1) =
                                self.e.read_at(p_i, *c2 as usize + 1);
                        }
                        *self.e.at(p_i, 0) = self.e0.read_at(p_i, 0) + self.del_t1_subtree[i];
                        for (t, c2) in children2.iter().enumerate() {
                            let c2i = *c2 as usize + 1;
                            let ins_part = if t == 0 {
                                self.e.read_at(p_i, 0) + self.ins_t2_subtree[c2i]
                            } else {
                                self.e.read_at(p_i, children2[t - 1] as usize + 1)
                                    + self.ins_t2_subtree[c2i]
                            };
                            let del_part = self.e0.read_at(p_i, c2i) + self.del_t1_subtree[i];
                            let ren_part = if t == 0 {
                                self.e0.read_at(p_i, 0) + self.dt.read_at(h_i, c2i)
                            } else {
                                self.e0.read_at(p_i, children2[t - 1] as usize + 1)
                                    + self.dt.read_at(h_i, c2i)
                            };
                            *self.e.at(p_i, c2i) = ins_part.min(del_part).min(ren_part);
                        }
                        if j != t2_size {
                            *self.e.at(p_i, 0) = self.e0.read_at(p_i, 0);
                        }
                    }
                    // Case 3: i is the left sibling of the favorable child;
                    // the favorable child's row joins the sequence here.
                    if t1.postl_to_left_fav_child[parent] == (i - 1) as i32 {
                        let fav_child_postid =
                            t1.postl_to_fav_child[parent] as usize + 1;
                        let old_val = self.e.read_at(p_i, 0);
                        *self.e0.at(p_i, 0) = self.e.read_at(p_i, 0);
                        if j != t2_size {
                            *self.e0.at(p_i, 0) += self.del_t1_subtree[i];
                        }
                        for c2 in children2.iter() {
                            *self.e0.at(p_i, *c2 as usize + 1) =
                                self.e.read_at(p_i, *c2 as usize + 1);
                        }
                        *self.e.at(p_i, 0) =
                            self.e0.read_at(p_i, 0) + self.del_t1_subtree[fav_child_postid];
                        for (t, c2) in children2.iter().enumerate() {
                            let c2i = *c2 as usize + 1;
                            let ins_part = if t == 0 {
                                self.e.read_at(p_i, 0) + self.ins_t2_subtree[c2i]
                            } else {
                                self.e.read_at(p_i, children2[t - 1] as usize + 1)
                                    + self.ins_t2_subtree[c2i]
                            };
                            let del_part =
                                self.e0.read_at(p_i, c2i) + self.del_t1_subtree[fav_child_postid];
                            let ren_part = if t == 0 {
                                self.e0.read_at(p_i, 0) + self.fav_child_dt.read_at(p_i, c2i)
                            } else {
                                self.e0.read_at(p_i, children2[t - 1] as usize + 1)
                                    + self.fav_child_dt.read_at(p_i, c2i)
                            };
                            *self.e.at(p_i, c2i) = ins_part.min(del_part).min(ren_part);
                        }
                        if j != t2_size {
                            *self.e.at(p_i, 0) = old_val;
                        }
                    }
                }
            }
        }

        self.dt.read_at(t1_height, t2_size)
    }

    /// The baseline cannot leverage a threshold; falls through to `jedi`.
    pub fn jedi_k(&mut self, t1: &TreeIndex, t2: &TreeIndex, _threshold: f64) -> f64 {
        self.jedi(t1, t2)
    }

    pub fn subproblem_count(&self) -> u64 {
        self.subproblem_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::UnitCostModel;
    use crate::indexing::Indexer;
    use crate::parsing::{parse_single, LabelDict};
    use crate::ted::TedEngine;
    use crate::ub::cted::ConstrainedTed;

    fn indexes(s1: &str, s2: &str) -> (TreeIndex, TreeIndex) {
        let mut ld = LabelDict::new();
        let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
        let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
        (
            TreeIndex::index_tree(&t1, &ld),
            TreeIndex::index_tree(&t2, &ld),
        )
    }

    #[test]
    fn test_identity() {
        let (i1, i2) = indexes(r"{\{\}{a{1}}{b{2}}}", r"{\{\}{a{1}}{b{2}}}");
        let mut wang = WangJedi::new(UnitCostModel);
        assert_eq!(wang.jedi(&i1, &i2), 0.0);
    }

    #[test]
    fn test_value_rename() {
        let (i1, i2) = indexes(r"{\{\}{a{1}}}", r"{\{\}{a{2}}}");
        let mut wang = WangJedi::new(UnitCostModel);
        assert_eq!(wang.jedi(&i1, &i2), 1.0);
    }

    #[test]
    fn test_single_nodes() {
        let (i1, i2) = indexes("{a}", "{b}");
        let mut wang = WangJedi::new(UnitCostModel);
        assert_eq!(wang.jedi(&i1, &i2), 1.0);
    }

    #[test]
    fn test_agrees_with_constrained_ted() {
        // Both compute the constrained edit distance over ordered trees.
        let pairs = [
            ("{a{b}{c}}", "{a{c}{b}}"),
            ("{a{b{c{d}}}}", "{a{b}}"),
            ("{a{b{d}{e}}{c}}", "{a{b{d}}{c{e}}}"),
            ("{a{b}{c}{d}}", "{e{f}{g}{h}}"),
            ("{a{b{c}{d}{e}}{f}}", "{b{a{c}{e}}{f{d}}}"),
        ];
        for (s1, s2) in pairs {
            let (i1, i2) = indexes(s1, s2);
            let mut wang = WangJedi::new(UnitCostModel);
            let mut cted = ConstrainedTed::new(UnitCostModel);
            assert_eq!(wang.jedi(&i1, &i2), cted.ted(&i1, &i2), "{s1} vs {s2}");
        }
    }
}
