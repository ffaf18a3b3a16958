//! JSON edit distance with lower-bound pruning, after QuickJEDI by Huetter
//! et al. Children of unordered nodes are matched with the Hungarian
//! algorithm; array children keep their order and run through a band-limited
//! sequence edit distance. Cheap lower bounds skip the expensive matching
//! step where deletion or insertion wins anyway.

use crate::cost::CostModel;
use crate::indexing::{TreeIndex, NODE_TYPE_ARRAY, NODE_TYPE_KEY, NODE_TYPE_VALUE};
use crate::json::hungarian::execute_hungarian;
use crate::matrix::Matrix;

pub struct QuickJedi<C: CostModel> {
    costs: C,
    /// Tree distances; row/column 0 against the empty tree.
    dt: Matrix<f64>,
    /// Forest distances.
    df: Matrix<f64>,
    /// Sequence edit distance scratch for array children.
    e: Matrix<f64>,
    subproblem_counter: u64,
    pub nr_of_skips: u64,
    pub nr_of_matchings: u64,
    pub nr_of_edits: u64,
    pub nr_of_edit_skips: u64,
}

impl<C: CostModel> QuickJedi<C> {
    pub fn new(costs: C) -> Self {
        Self {
            costs,
            dt: Matrix::new(0, 0, 0.0),
            df: Matrix::new(0, 0, 0.0),
            e: Matrix::new(0, 0, 0.0),
            subproblem_counter: 0,
            nr_of_skips: 0,
            nr_of_matchings: 0,
            nr_of_edits: 0,
            nr_of_edit_skips: 0,
        }
    }

    pub fn jedi(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        self.subproblem_counter = 0;
        self.nr_of_skips = 0;
        self.nr_of_matchings = 0;
        self.nr_of_edits = 0;
        self.nr_of_edit_skips = 0;

        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();
        let larger = t1_size.max(t2_size);

        self.dt = Matrix::new(t1_size + 1, t2_size + 1, f64::INFINITY);
        self.df = Matrix::new(t1_size + 1, t2_size + 1, f64::INFINITY);
        self.e = Matrix::new(t1_size + 1, t2_size + 1, f64::INFINITY);
        let mut hungarian_cm = vec![vec![0.0f64; 2 * larger]; 2 * larger];
        let mut e_row_minima = vec![0.0f64; 2 * larger];
        let mut e_col_minima = vec![0.0f64; 2 * larger];

        *self.dt.at(0, 0) = 0.0;
        *self.df.at(0, 0) = 0.0;
        // Deletion initialization.
        for i in 1..=t1_size {
            let mut del = 0.0;
            for c in t1.postl_to_children[i - 1].iter() {
                del += self.dt.read_at(*c as usize + 1, 0);
            }
            *self.df.at(i, 0) = del;
            *self.dt.at(i, 0) = del + self.costs.del(t1.postl_to_label_id[i - 1]);
        }
        // Insertion initialization.
        for j in 1..=t2_size {
            let mut ins = 0.0;
            for c in t2.postl_to_children[j - 1].iter() {
                ins += self.dt.read_at(0, *c as usize + 1);
            }
            *self.df.at(0, j) = ins;
            *self.dt.at(0, j) = ins + self.costs.ins(t2.postl_to_label_id[j - 1]);
        }

        for i in 1..=t1_size {
            for j in 1..=t2_size {
                let children1 = &t1.postl_to_children[i - 1];
                let children2 = &t2.postl_to_children[j - 1];
                let type1 = t1.postl_to_type[i - 1];
                let type2 = t2.postl_to_type[j - 1];

                // Cost of deleting in the forest: F1 maps into the cheapest
                // child forest of j.
                let mut min_for_del = f64::INFINITY;
                let mut min_tree_del = f64::INFINITY;
                for c2 in children2.iter() {
                    min_for_del = min_for_del.min(
                        self.df.read_at(i, *c2 as usize + 1) - self.df.read_at(0, *c2 as usize + 1),
                    );
                    min_tree_del = min_tree_del.min(
                        self.dt.read_at(i, *c2 as usize + 1) - self.dt.read_at(0, *c2 as usize + 1),
                    );
                }
                min_for_del += self.df.read_at(0, j);
                min_tree_del += self.dt.read_at(0, j);

                // Cost of inserting in the forest, symmetric.
                let mut min_for_ins = f64::INFINITY;
                let mut min_tree_ins = f64::INFINITY;
                for c1 in children1.iter() {
                    min_for_ins = min_for_ins.min(
                        self.df.read_at(*c1 as usize + 1, j) - self.df.read_at(*c1 as usize + 1, 0),
                    );
                    min_tree_ins = min_tree_ins.min(
                        self.dt.read_at(*c1 as usize + 1, j) - self.dt.read_at(*c1 as usize + 1, 0),
                    );
                }
                min_for_ins += self.df.read_at(i, 0);
                min_tree_ins += self.dt.read_at(i, 0);

                // The minimum of insertion and deletion is an upper bound on
                // the forest mapping.
                let for_ins_del_ub = min_for_del.min(min_for_ins);
                let mut min_for_ren = for_ins_del_ub;

                if type1 == NODE_TYPE_KEY
                    && type2 == NODE_TYPE_KEY
                    && !children1.is_empty()
                    && !children2.is_empty()
                {
                    // Keys have exactly one child; map those to each other.
                    min_for_ren = self
                        .dt
                        .read_at(children1[0] as usize + 1, children2[0] as usize + 1);
                } else if type1 == NODE_TYPE_VALUE && type2 == NODE_TYPE_VALUE {
                    // Values are leaves; their subforests are empty.
                    min_for_ren = 0.0;
                } else {
                    // Unmapped-children lower bound from the sorted child
                    // subtree sizes, then the subtree size difference.
                    let mut ed_lb = 0.0;
                    if children1.len() > children2.len() {
                        ed_lb = t1.postl_to_ordered_child_size[i - 1]
                            [children1.len() - children2.len() - 1]
                            as f64;
                    } else if children1.len() < children2.len() {
                        ed_lb = t2.postl_to_ordered_child_size[j - 1]
                            [children2.len() - children1.len() - 1]
                            as f64;
                    }
                    ed_lb = ed_lb.max((t1.postl_to_size[i - 1] - t2.postl_to_size[j - 1]).abs() as f64);

                    if for_ins_del_ub > ed_lb {
                        if type1 == NODE_TYPE_ARRAY && type2 == NODE_TYPE_ARRAY {
                            // Arrays keep the sibling order: band-limited
                            // sequence edit distance over the child subtrees.
                            self.nr_of_edits += 1;
                            *self.e.at(0, 0) = 0.0;
                            for (s, c1) in children1.iter().enumerate() {
                                let prev = self.e.read_at(s, 0);
                                *self.e.at(s + 1, 0) =
                                    prev + self.dt.read_at(*c1 as usize + 1, 0);
                            }
                            for (t, c2) in children2.iter().enumerate() {
                                let prev = self.e.read_at(0, t);
                                *self.e.at(0, t + 1) =
                                    prev + self.dt.read_at(0, *c2 as usize + 1);
                            }
                            let band = for_ins_del_ub as usize;
                            for (s, c1) in children1.iter().enumerate() {
                                let s = s + 1;
                                let sed_s = if s > band { s - band } else { 1 };
                                let sed_e = (s + band).min(children2.len());
                                for t in sed_s..=sed_e {
                                    self.subproblem_counter += 1;
                                    let c2 = children2[t - 1];
                                    let ed_ins = self.e.read_at(s, t - 1)
                                        + self.dt.read_at(0, c2 as usize + 1);
                                    let ed_del = self.e.read_at(s - 1, t)
                                        + self.dt.read_at(*c1 as usize + 1, 0);
                                    let ed_ren = self.e.read_at(s - 1, t - 1)
                                        + self.dt.read_at(*c1 as usize + 1, c2 as usize + 1);
                                    *self.e.at(s, t) = ed_ins.min(ed_del).min(ed_ren);
                                }
                            }
                            min_for_ren = self.e.read_at(children1.len(), children2.len());
                        } else {
                            // Unordered children: square cost matrix with the
                            // subtree distances and del/ins slack blocks.
                            let matrix_size = children1.len() + children2.len();
                            for x in 0..matrix_size {
                                e_row_minima[x] = f64::INFINITY;
                                e_col_minima[x] = f64::INFINITY;
                            }
                            for s in 0..matrix_size {
                                for t in 0..matrix_size {
                                    hungarian_cm[s][t] = if s < children1.len() {
                                        if t < children2.len() {
                                            self.dt.read_at(
                                                children1[s] as usize + 1,
                                                children2[t] as usize + 1,
                                            )
                                        } else {
                                            t1.postl_to_size[children1[s] as usize] as f64
                                        }
                                    } else if t < children2.len() {
                                        t2.postl_to_size[children2[t] as usize] as f64
                                    } else {
                                        0.0
                                    };
                                    e_row_minima[s] = e_row_minima[s].min(hungarian_cm[s][t]);
                                    e_col_minima[t] = e_col_minima[t].min(hungarian_cm[s][t]);
                                }
                            }

                            // Row and column minima sums lower-bound the
                            // matching.
                            let mut row_lb = 0.0;
                            let mut col_lb = 0.0;
                            for x in 0..matrix_size {
                                row_lb += e_row_minima[x];
                                col_lb += e_col_minima[x];
                            }

                            if for_ins_del_ub > row_lb.max(col_lb) {
                                self.nr_of_matchings += 1;
                                min_for_ren =
                                    execute_hungarian(&mut hungarian_cm, matrix_size);
                            } else {
                                self.nr_of_skips += 1;
                            }
                        }
                    } else if type1 == NODE_TYPE_ARRAY && type2 == NODE_TYPE_ARRAY {
                        self.nr_of_edit_skips += 1;
                    } else {
                        self.nr_of_skips += 1;
                    }
                }

                *self.df.at(i, j) = min_for_del.min(min_for_ins).min(min_for_ren);

                // Nodes of different types cannot be renamed into each other.
                let min_tree_ren = if type1 != type2 {
                    self.df.read_at(i, j)
                        + self.costs.del(t1.postl_to_label_id[i - 1])
                        + self.costs.ins(t2.postl_to_label_id[j - 1])
                } else {
                    self.df.read_at(i, j)
                        + self
                            .costs
                            .ren(t1.postl_to_label_id[i - 1], t2.postl_to_label_id[j - 1])
                };
                *self.dt.at(i, j) = min_tree_del.min(min_tree_ins).min(min_tree_ren);
            }
        }

        self.dt.read_at(t1_size, t2_size)
    }

    /// QuickJEDI cannot leverage a threshold; falls through to `jedi`.
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

    fn jedi_of(s1: &str, s2: &str) -> f64 {
        let mut ld = LabelDict::new();
        let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
        let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&t1, &ld);
        let i2 = TreeIndex::index_tree(&t2, &ld);
        let mut engine = QuickJedi::new(UnitCostModel);
        engine.jedi(&i1, &i2)
    }

    #[test]
    fn test_identity() {
        assert_eq!(jedi_of(r"{\{\}{a{1}}{b{2}}}", r"{\{\}{a{1}}{b{2}}}"), 0.0);
    }

    #[test]
    fn test_key_reorder_is_free() {
        // Object children are an unordered multiset.
        assert_eq!(jedi_of(r"{\{\}{a{1}}{b{2}}}", r"{\{\}{b{2}}{a{1}}}"), 0.0);
    }

    #[test]
    fn test_array_reorder_costs() {
        // Array children keep their order.
        let d = jedi_of(r"{[]{1}{2}}", r"{[]{2}{1}}");
        assert_eq!(d, 2.0);
    }

    #[test]
    fn test_value_change() {
        assert_eq!(jedi_of(r"{\{\}{a{1}}}", r"{\{\}{a{2}}}"), 1.0);
    }

    #[test]
    fn test_key_deletion() {
        assert_eq!(jedi_of(r"{\{\}{a{1}}{b{2}}}", r"{\{\}{a{1}}}"), 2.0);
    }

    #[test]
    fn test_type_mismatch_is_del_plus_ins() {
        // An array node cannot be renamed into a value node.
        assert_eq!(jedi_of(r"{[]{1}}", r"{x{1}}"), 2.0);
    }

    #[test]
    fn test_matching_skips_are_counted() {
        let mut ld = LabelDict::new();
        let t1 = parse_single(
            r"{\{\}{a{1}}{b{2}}{c{3}}{d{4}}}".to_owned(),
            &mut ld,
        )
        .unwrap();
        let t2 = parse_single(r"{\{\}{a{1}}}".to_owned(), &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&t1, &ld);
        let i2 = TreeIndex::index_tree(&t2, &ld);
        let mut engine = QuickJedi::new(UnitCostModel);
        engine.jedi(&i1, &i2);
        assert!(engine.nr_of_skips + engine.nr_of_matchings > 0);
    }
}
