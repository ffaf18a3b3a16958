//! Tree edit distance by Zhang and Shasha. K. Zhang and D. Shasha. Simple
//! fast algorithms for the editing distance between trees and related
//! problems. SIAM J. Comput. 1989.

use crate::cost::CostModel;
use crate::indexing::TreeIndex;
use crate::matrix::Matrix;
use crate::ted::TedEngine;

pub struct ZhangShasha<C: CostModel> {
    costs: C,
    /// Subtree distances, indexed by postorder pairs.
    td: Matrix<f64>,
    /// Forest distances of the current keyroot pair, local 1-based indices.
    fd: Matrix<f64>,
    subproblem_counter: u64,
}

impl<C: CostModel> ZhangShasha<C> {
    pub fn new(costs: C) -> Self {
        Self {
            costs,
            td: Matrix::new(0, 0, 0.0),
            fd: Matrix::new(0, 0, 0.0),
            subproblem_counter: 0,
        }
    }

    /// Fills forest distances for the keyroot pair `(kr1, kr2)` and records
    /// the subtree distances discovered on the way.
    fn forest_distance(&mut self, t1: &TreeIndex, t2: &TreeIndex, kr1: i32, kr2: i32) {
        let kr1_lld = t1.postl_to_lld[kr1 as usize];
        let kr2_lld = t2.postl_to_lld[kr2 as usize];

        // Local forest indices: node with postorder p maps to p - kr_lld + 1;
        // index 0 is the empty forest.
        *self.fd.at(0, 0) = 0.0;
        for i in kr1_lld..=kr1 {
            let di = (i - kr1_lld + 1) as usize;
            *self.fd.at(di, 0) = self.fd.read_at(di - 1, 0)
                + self.costs.del(t1.postl_to_label_id[i as usize]);
        }
        for j in kr2_lld..=kr2 {
            let dj = (j - kr2_lld + 1) as usize;
            *self.fd.at(0, dj) = self.fd.read_at(0, dj - 1)
                + self.costs.ins(t2.postl_to_label_id[j as usize]);
        }

        for i in kr1_lld..=kr1 {
            let di = (i - kr1_lld + 1) as usize;
            for j in kr2_lld..=kr2 {
                let dj = (j - kr2_lld + 1) as usize;
                self.subproblem_counter += 1;

                let del =
                    self.fd.read_at(di - 1, dj) + self.costs.del(t1.postl_to_label_id[i as usize]);
                let ins =
                    self.fd.read_at(di, dj - 1) + self.costs.ins(t2.postl_to_label_id[j as usize]);

                if t1.postl_to_lld[i as usize] == kr1_lld
                    && t2.postl_to_lld[j as usize] == kr2_lld
                {
                    // Both forests are trees: the rename case closes a
                    // subtree distance.
                    let ren = self.fd.read_at(di - 1, dj - 1)
                        + self.costs.ren(
                            t1.postl_to_label_id[i as usize],
                            t2.postl_to_label_id[j as usize],
                        );
                    let dist = del.min(ins).min(ren);
                    *self.fd.at(di, dj) = dist;
                    *self.td.at(i as usize, j as usize) = dist;
                } else {
                    let fi = (t1.postl_to_lld[i as usize] - kr1_lld) as usize;
                    let fj = (t2.postl_to_lld[j as usize] - kr2_lld) as usize;
                    let tree = self.fd.read_at(fi, fj) + self.td.read_at(i as usize, j as usize);
                    *self.fd.at(di, dj) = del.min(ins).min(tree);
                }
            }
        }
    }
}

impl<C: CostModel> TedEngine for ZhangShasha<C> {
    fn ted(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();

        self.subproblem_counter = 0;
        self.td = Matrix::new(t1_size, t2_size, 0.0);
        self.fd = Matrix::new(t1_size + 1, t2_size + 1, 0.0);

        for x in 0..t1.list_kr.len() {
            for y in 0..t2.list_kr.len() {
                self.forest_distance(t1, t2, t1.list_kr[x], t2.list_kr[y]);
            }
        }

        self.td.read_at(t1_size - 1, t2_size - 1)
    }

    fn subproblem_count(&self) -> u64 {
        self.subproblem_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::UnitCostModel;
    use crate::indexing::Indexer;
    use crate::parsing::{parse_single, LabelDict};

    fn ted_of(s1: &str, s2: &str) -> f64 {
        let mut ld = LabelDict::new();
        let t1 = parse_single(s1.to_owned(), &mut ld).unwrap();
        let t2 = parse_single(s2.to_owned(), &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&t1, &ld);
        let i2 = TreeIndex::index_tree(&t2, &ld);
        let mut zs = ZhangShasha::new(UnitCostModel);
        zs.ted(&i1, &i2)
    }

    #[test]
    fn test_identical_trees() {
        assert_eq!(ted_of("{a}", "{a}"), 0.0);
        assert_eq!(ted_of("{a{b}{c{d}}}", "{a{b}{c{d}}}"), 0.0);
    }

    #[test]
    fn test_single_node_rename() {
        assert_eq!(ted_of("{a}", "{b}"), 1.0);
    }

    #[test]
    fn test_leaf_deletion() {
        assert_eq!(ted_of("{a{b}{c}}", "{a{b}}"), 1.0);
    }

    #[test]
    fn test_swapped_children() {
        assert_eq!(ted_of("{a{b}{c}}", "{a{c}{b}}"), 2.0);
    }

    #[test]
    fn test_inner_node_deletion() {
        assert_eq!(ted_of("{a{b{c}}}", "{a{c}}"), 1.0);
    }

    #[test]
    fn test_all_renames() {
        assert_eq!(ted_of("{a{b}{c}{d}}", "{e{f}{g}{h}}"), 4.0);
    }

    #[test]
    fn test_symmetry_under_unit_costs() {
        let pairs = [
            ("{a{b}{c}}", "{a{c}{b}}"),
            ("{a{b{c{d}}}}", "{a{b}}"),
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
        ];
        for (s1, s2) in pairs {
            assert_eq!(ted_of(s1, s2), ted_of(s2, s1));
        }
    }

    #[test]
    fn test_classic_zhang_shasha_example() {
        // The example from the original paper: distance 2.
        assert_eq!(ted_of("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"), 2.0);
    }

    #[test]
    fn test_counts_subproblems() {
        let mut ld = LabelDict::new();
        let t1 = parse_single("{a{b}{c}}".to_owned(), &mut ld).unwrap();
        let t2 = parse_single("{a{b}}".to_owned(), &mut ld).unwrap();
        let i1 = TreeIndex::index_tree(&t1, &ld);
        let i2 = TreeIndex::index_tree(&t2, &ld);
        let mut zs = ZhangShasha::new(UnitCostModel);
        zs.ted(&i1, &i2);
        assert!(zs.subproblem_count() > 0);
    }
}
