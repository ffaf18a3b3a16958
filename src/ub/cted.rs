//! Constrained tree edit distance. Every node maps within the subtree its
//! parent maps to, which makes the DP quadratic and the result a valid upper
//! bound on the unconstrained distance. The `ted_k` entry restricts the DP to
//! the `|i-j| <= k` band (the thresholded variant used in join
//! verification).

use crate::cost::CostModel;
use crate::indexing::TreeIndex;
use crate::matrix::Matrix;
use crate::ted::TedEngine;

pub struct ConstrainedTed<C: CostModel> {
    costs: C,
    /// Tree distances; row/column 0 hold deletion/insertion costs against the
    /// empty tree.
    dt: Matrix<f64>,
    /// Forest distances.
    df: Matrix<f64>,
    /// Sequence edit distance over the child lists of the current pair.
    e: Matrix<f64>,
    subproblem_counter: u64,
}

impl<C: CostModel> ConstrainedTed<C> {
    pub fn new(costs: C) -> Self {
        Self {
            costs,
            dt: Matrix::new(0, 0, 0.0),
            df: Matrix::new(0, 0, 0.0),
            e: Matrix::new(0, 0, 0.0),
            subproblem_counter: 0,
        }
    }

    fn compute(&mut self, t1: &TreeIndex, t2: &TreeIndex, band: Option<i32>) -> f64 {
        self.subproblem_counter = 0;

        let t1_size = t1.tree_size() as i32;
        let t2_size = t2.tree_size() as i32;

        self.dt = Matrix::new(t1_size as usize + 1, t2_size as usize + 1, f64::INFINITY);
        self.df = Matrix::new(t1_size as usize + 1, t2_size as usize + 1, f64::INFINITY);
        self.e = Matrix::new(t1_size as usize + 1, t2_size as usize + 1, f64::INFINITY);

        *self.dt.at(0, 0) = 0.0;
        *self.df.at(0, 0) = 0.0;
        // Deletion initialization: distances against the empty tree.
        for i in 1..=t1_size {
            let mut del_forest = 0.0;
            for c in t1.postl_to_children[i as usize - 1].iter() {
                del_forest += self.dt.read_at(*c as usize + 1, 0);
            }
            *self.df.at(i as usize, 0) = del_forest;
            *self.dt.at(i as usize, 0) =
                del_forest + self.costs.del(t1.postl_to_label_id[i as usize - 1]);
        }
        // Insertion initialization.
        for j in 1..=t2_size {
            let mut ins_forest = 0.0;
            for c in t2.postl_to_children[j as usize - 1].iter() {
                ins_forest += self.dt.read_at(0, *c as usize + 1);
            }
            *self.df.at(0, j as usize) = ins_forest;
            *self.dt.at(0, j as usize) =
                ins_forest + self.costs.ins(t2.postl_to_label_id[j as usize - 1]);
        }

        for i in 1..=t1_size {
            let (j_start, j_end) = match band {
                Some(k) => (1.max(i - k), t2_size.min(i + k)),
                None => (1, t2_size),
            };
            for j in j_start..=j_end {
                let children1 = &t1.postl_to_children[i as usize - 1];
                let children2 = &t2.postl_to_children[j as usize - 1];

                // Sequence edit distance over the two child lists, subtree
                // distances as substitution costs.
                *self.e.at(0, 0) = 0.0;
                for (s, c1) in children1.iter().enumerate() {
                    let prev = self.e.read_at(s, 0);
                    *self.e.at(s + 1, 0) = prev + self.dt.read_at(*c1 as usize + 1, 0);
                }
                for (t, c2) in children2.iter().enumerate() {
                    let prev = self.e.read_at(0, t);
                    *self.e.at(0, t + 1) = prev + self.dt.read_at(0, *c2 as usize + 1);
                }
                for (s, c1) in children1.iter().enumerate() {
                    for (t, c2) in children2.iter().enumerate() {
                        self.subproblem_counter += 1;
                        let ins = self.e.read_at(s + 1, t) + self.dt.read_at(0, *c2 as usize + 1);
                        let del = self.e.read_at(s, t + 1) + self.dt.read_at(*c1 as usize + 1, 0);
                        let ren = self.e.read_at(s, t)
                            + self.dt.read_at(*c1 as usize + 1, *c2 as usize + 1);
                        *self.e.at(s + 1, t + 1) = ins.min(del).min(ren);
                    }
                }

                // Cost of deleting node i: the forest of j maps entirely into
                // one child subtree of i; cheapest child wins.
                let mut min_for_del = f64::INFINITY;
                let mut min_tree_del = f64::INFINITY;
                for c2 in children2.iter() {
                    min_for_del = min_for_del.min(
                        self.df.read_at(i as usize, *c2 as usize + 1)
                            - self.df.read_at(0, *c2 as usize + 1),
                    );
                    min_tree_del = min_tree_del.min(
                        self.dt.read_at(i as usize, *c2 as usize + 1)
                            - self.dt.read_at(0, *c2 as usize + 1),
                    );
                }
                min_for_del += self.df.read_at(0, j as usize);
                min_tree_del += self.dt.read_at(0, j as usize);

                // Cost of inserting node j, symmetric.
                let mut min_for_ins = f64::INFINITY;
                let mut min_tree_ins = f64::INFINITY;
                for c1 in children1.iter() {
                    min_for_ins = min_for_ins.min(
                        self.df.read_at(*c1 as usize + 1, j as usize)
                            - self.df.read_at(*c1 as usize + 1, 0),
                    );
                    min_tree_ins = min_tree_ins.min(
                        self.dt.read_at(*c1 as usize + 1, j as usize)
                            - self.dt.read_at(*c1 as usize + 1, 0),
                    );
                }
                min_for_ins += self.df.read_at(i as usize, 0);
                min_tree_ins += self.dt.read_at(i as usize, 0);

                let for_ren = self.e.read_at(children1.len(), children2.len());
                *self.df.at(i as usize, j as usize) = min_for_del.min(min_for_ins).min(for_ren);

                let tree_ren = self.df.read_at(i as usize, j as usize)
                    + self.costs.ren(
                        t1.postl_to_label_id[i as usize - 1],
                        t2.postl_to_label_id[j as usize - 1],
                    );
                *self.dt.at(i as usize, j as usize) =
                    min_tree_del.min(min_tree_ins).min(tree_ren);
            }
        }

        self.dt.read_at(t1_size as usize, t2_size as usize)
    }
}

impl<C: CostModel> TedEngine for ConstrainedTed<C> {
    fn ted(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        self.compute(t1, t2, None)
    }

    fn ted_k(&mut self, t1: &TreeIndex, t2: &TreeIndex, k: usize) -> f64 {
        if t1.tree_size().abs_diff(t2.tree_size()) > k {
            return f64::INFINITY;
        }
        let dist = self.compute(t1, t2, Some(k as i32));
        if dist > k as f64 {
            f64::INFINITY
        } else {
            dist
        }
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
    use crate::ted::zhang_shasha::ZhangShasha;

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
        let (i1, i2) = indexes("{a{b{c}{d}}{e}}", "{a{b{c}{d}}{e}}");
        let mut cted = ConstrainedTed::new(UnitCostModel);
        assert_eq!(cted.ted(&i1, &i2), 0.0);
    }

    #[test]
    fn test_simple_distances() {
        let cases = [
            ("{a}", "{b}", 1.0),
            ("{a{b}{c}}", "{a{b}}", 1.0),
            ("{a{b}{c}}", "{a{c}{b}}", 2.0),
            ("{a{b}{c}{d}}", "{e{f}{g}{h}}", 4.0),
        ];
        let mut cted = ConstrainedTed::new(UnitCostModel);
        for (s1, s2, expected) in cases {
            let (i1, i2) = indexes(s1, s2);
            assert_eq!(cted.ted(&i1, &i2), expected, "{s1} vs {s2}");
        }
    }

    #[test]
    fn test_upper_bounds_unconstrained_ted() {
        let pairs = [
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
            ("{a{b{c{d}}}}", "{a{b}}"),
            ("{a{b{d}{e{g}}}{c{f}}}", "{a{b{d}{e}}{c{f{g}}}}"),
        ];
        for (s1, s2) in pairs {
            let (i1, i2) = indexes(s1, s2);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let mut cted = ConstrainedTed::new(UnitCostModel);
            let exact = zs.ted(&i1, &i2);
            let bound = cted.ted(&i1, &i2);
            assert!(bound >= exact, "{s1} vs {s2}: {bound} < {exact}");
            assert!(bound <= (i1.tree_size() + i2.tree_size()) as f64);
        }
    }

    #[test]
    fn test_banded_variant_threshold_semantics() {
        let (i1, i2) = indexes("{a{b}{c}{d}}", "{e{f}{g}{h}}");
        let mut cted = ConstrainedTed::new(UnitCostModel);
        assert!(cted.ted_k(&i1, &i2, 2).is_infinite());
        assert_eq!(cted.ted_k(&i1, &i2, 4), 4.0);
    }

    #[test]
    fn test_deep_chain_band() {
        let (i1, i2) = indexes("{a{b{c{d{e}}}}}", "{a{b{c{e}}}}");
        let mut cted = ConstrainedTed::new(UnitCostModel);
        let full = cted.ted(&i1, &i2);
        let banded = cted.ted_k(&i1, &i2, 3);
        assert_eq!(full, banded);
    }
}
