//! Bounded tree edit distance by Helene Touzet. H. Touzet. Comparing similar
//! ordered trees in linear-time. Journal of Discrete Algorithms. 2007.
//!
//! All variants return the exact distance if it is at most `k` and infinity
//! otherwise. The keyroot variants skip node pairs whose computation is
//! subsumed by a higher pair on the same left spines.

use crate::cost::CostModel;
use crate::indexing::TreeIndex;
use crate::matrix::{BandMatrix, Matrix};
use crate::ted::TedEngine;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouzetVariant {
    #[default]
    Baseline,
    /// Skip forest rows whose nodes are too deep to be mapped within the
    /// error budget, walking the depth inverted list.
    DepthPruning,
    /// Iterate keyroot pairs only, descending left spines to the top-most
    /// relevant pair.
    KrLoop,
    /// Like `KrLoop`, but the top-most relevant pairs are precomputed from
    /// the keyroot-ancestor index in one sweep over the k-strip.
    KrSet,
}

pub struct Touzet<C: CostModel> {
    costs: C,
    variant: TouzetVariant,
    /// Subtree distances; infinity marks irrelevant or uncomputed pairs.
    td: Matrix<f64>,
    /// Forest distances of the current subtree pair, e-strip only.
    fd: BandMatrix<f64>,
    subproblem_counter: u64,
}

impl<C: CostModel> Touzet<C> {
    pub fn new(costs: C) -> Self {
        Self::with_variant(costs, TouzetVariant::Baseline)
    }

    pub fn with_variant(costs: C, variant: TouzetVariant) -> Self {
        Self {
            costs,
            variant,
            td: Matrix::new(0, 0, 0.0),
            fd: BandMatrix::new(0, 0, 0.0),
            subproblem_counter: 0,
        }
    }

    /// Remaining error budget for the subtree pair `(x, y)` after accounting
    /// for the nodes around the subtrees:
    /// `e(x,y) = k - |(|T1|-(x+1))-(|T2|-(y+1))| - |((x+1)-|T1_x|)-((y+1)-|T2_y|)|`.
    fn e_budget(t1: &TreeIndex, t2: &TreeIndex, x: i32, y: i32, k: i32) -> i32 {
        let t1_size = t1.tree_size() as i32;
        let t2_size = t2.tree_size() as i32;
        let x_size = t1.postl_to_size[x as usize];
        let y_size = t2.postl_to_size[y as usize];
        let lower_bound = ((t1_size - (x + 1)) - (t2_size - (y + 1))).abs()
            + (((x + 1) - x_size) - ((y + 1) - y_size)).abs();
        k - lower_bound
    }

    /// The pair `(x, y)` is k-relevant if the nodes around the subtrees plus
    /// the subtree size difference do not already exceed `k`.
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

    /// Distance of the subtree pair `(x, y)` within the error budget `e`,
    /// filling only the e-strip of the forest matrix. Subtree distances of
    /// left-spine prefixes are recorded in `td` on the way.
    fn tree_dist(&mut self, t1: &TreeIndex, t2: &TreeIndex, x: i32, y: i32, k: i32, e: i32) -> f64 {
        if e < 0 {
            return f64::INFINITY;
        }
        let x_size = t1.postl_to_size[x as usize];
        let y_size = t2.postl_to_size[y as usize];
        // A subtree size difference above the budget already decides the
        // outcome and would push the final reads outside the strip.
        if (x_size - y_size).abs() > e {
            return f64::INFINITY;
        }

        // Offsets translating local forest indices to postorder ids.
        let x_off = x - x_size;
        let y_off = y - y_size;

        let depth_pruning = self.variant == TouzetVariant::DepthPruning;

        // Initial cases: first row and column, e-strip only.
        *self.fd.at(0, 0) = 0.0;
        for j in 1..=y_size.min(e) {
            *self.fd.at(0, j as usize) = self.fd.read_at(0, j as usize - 1)
                + self.costs.ins(t2.postl_to_label_id[(j + y_off) as usize]);
        }
        if e + 1 <= y_size {
            *self.fd.at(0, (e + 1) as usize) = f64::INFINITY;
        }
        for i in 1..=x_size.min(e) {
            *self.fd.at(i as usize, 0) = self.fd.read_at(i as usize - 1, 0)
                + self.costs.del(t1.postl_to_label_id[(i + x_off) as usize]);
        }
        if e + 1 <= x_size {
            *self.fd.at((e + 1) as usize, 0) = f64::INFINITY;
        }

        // With depth pruning, rows for nodes deeper than max_depth cannot be
        // touched by a mapping within budget and are skipped; max_depth_it
        // walks the depth inverted list to find the next shallow-enough row.
        let max_depth = if depth_pruning {
            (t1.postl_to_depth[x as usize] + e + 1)
                .min(t1.postl_to_subtree_max_depth[x as usize])
        } else {
            i32::MAX
        };
        let dil: &[i32] = if depth_pruning {
            &t1.inverted_list_depth_to_postl[max_depth as usize]
        } else {
            &[]
        };
        let mut max_depth_it = 0usize;
        let mut i = 1i32;
        if depth_pruning {
            while dil[max_depth_it] < 1 + x_off {
                max_depth_it += 1;
            }
            if t1.postl_to_depth[(i + x_off) as usize] > max_depth {
                i = dil[max_depth_it] - x_off;
                max_depth_it += 1;
            } else if t1.postl_to_depth[(i + x_off) as usize] == max_depth {
                max_depth_it += 1;
            }
        }

        while i <= x_size {
            if i - e - 1 >= 1 {
                *self.fd.at(i as usize, (i - e - 1) as usize) = f64::INFINITY;
            }
            let j_last = (i + e).min(y_size);
            for j in 1.max(i - e)..=j_last {
                // The root pair is closed separately below.
                if i == x_size && j == j_last {
                    break;
                }
                self.subproblem_counter += 1;
                if ((i + x_off) - (j + y_off)).abs() > k {
                    *self.fd.at(i as usize, j as usize) = f64::INFINITY;
                    continue;
                }

                let i_size = t1.postl_to_size[(i + x_off) as usize];
                let j_size = t2.postl_to_size[(j + y_off) as usize];

                let mut candidate = self.fd.read_at(i as usize, j as usize - 1)
                    + self.costs.ins(t2.postl_to_label_id[(j + y_off) as usize]);

                // With depth pruning the row above may have been skipped.
                if i == 1
                    || !depth_pruning
                    || t1.postl_to_depth[(i - 1 + x_off) as usize]
                        - t1.postl_to_depth[x as usize]
                        <= e + 1
                {
                    candidate = candidate.min(
                        self.fd.read_at(i as usize - 1, j as usize)
                            + self.costs.del(t1.postl_to_label_id[(i + x_off) as usize]),
                    );
                }

                let fi = i - i_size;
                let fj = j - j_size;
                if fi == 0 && fj == 0 {
                    // Both prefixes are complete subtrees; closing them with
                    // a root rename is the forest-free option, and the cell
                    // value is exactly their subtree distance.
                    candidate = candidate.min(
                        self.fd.read_at(i as usize - 1, j as usize - 1)
                            + self.costs.ren(
                                t1.postl_to_label_id[(i + x_off) as usize],
                                t2.postl_to_label_id[(j + y_off) as usize],
                            ),
                    );
                    candidate = candidate
                        .min(self.td.read_at((i + x_off) as usize, (j + y_off) as usize));
                } else {
                    // Out-of-strip forest reads exceed the budget.
                    let fd_read = if fj < 0.max(fi - e - 1) || (fi + e + 1).min(y_size) < fj {
                        f64::INFINITY
                    } else {
                        self.fd.read_at(fi as usize, fj as usize)
                    };
                    candidate = candidate.min(
                        fd_read + self.td.read_at((i + x_off) as usize, (j + y_off) as usize),
                    );
                }

                let value = if candidate > e as f64 {
                    f64::INFINITY
                } else {
                    candidate
                };
                *self.fd.at(i as usize, j as usize) = value;
                if fi == 0 && fj == 0 {
                    let cell = self.td.at((i + x_off) as usize, (j + y_off) as usize);
                    *cell = cell.min(value);
                }
            }
            if i + e + 1 <= y_size {
                *self.fd.at(i as usize, (i + e + 1) as usize) = f64::INFINITY;
            }

            i += 1;
            if depth_pruning && i <= x_size {
                if t1.postl_to_depth[(i + x_off) as usize] > max_depth {
                    i = dil[max_depth_it] - x_off;
                    max_depth_it += 1;
                } else if t1.postl_to_depth[(i + x_off) as usize] == max_depth {
                    max_depth_it += 1;
                }
            }
        }

        self.subproblem_counter += 1;
        let candidate_result = (self
            .fd
            .read_at(x_size as usize - 1, y_size as usize)
            + self.costs.del(t1.postl_to_label_id[x as usize]))
        .min(
            self.fd.read_at(x_size as usize, y_size as usize - 1)
                + self.costs.ins(t2.postl_to_label_id[y as usize]),
        )
        .min(
            self.fd.read_at(x_size as usize - 1, y_size as usize - 1)
                + self.costs.ren(
                    t1.postl_to_label_id[x as usize],
                    t2.postl_to_label_id[y as usize],
                ),
        );

        if candidate_result > e as f64 {
            f64::INFINITY
        } else {
            candidate_result
        }
    }

    fn ted_k_baseline(&mut self, t1: &TreeIndex, t2: &TreeIndex, k: i32) -> f64 {
        let t1_size = t1.tree_size() as i32;
        let t2_size = t2.tree_size() as i32;

        for x in 0..t1_size {
            for y in 0.max(x - k)..=(x + k).min(t2_size - 1) {
                if !Self::k_relevant(t1, t2, x, y, k) {
                    *self.td.at(x as usize, y as usize) = f64::INFINITY;
                } else {
                    let e = Self::e_budget(t1, t2, x, y, k);
                    let dist = self.tree_dist(t1, t2, x, y, k, e);
                    *self.td.at(x as usize, y as usize) = dist;
                }
            }
        }

        self.td
            .read_at(t1_size as usize - 1, t2_size as usize - 1)
    }

    fn ted_k_kr_loop(&mut self, t1: &TreeIndex, t2: &TreeIndex, k: i32) -> f64 {
        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();

        for x in t1.list_kr.iter() {
            for y in t2.list_kr.iter() {
                let mut top_x = -1i32;
                let mut top_y = -1i32;
                // Search for the top-most relevant pair along both spines.
                let mut x_l = *x;
                while x_l >= 0 {
                    let mut y_l = *y;
                    while y_l > top_y {
                        if Self::k_relevant(t1, t2, x_l, y_l, k) {
                            if top_x == -1 {
                                top_x = x_l;
                            }
                            top_y = y_l;
                            break;
                        }
                        y_l = t2.postl_to_lch[y_l as usize];
                    }
                    x_l = t1.postl_to_lch[x_l as usize];
                }
                if top_x > -1 && top_y > -1 {
                    let e_max = Self::e_budget(t1, t2, top_x, top_y, k);
                    let dist = self.tree_dist(t1, t2, top_x, top_y, k, e_max);
                    let cell = self.td.at(top_x as usize, top_y as usize);
                    *cell = cell.min(dist);
                }
            }
        }
        self.td.read_at(t1_size - 1, t2_size - 1)
    }

    fn ted_k_kr_set(&mut self, t1: &TreeIndex, t2: &TreeIndex, k: i32) -> f64 {
        let t1_size = t1.tree_size() as i32;
        let t2_size = t2.tree_size() as i32;

        // One sweep over the k-strip collects, per keyroot pair, the
        // top-most k-relevant pair on its spines.
        let mut top_pairs: FxHashMap<(i32, i32), (i32, i32)> = FxHashMap::default();
        for x in 0..t1_size {
            for y in 0.max(x - k)..=(x + k).min(t2_size - 1) {
                if Self::k_relevant(t1, t2, x, y, k) {
                    let key = (
                        t1.postl_to_kr_ancestor[x as usize],
                        t2.postl_to_kr_ancestor[y as usize],
                    );
                    top_pairs
                        .entry(key)
                        .and_modify(|(tx, ty)| {
                            *tx = (*tx).max(x);
                            *ty = (*ty).max(y);
                        })
                        .or_insert((x, y));
                }
            }
        }

        // Keyroot pairs ascend in both trees, so inner subtree distances are
        // ready when an outer pair needs them.
        for x in t1.list_kr.iter() {
            for y in t2.list_kr.iter() {
                let Some((top_x, top_y)) = top_pairs.get(&(*x, *y)).copied() else {
                    continue;
                };
                let e_max = Self::e_budget(t1, t2, top_x, top_y, k);
                let dist = self.tree_dist(t1, t2, top_x, top_y, k, e_max);
                let cell = self.td.at(top_x as usize, top_y as usize);
                *cell = cell.min(dist);
            }
        }
        self.td
            .read_at(t1_size as usize - 1, t2_size as usize - 1)
    }
}

impl<C: CostModel> TedEngine for Touzet<C> {
    /// Exact distance found by doubling the threshold until it is reached.
    fn ted(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64 {
        let mut k = 1usize.max(t1.tree_size().abs_diff(t2.tree_size()));
        loop {
            let dist = self.ted_k(t1, t2, k);
            if dist.is_finite() {
                return dist;
            }
            k *= 2;
        }
    }

    fn ted_k(&mut self, t1: &TreeIndex, t2: &TreeIndex, k: usize) -> f64 {
        let t1_size = t1.tree_size();
        let t2_size = t2.tree_size();
        let k = k as i32;

        self.subproblem_counter = 0;

        if (t1_size as i32 - t2_size as i32).abs() > k {
            return f64::INFINITY;
        }

        self.td = Matrix::new(t1_size, t2_size, f64::INFINITY);
        self.fd = BandMatrix::new(t1_size + 1, (k + 2) as usize, f64::INFINITY);

        match self.variant {
            TouzetVariant::Baseline | TouzetVariant::DepthPruning => {
                self.ted_k_baseline(t1, t2, k)
            }
            TouzetVariant::KrLoop => self.ted_k_kr_loop(t1, t2, k),
            TouzetVariant::KrSet => self.ted_k_kr_set(t1, t2, k),
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

    fn touzet_k(s1: &str, s2: &str, k: usize, variant: TouzetVariant) -> f64 {
        let (i1, i2) = indexes(s1, s2);
        let mut engine = Touzet::with_variant(UnitCostModel, variant);
        engine.ted_k(&i1, &i2, k)
    }

    const ALL_VARIANTS: [TouzetVariant; 4] = [
        TouzetVariant::Baseline,
        TouzetVariant::DepthPruning,
        TouzetVariant::KrLoop,
        TouzetVariant::KrSet,
    ];

    #[test]
    fn test_size_difference_exceeds_threshold() {
        for v in ALL_VARIANTS {
            assert!(touzet_k("{a{b{c{d}}}}", "{a}", 2, v).is_infinite());
        }
    }

    #[test]
    fn test_threshold_cutoff_and_exact_value() {
        for v in ALL_VARIANTS {
            assert!(touzet_k("{a{b{c{d}}}}", "{a{b}}", 1, v).is_infinite());
            assert_eq!(touzet_k("{a{b{c{d}}}}", "{a{b}}", 3, v), 2.0);
        }
    }

    #[test]
    fn test_zero_threshold_degeneracy() {
        for v in ALL_VARIANTS {
            assert_eq!(touzet_k("{a{b}{c}}", "{a{b}{c}}", 0, v), 0.0);
            assert!(touzet_k("{a{b}{c}}", "{a{b}{d}}", 0, v).is_infinite());
        }
    }

    #[test]
    fn test_agrees_with_zhang_shasha_when_within_threshold() {
        let pairs = [
            ("{a{b}{c}}", "{a{c}{b}}"),
            ("{a{b{c}}}", "{a{c}}"),
            ("{a{b}{c}{d}}", "{e{f}{g}{h}}"),
            ("{f{d{a}{c{b}}}{e}}", "{f{c{d{a}{b}}}{e}}"),
            ("{a{b{d}{e{g}}}{c{f}}}", "{a{b{d}{e}}{c{f{g}}}}"),
        ];
        for (s1, s2) in pairs {
            let (i1, i2) = indexes(s1, s2);
            let mut zs = ZhangShasha::new(UnitCostModel);
            let expected = zs.ted(&i1, &i2);
            for v in ALL_VARIANTS {
                let mut engine = Touzet::with_variant(UnitCostModel, v);
                assert_eq!(
                    engine.ted_k(&i1, &i2, 8),
                    expected,
                    "variant {v:?} disagrees on {s1} vs {s2}"
                );
            }
        }
    }

    #[test]
    fn test_unbounded_ted_by_doubling() {
        let (i1, i2) = indexes("{a{b}{c}{d}}", "{e{f}{g}{h}}");
        for v in ALL_VARIANTS {
            let mut engine = Touzet::with_variant(UnitCostModel, v);
            assert_eq!(engine.ted(&i1, &i2), 4.0);
        }
    }

    #[test]
    fn test_depth_pruning_counts_fewer_subproblems() {
        let (i1, i2) = indexes(
            "{a{b{c{d{e{f}}}}}{g}{h}{i}}",
            "{a{b{c{d{e{x}}}}}{g}{h}{i}}",
        );
        let mut baseline = Touzet::with_variant(UnitCostModel, TouzetVariant::Baseline);
        let mut pruning = Touzet::with_variant(UnitCostModel, TouzetVariant::DepthPruning);
        let d1 = baseline.ted_k(&i1, &i2, 2);
        let d2 = pruning.ted_k(&i1, &i2, 2);
        assert_eq!(d1, d2);
        assert!(pruning.subproblem_count() <= baseline.subproblem_count());
    }

    #[test]
    fn test_identity_at_any_threshold() {
        for v in ALL_VARIANTS {
            for k in [0usize, 1, 3] {
                assert_eq!(touzet_k("{a{b{c}{d}}{e}}", "{a{b{c}{d}}{e}}", k, v), 0.0);
            }
        }
    }
}
