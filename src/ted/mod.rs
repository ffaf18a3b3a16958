//! Exact tree edit distance engines.

pub mod apted;
pub mod touzet;
pub mod zhang_shasha;

use crate::indexing::TreeIndex;

/// Common contract of the distance engines. `ted_k` falls through to `ted`
/// for engines without threshold support; thresholded engines return
/// `f64::INFINITY` when the distance exceeds `k`.
pub trait TedEngine {
    fn ted(&mut self, t1: &TreeIndex, t2: &TreeIndex) -> f64;

    fn ted_k(&mut self, t1: &TreeIndex, t2: &TreeIndex, _k: usize) -> f64 {
        self.ted(t1, t2)
    }

    /// Number of non-trivial forest-distance cells filled during the last
    /// run, for experiments.
    fn subproblem_count(&self) -> u64;
}
