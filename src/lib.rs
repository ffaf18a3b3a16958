//! Tree similarity under edit distance: indexing, exact TED engines
//! (Zhang-Shasha, APTED, bounded Touzet), JSON edit distance (JEDI), upper
//! and lower bounds, and similarity joins over collections of trees in
//! bracket notation.

pub mod cost;
pub mod generator;
pub mod indexing;
pub mod join;
pub mod json;
pub mod lb;
pub mod matrix;
pub mod parsing;
pub mod ted;
pub mod ub;

pub use cost::{CostModel, UnitCostModel, WeightedCostModel};
pub use indexing::{AptedIndex, Indexer, SEDIndex, TreeIndex};
pub use parsing::{LabelDict, LabelId, ParsedTree};
pub use ted::TedEngine;
