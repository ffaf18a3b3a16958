//! Lower bounds on the tree edit distance, used as join filters.

pub mod label_intersection;
pub mod sed;
