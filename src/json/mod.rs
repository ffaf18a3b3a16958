//! JSON edit distance engines.
//!
//! JSON documents are represented in bracket notation with the object label
//! `\{\}` (braces escaped) and the array label `[]`; keys are inner nodes
//! with exactly one child, literals are leaves. [`crate::indexing::TreeIndex`]
//! tags every node with one of these four types. Children of object nodes
//! form an unordered multiset (keys may reorder without cost), children of
//! array nodes stay ordered, and nodes of different types never map to each
//! other.

pub mod hungarian;
pub mod quickjedi;
pub mod wang;
