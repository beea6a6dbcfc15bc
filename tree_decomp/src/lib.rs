//! Decomposition of a random forest classifier into the regions of embedding space where its
//! trees agree on the positive class.
//!
//! Each tree's positive leaves are turned into axis-aligned hyper-rectangles ("bounds"). Bounds
//! from different trees are then intersected repeatedly until no new overlap can be found. The
//! resulting regions are turned into range queries against the kd tree of compound embeddings,
//! so the compounds the forest scores highly can be pulled without scoring the whole library.
//!
//! Pipeline:
//! - [`path`]: root-to-leaf decision paths of one tree
//! - [`bound`]: a path's leaf region, and pairwise bound intersection
//! - [`forest`]: positive leaf bounds of every tree in a forest
//! - [`merge`]: cross-tree intersection to a fixed point
//! - [`range_query`]: regions as range queries for the index
//!
//! TODO
//! - [x] path extraction and bound building with tests
//! - [x] pruned merge, checked against the exhaustive merge
//! - [ ] read sklearn pickles directly instead of the json export
//!
pub mod error;
pub mod config;
pub mod path;
pub mod bound;
pub mod forest;
pub mod merge;
pub mod range_query;

pub use error::{Error, Result};
