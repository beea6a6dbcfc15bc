//! Error types for forest decomposition
//!
//! Structural problems with the input trees abort the whole decomposition. Degenerate leaf
//! regions are not errors, see [`crate::forest::DegenerateBound`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed tree {tree} at node {node}: {reason}")]
    MalformedTree {
        tree: usize,
        node: usize,
        reason: String,
    },

    #[error("dimension mismatch: expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("merge did not converge after {rounds} rounds ({region_sets} region sets)")]
    NonConvergence { rounds: usize, region_sets: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed(tree: usize, node: usize, reason: impl Into<String>) -> Self {
        return Error::MalformedTree {
            tree,
            node,
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {

        let err = Error::malformed(3, 7, "dangling child index 12");
        let s = format!("{}", err);
        assert!(s.contains("tree 3"));
        assert!(s.contains("node 7"));
        assert!(s.contains("dangling"));

        let err = Error::NonConvergence { rounds: 4, region_sets: 100 };
        assert!(format!("{}", err).contains("4 rounds"));

        let err = Error::DimensionMismatch { expected: 16, found: 8 };
        assert!(format!("{}", err).contains("expected 16"));
    }
}
