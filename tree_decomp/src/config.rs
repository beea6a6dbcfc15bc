//! Settings for a forest decomposition, stored as yaml next to the outputs
use crate::error::{Error, Result};
use serde::{Serialize, Deserialize};

use std::fs::File;
use std::io::prelude::*;

/// Range used for dimensions a path never splits on. The embedding space is roughly [-1, 1].
pub const DEFAULT_SENTINEL: f64 = 1000.0;

pub const DEFAULT_POSITIVE_CLASS: usize = 1;

/// Which leaves count as positive regions
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PositiveRule {
    /// Leaf's argmax class equals `positive_class`
    Class,
    /// Leaf's positive class fraction is at least `cutoff`
    Probability { cutoff: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DecompConfig {
    pub sentinel: f64,
    pub positive_class: usize,
    pub positive_rule: PositiveRule,
    pub tree_weights: Option<Vec<f64>>,
    pub max_rounds: Option<usize>,
    pub max_region_sets: Option<usize>,
    pub collapse_duplicates: bool,
    pub output_directory: String,
}

impl DecompConfig {

    pub fn default() -> Self {
        return Self {
            sentinel: DEFAULT_SENTINEL,
            positive_class: DEFAULT_POSITIVE_CLASS,
            positive_rule: PositiveRule::Class,
            tree_weights: None,
            max_rounds: Some(256),
            max_region_sets: Some(1_000_000),
            collapse_duplicates: true,
            output_directory: "/tmp/tree_decomp".to_string(),
        }
    }

    pub fn from_file(filename: &str) -> Result<Self> {

        let serialized = std::fs::read_to_string(filename)?;

        let deserialized: Self = serde_yaml::from_str(&serialized)?;
        deserialized.validate()?;

        return Ok(deserialized);
    }

    pub fn to_file(&self, filename: &str) -> Result<()> {

        let serialized = serde_yaml::to_string(&self)?;
        let mut file = File::create(filename)?;

        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {

        if !self.sentinel.is_finite() || self.sentinel <= 0.0 {
            return Err(Error::InvalidConfig(format!("sentinel must be finite and positive, got {}", self.sentinel)));
        }

        if let PositiveRule::Probability { cutoff } = self.positive_rule {
            if !(0.0..=1.0).contains(&cutoff) {
                return Err(Error::InvalidConfig(format!("probability cutoff must be in [0, 1], got {}", cutoff)));
            }
        }

        if let Some(weights) = &self.tree_weights {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(Error::InvalidConfig("tree weights must be finite and non-negative".to_string()));
            }
        }

        if self.max_rounds == Some(0) {
            return Err(Error::InvalidConfig("max_rounds must be at least 1".to_string()));
        }

        if self.max_region_sets == Some(0) {
            return Err(Error::InvalidConfig("max_region_sets must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Weight of the base region set for tree `tree_index`
    ///
    /// The weight count is checked against the forest by `Forest::check_config`.
    pub fn tree_weight(&self, tree_index: usize) -> f64 {

        return match &self.tree_weights {
            None => 1.0,
            Some(weights) => *weights.get(tree_index).unwrap_or(&1.0),
        };
    }

    pub fn get_bounds_filename(&self) -> String {

        return self.output_directory.clone() + "/bounds.txt";
    }

    pub fn get_base_bounds_filename(&self) -> String {

        return self.output_directory.clone() + "/base_bounds.txt";
    }

    pub fn get_query_set_filename(&self) -> String {

        return self.output_directory.clone() + "/query_set.json";
    }

    pub fn get_summary_filename(&self) -> String {

        return self.output_directory.clone() + "/summary.yaml";
    }

    pub fn get_config_filename(&self) -> String {

        return self.output_directory.clone() + "/config.yaml";
    }
}
