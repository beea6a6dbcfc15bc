//! Trained forests as read from disk, and their positive leaf regions
//!
//! Trees use the sklearn array layout: `children_left[node]` / `children_right[node]` hold child
//! node indices or -1 at a leaf, `feature` and `threshold` describe the split at internal nodes
//! and `value[node]` holds per-class sample counts.

use crate::bound::Bound;
use crate::config::{DecompConfig, PositiveRule};
use crate::error::{Error, Result};
use crate::merge::RegionSet;
use crate::path::{extract_paths, Leaf};
use log::{debug, warn};
use rand::Rng;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use std::fs::File;
use std::io::prelude::*;

pub const LEAF_SENTINEL: i64 = -1;
pub const LEAF_FEATURE: i64 = -2;
pub const LEAF_THRESHOLD: f64 = -2.0;

pub const DEFAULT_SEC_PER_QUERY: f64 = 30.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub threshold: Vec<f64>,
    pub feature: Vec<i64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Forest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

/// A positive leaf whose region came out empty. Skipped, not fatal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DegenerateBound {
    pub tree: usize,
    pub leaf_node: usize,
}

impl DecisionTree {

    pub fn num_nodes(&self) -> usize {
        return self.children_left.len();
    }

    pub fn num_leaves(&self) -> usize {
        return (0..self.num_nodes()).filter(|i| self.is_leaf(*i)).count();
    }

    /// False for node ids outside the tree
    pub fn is_leaf(&self, node_id: usize) -> bool {
        return self.children_left.get(node_id) == Some(&LEAF_SENTINEL);
    }

    pub fn num_classes(&self) -> usize {
        return self.value.first().map_or(0, |counts| counts.len());
    }

    pub fn from_file(filename: &str) -> Result<Self> {

        let file = File::open(filename)?;
        let tree: Self = serde_json::from_reader(std::io::BufReader::new(file))?;

        return Ok(tree);
    }

    /// Parallel arrays all have one entry per node
    pub fn check_shape(&self, tree_index: usize) -> Result<()> {

        let n = self.num_nodes();
        if n == 0 {
            return Err(Error::malformed(tree_index, 0, "tree has no nodes"));
        }

        let lengths = [
            ("children_right", self.children_right.len()),
            ("threshold", self.threshold.len()),
            ("feature", self.feature.len()),
            ("value", self.value.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(Error::malformed(tree_index, 0, format!("{} has {} entries, expected {}", name, len, n)));
            }
        }

        Ok(())
    }

    /// Checks the whole tree before any paths are built
    pub fn validate(&self, tree_index: usize, num_features: usize) -> Result<()> {

        self.check_shape(tree_index)?;

        let n = self.num_nodes();
        let num_classes = self.num_classes();
        if num_classes < 2 {
            return Err(Error::malformed(tree_index, 0, format!("need at least 2 classes, value has {}", num_classes)));
        }

        let mut num_parents = vec![0usize; n];

        for node_id in 0..n {

            let left = self.children_left[node_id];
            let right = self.children_right[node_id];

            let counts = &self.value[node_id];
            if counts.len() != num_classes {
                return Err(Error::malformed(tree_index, node_id, format!("value has {} classes, expected {}", counts.len(), num_classes)));
            }
            if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                return Err(Error::malformed(tree_index, node_id, "class counts must be finite and non-negative"));
            }

            match (left == LEAF_SENTINEL, right == LEAF_SENTINEL) {
                (true, true) => {
                    if counts.iter().sum::<f64>() <= 0.0 {
                        return Err(Error::malformed(tree_index, node_id, "leaf has no samples"));
                    }
                    continue;
                },
                (false, false) => {},
                _ => return Err(Error::malformed(tree_index, node_id, "node has exactly one child")),
            }

            for child in [left, right] {
                if child < 0 || child as usize >= n {
                    return Err(Error::malformed(tree_index, node_id, format!("dangling child index {}", child)));
                }
                num_parents[child as usize] += 1;
            }

            let feature = self.feature[node_id];
            if feature < 0 || feature as usize >= num_features {
                return Err(Error::malformed(tree_index, node_id, format!("feature index {} outside 0..{}", feature, num_features)));
            }

            if !self.threshold[node_id].is_finite() {
                return Err(Error::malformed(tree_index, node_id, "non-finite threshold"));
            }
        }

        if num_parents[0] != 0 {
            return Err(Error::malformed(tree_index, 0, "root is the child of another node"));
        }
        for (node_id, parents) in num_parents.iter().enumerate() {
            if *parents > 1 {
                return Err(Error::malformed(tree_index, node_id, format!("node has {} parents", parents)));
            }
        }

        Ok(())
    }

    /// Checks the tree against the settings it is decomposed with
    ///
    /// Split thresholds must lie strictly inside the sentinel range, or a reachable leaf would
    /// come out with an empty region.
    pub fn check_config(&self, tree_index: usize, config: &DecompConfig) -> Result<()> {

        if config.positive_class >= self.num_classes() {
            return Err(Error::InvalidConfig(format!("positive class {} but tree {} has {} classes",
                config.positive_class, tree_index, self.num_classes())));
        }

        for (node_id, threshold) in self.threshold.iter().enumerate() {
            if !self.is_leaf(node_id) && threshold.abs() >= config.sentinel {
                return Err(Error::malformed(tree_index, node_id,
                    format!("threshold {} outside the sentinel range +-{}", threshold, config.sentinel)));
            }
        }

        Ok(())
    }

    /// Random tree over `num_features` features in [-1, 1], nodes numbered depth first
    pub fn random<R: Rng>(rng: &mut R, max_depth: usize, num_features: usize) -> Self {

        let mut tree = Self {
            children_left: Vec::new(),
            children_right: Vec::new(),
            threshold: Vec::new(),
            feature: Vec::new(),
            value: Vec::new(),
        };

        tree.grow_random(rng, 0, max_depth, num_features);

        return tree;
    }

    fn grow_random<R: Rng>(&mut self, rng: &mut R, depth: usize, max_depth: usize, num_features: usize) -> usize {

        let node_id = self.num_nodes();
        self.children_left.push(LEAF_SENTINEL);
        self.children_right.push(LEAF_SENTINEL);
        self.threshold.push(LEAF_THRESHOLD);
        self.feature.push(LEAF_FEATURE);

        let is_leaf = depth >= max_depth || (depth > 0 && rng.gen_bool(0.3));

        if is_leaf {
            let negative = rng.gen_range(0..10) as f64;
            let positive = rng.gen_range(0..10) as f64 + 1.0;
            self.value.push(vec![negative, positive]);
            return node_id;
        }

        self.value.push(vec![0.0, 0.0]);

        let left = self.grow_random(rng, depth + 1, max_depth, num_features);
        let right = self.grow_random(rng, depth + 1, max_depth, num_features);

        // internal counts are the sum of the children
        let left_counts = self.value[left].clone();
        let right_counts = self.value[right].clone();
        self.value[node_id] = vec![left_counts[0] + right_counts[0], left_counts[1] + right_counts[1]];

        self.children_left[node_id] = left as i64;
        self.children_right[node_id] = right as i64;
        self.feature[node_id] = rng.gen_range(0..num_features) as i64;
        self.threshold[node_id] = (rng.gen_range(-20..20) as f64) / 20.0;

        return node_id;
    }
}

impl Forest {

    pub fn from_file(filename: &str) -> Result<Self> {

        let file = File::open(filename)?;
        let forest: Self = serde_json::from_reader(std::io::BufReader::new(file))?;

        return Ok(forest);
    }

    pub fn to_file(&self, filename: &str) -> Result<()> {

        let s = serde_json::to_string(&self)?;
        let mut file = File::create(filename)?;
        file.write_all(s.as_bytes())?;

        Ok(())
    }

    pub fn random<R: Rng>(rng: &mut R, num_trees: usize, max_depth: usize, num_features: usize) -> Self {

        let trees = (0..num_trees).map(|_| DecisionTree::random(rng, max_depth, num_features)).collect();

        return Self { n_features: num_features, trees };
    }

    pub fn num_trees(&self) -> usize {
        return self.trees.len();
    }

    pub fn validate(&self) -> Result<()> {

        self.trees.par_iter().enumerate().try_for_each(|(i, tree)| tree.validate(i, self.n_features))
    }

    /// Checks the config against this forest: per-tree settings, and one weight per tree
    pub fn check_config(&self, config: &DecompConfig) -> Result<()> {

        if let Some(weights) = &config.tree_weights {
            if weights.len() != self.num_trees() {
                return Err(Error::InvalidConfig(format!("{} tree weights for {} trees", weights.len(), self.num_trees())));
            }
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_config(i, config)?;
        }

        Ok(())
    }

    /// Total positive leaves over all trees. Each one is a range query downstream.
    pub fn count_range_queries(&self, config: &DecompConfig) -> Result<usize> {

        self.check_config(config)?;

        let mut total = 0;
        for (i, tree) in self.trees.iter().enumerate() {
            total += count_range_queries(tree, i, config)?;
        }

        return Ok(total);
    }
}

pub fn is_positive(leaf: &Leaf, config: &DecompConfig) -> bool {

    return match config.positive_rule {
        PositiveRule::Class => leaf.predicted_class == config.positive_class,
        PositiveRule::Probability { cutoff } => leaf.class_probability >= cutoff,
    };
}

pub fn count_range_queries(tree: &DecisionTree, tree_index: usize, config: &DecompConfig) -> Result<usize> {

    let paths = extract_paths(tree, tree_index, config.positive_class)?;

    return Ok(paths.iter().filter(|p| is_positive(&p.leaf, config)).count());
}

pub fn estimate_runtime(num_queries: usize, sec_per_query: f64) -> f64 {

    return num_queries as f64 * sec_per_query;
}

/// Positive leaf bounds of one tree, plus the positive leaves whose bounds were empty
pub fn tree_bounds(tree: &DecisionTree, tree_index: usize, num_features: usize, config: &DecompConfig) -> Result<(Vec<Bound>, Vec<DegenerateBound>)> {

    let paths = extract_paths(tree, tree_index, config.positive_class)?;

    let mut bounds: Vec<Bound> = Vec::new();
    let mut degenerate: Vec<DegenerateBound> = Vec::new();

    for path in paths.iter().filter(|p| is_positive(&p.leaf, config)) {

        let bound = Bound::from_path(path, num_features, config.sentinel)?;

        if bound.is_degenerate() {
            warn!("tree {} leaf {} has an empty region, skipping", tree_index, path.leaf.node_id);
            degenerate.push(DegenerateBound { tree: tree_index, leaf_node: path.leaf.node_id });
            continue;
        }

        bounds.push(bound);
    }

    debug!("tree {}: {} paths, {} positive regions", tree_index, paths.len(), bounds.len());

    return Ok((bounds, degenerate));
}

/// Builds the base region set of every tree, index aligned with `forest.trees`
///
/// Every tree is validated before any of them is decomposed, so a single malformed tree aborts
/// the whole call.
pub fn decompose_trees(forest: &Forest, config: &DecompConfig) -> Result<(Vec<RegionSet>, Vec<DegenerateBound>)> {

    forest.validate()?;
    forest.check_config(config)?;

    let per_tree: Vec<(Vec<Bound>, Vec<DegenerateBound>)> = forest.trees
        .par_iter()
        .enumerate()
        .map(|(i, tree)| tree_bounds(tree, i, forest.n_features, config))
        .collect::<Result<Vec<_>>>()?;

    let mut region_sets: Vec<RegionSet> = Vec::with_capacity(per_tree.len());
    let mut degenerate: Vec<DegenerateBound> = Vec::new();

    for (i, (bounds, skipped)) in per_tree.into_iter().enumerate() {
        region_sets.push(RegionSet::base(i, config.tree_weight(i), bounds));
        degenerate.extend(skipped);
    }

    return Ok((region_sets, degenerate));
}
