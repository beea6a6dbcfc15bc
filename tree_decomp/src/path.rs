//! Root-to-leaf paths through a single decision tree
//!
//! Every leaf of a tree is described by the ordered list of branch decisions taken from the
//! root to reach it. A [`Path`] holds those decisions plus the class outcome at the leaf.

use crate::error::{Error, Result};
use crate::forest::DecisionTree;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    /// feature <= threshold
    Left,
    /// feature > threshold
    Right,
}

/// One decision at an internal node
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub node_id: usize,
    pub direction: Direction,
    pub threshold: f64,
    pub feature_id: usize,
}

impl fmt::Display for Step {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.direction {
            Direction::Left => write!(f, "{} f{} <= {}", self.node_id, self.feature_id, self.threshold),
            Direction::Right => write!(f, "{} f{} > {}", self.node_id, self.feature_id, self.threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub node_id: usize,
    pub predicted_class: usize,
    /// Fraction of the leaf's samples in the positive class
    pub class_probability: f64,
}

impl Leaf {

    /// Builds the leaf outcome from its per-class sample counts. Ties go to the lowest class.
    pub fn from_counts(node_id: usize, counts: &[f64], positive_class: usize) -> Self {

        let mut predicted_class = 0;
        let mut best = f64::NEG_INFINITY;
        for (i, count) in counts.iter().enumerate() {
            if *count > best {
                best = *count;
                predicted_class = i;
            }
        }

        let total: f64 = counts.iter().sum();
        let class_probability = match counts.get(positive_class) {
            Some(count) if total > 0.0 => count / total,
            _ => 0.0,
        };

        return Self {
            node_id,
            predicted_class,
            class_probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Root first
    pub steps: Vec<Step>,
    pub leaf: Leaf,
}

impl Path {

    pub fn len(&self) -> usize {
        return self.steps.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.steps.is_empty();
    }

    pub fn predicted_class(&self) -> usize {
        return self.leaf.predicted_class;
    }

    pub fn class_probability(&self) -> f64 {
        return self.leaf.class_probability;
    }
}

/// Returns every root-to-leaf path of `tree`, leaves ordered left to right
pub fn extract_paths(tree: &DecisionTree, tree_index: usize, positive_class: usize) -> Result<Vec<Path>> {

    return extract_paths_from(tree, tree_index, 0, positive_class);
}

/// Returns every path from `start_node` down to the leaves below it
///
/// Walks the tree with an explicit stack instead of recursion. Children are pushed right first
/// so the left subtree's leaves come out first, the same order a recursive walk produces. A node
/// reached twice means the child arrays contain a cycle or a shared child and aborts the walk.
pub fn extract_paths_from(tree: &DecisionTree, tree_index: usize, start_node: usize, positive_class: usize) -> Result<Vec<Path>> {

    tree.check_shape(tree_index)?;

    let num_nodes = tree.num_nodes();
    if start_node >= num_nodes {
        return Err(Error::malformed(tree_index, start_node, format!("start node out of range ({} nodes)", num_nodes)));
    }

    let mut visited = vec![false; num_nodes];
    let mut paths: Vec<Path> = Vec::new();

    let mut nodes_to_check: Vec<(usize, Vec<Step>)> = vec![(start_node, Vec::new())];

    loop {

        let (node_id, steps) = match nodes_to_check.pop() {
            None => {break;},
            Some(x) => x,
        };

        if visited[node_id] {
            return Err(Error::malformed(tree_index, node_id, "node reached twice, child arrays are not a tree"));
        }
        visited[node_id] = true;

        if tree.is_leaf(node_id) {

            let leaf = Leaf::from_counts(node_id, &tree.value[node_id], positive_class);
            paths.push(Path { steps, leaf });
            continue;
        }

        let left_child = child_index(tree, tree_index, node_id, tree.children_left[node_id])?;
        let right_child = child_index(tree, tree_index, node_id, tree.children_right[node_id])?;

        let feature_id = tree.feature[node_id];
        if feature_id < 0 {
            return Err(Error::malformed(tree_index, node_id, format!("negative feature index {} on internal node", feature_id)));
        }
        let feature_id = feature_id as usize;
        let threshold = tree.threshold[node_id];

        let mut right_steps = steps.clone();
        right_steps.push(Step { node_id, direction: Direction::Right, threshold, feature_id });

        let mut left_steps = steps;
        left_steps.push(Step { node_id, direction: Direction::Left, threshold, feature_id });

        nodes_to_check.push((right_child, right_steps));
        nodes_to_check.push((left_child, left_steps));
    }

    return Ok(paths);
}

fn child_index(tree: &DecisionTree, tree_index: usize, node_id: usize, child: i64) -> Result<usize> {

    if child < 0 || child as usize >= tree.num_nodes() {
        return Err(Error::malformed(tree_index, node_id, format!("dangling child index {}", child)));
    }

    return Ok(child as usize);
}
