//! Regression tree storage and traversal
//!
//! Trees are stored structure-of-arrays for cache-friendly traversal:
//! parallel vectors indexed by node id, with the root at 0. Missing feature
//! values route through a per-node default direction.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Node identifier local to one tree
pub type NodeId = u32;

/// A single regression tree with scalar leaf values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f64>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f64>,
    /// Split gain per node; zero at leaves. Feeds feature importance.
    gains: Vec<f64>,
}

impl RegressionTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            split_indices: Vec::new(),
            split_thresholds: Vec::new(),
            left_children: Vec::new(),
            right_children: Vec::new(),
            default_left: Vec::new(),
            is_leaf: Vec::new(),
            leaf_values: Vec::new(),
            gains: Vec::new(),
        }
    }

    /// Append a leaf node, returning its id
    pub fn push_leaf(&mut self, value: f64) -> NodeId {
        self.push_node(0, 0.0, true, true, value, 0.0)
    }

    /// Append a split node with children to be attached later
    pub fn push_split(
        &mut self,
        feature: u32,
        threshold: f64,
        default_left: bool,
        gain: f64,
    ) -> NodeId {
        self.push_node(feature, threshold, default_left, false, 0.0, gain)
    }

    /// Attach children to a split node
    pub fn set_children(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.left_children[node as usize] = left;
        self.right_children[node as usize] = right;
    }

    /// Number of nodes in the tree
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Number of leaves in the tree
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    /// Check if a node is a leaf
    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    /// Traverse from the root to a leaf for one sample
    ///
    /// NaN feature values take the node's default direction; numeric values
    /// go left when strictly below the threshold.
    #[inline]
    pub fn traverse_to_leaf(&self, features: &[f64]) -> NodeId {
        let mut node: NodeId = 0;

        while !self.is_leaf(node) {
            let idx = node as usize;
            let value = features[self.split_indices[idx] as usize];

            node = if value.is_nan() {
                if self.default_left[idx] {
                    self.left_children[idx]
                } else {
                    self.right_children[idx]
                }
            } else if value < self.split_thresholds[idx] {
                self.left_children[idx]
            } else {
                self.right_children[idx]
            };
        }

        node
    }

    /// Predict a single sample
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let leaf = self.traverse_to_leaf(features);
        self.leaf_values[leaf as usize]
    }

    /// Traverse every row and **add** leaf values into the predictions
    /// buffer (accumulate pattern)
    pub fn predict_into(&self, x: &ArrayView2<'_, f64>, predictions: &mut [f64]) {
        debug_assert_eq!(predictions.len(), x.nrows());

        for (row_idx, pred) in predictions.iter_mut().enumerate() {
            let row = x.row(row_idx);
            let leaf = match row.as_slice() {
                Some(slice) => self.traverse_to_leaf(slice),
                None => {
                    let owned: Vec<f64> = row.to_vec();
                    self.traverse_to_leaf(&owned)
                }
            };
            *pred += self.leaf_values[leaf as usize];
        }
    }

    /// Add this tree's split gains into a per-feature accumulator
    pub fn accumulate_feature_gains(&self, acc: &mut [f64]) {
        for node in 0..self.n_nodes() {
            if !self.is_leaf[node] {
                let feature = self.split_indices[node] as usize;
                if feature < acc.len() {
                    acc[feature] += self.gains[node];
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_node(
        &mut self,
        feature: u32,
        threshold: f64,
        default_left: bool,
        leaf: bool,
        value: f64,
        gain: f64,
    ) -> NodeId {
        let id = self.n_nodes() as NodeId;
        self.split_indices.push(feature);
        self.split_thresholds.push(threshold);
        self.left_children.push(0);
        self.right_children.push(0);
        self.default_left.push(default_left);
        self.is_leaf.push(leaf);
        self.leaf_values.push(value);
        self.gains.push(gain);
        id
    }
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}
