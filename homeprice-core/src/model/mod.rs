//! Model representation
//!
//! Structure-of-arrays regression trees and the boosted ensemble built
//! from them. Training lives in [`crate::training`]; this module only
//! stores and evaluates fitted structure.

mod gbdt;
mod tree;

pub use gbdt::GbdtModel;
pub use tree::{NodeId, RegressionTree};
