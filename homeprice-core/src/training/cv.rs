//! K-fold cross-validation splitting

use crate::error::{HomepriceError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Seeded k-fold splitter
///
/// Folds are disjoint and exhaustive: every row index lands in exactly one
/// validation fold across the k splits.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl KFold {
    /// Create a splitter with shuffling enabled
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed: 42,
        }
    }

    /// Builder method to set the shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to disable shuffling
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Produce `(train_indices, validation_indices)` pairs
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(HomepriceError::InvalidParameter {
                name: "n_splits".to_string(),
                value: self.n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < self.n_splits {
            return Err(HomepriceError::TrainingError(format!(
                "cannot split {} rows into {} folds",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        // Spread the remainder over the first folds so sizes differ by at
        // most one.
        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold_idx in 0..self.n_splits {
            let size = base + usize::from(fold_idx < remainder);
            let validation: Vec<usize> = indices[start..start + size].to_vec();
            let train: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[start + size..].iter())
                .copied()
                .collect();
            folds.push((train, validation));
            start += size;
        }

        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_folds_are_disjoint_and_exhaustive() {
        let folds = KFold::new(5).split(23).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen: HashSet<usize> = HashSet::new();
        for (_, validation) in &folds {
            for &idx in validation {
                // Every row appears in exactly one validation fold.
                assert!(seen.insert(idx));
            }
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_train_and_validation_never_overlap() {
        let folds = KFold::new(4).split(20).unwrap();
        for (train, validation) in &folds {
            let train_set: HashSet<usize> = train.iter().copied().collect();
            assert!(validation.iter().all(|idx| !train_set.contains(idx)));
            assert_eq!(train.len() + validation.len(), 20);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = KFold::new(3).with_seed(7).split(10).unwrap();
        let b = KFold::new(3).with_seed(7).split(10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_rows() {
        assert!(KFold::new(5).split(3).is_err());
    }

    #[test]
    fn test_single_split_rejected() {
        assert!(KFold::new(1).split(10).is_err());
    }
}
