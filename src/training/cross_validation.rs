//! K-fold cross-validation splits

use crate::error::{CongestionError, Result};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Unshuffled k-fold splitter.
///
/// Folds are contiguous; the first `n % k` folds get one extra sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossValidator {
    n_splits: usize,
}

impl CrossValidator {
    pub fn k_fold(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(CongestionError::InvalidParameter {
                name: "n_splits".to_string(),
                value: n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < n_splits {
            return Err(CongestionError::DataError(format!(
                "n_samples ({n_samples}) must be >= n_splits ({n_splits})"
            )));
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = (current..current + fold_size).collect();
            let train_indices = (0..current).chain(current + fold_size..n_samples).collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_fold_partitions_samples() {
        let splits = CrossValidator::k_fold(3).split(10).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
        assert_eq!(splits[1].test_indices, vec![4, 5, 6]);
        assert_eq!(splits[2].test_indices, vec![7, 8, 9]);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_too_few_samples() {
        assert!(CrossValidator::k_fold(5).split(3).is_err());
        assert!(CrossValidator::k_fold(1).split(10).is_err());
    }
}
