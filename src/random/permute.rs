//! Uniform partial permutations.

use crate::error::{LatencyError, Result};
use rand::seq::index;
use rand::Rng;

/// Draw `k` distinct indices from `0..n` in uniformly random order.
///
/// Every ordered `k`-subset is equally likely. `k == n` gives a full
/// permutation and `k == 0` an empty one. Asking for more indices than exist
/// (`k > n`) is an `InvalidArgument` error rather than a truncated result.
pub fn permute<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Result<Vec<usize>> {
    if k > n {
        return Err(LatencyError::invalid(format!(
            "cannot draw {} distinct indices from {}",
            k, n
        )));
    }
    Ok(index::sample(rng, n, k).into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::partition_stream;
    use std::collections::HashSet;

    #[test]
    fn test_full_permutation() {
        let mut rng = partition_stream(1);
        let mut p = permute(10, 10, &mut rng).unwrap();
        assert_eq!(p.len(), 10);
        p.sort_unstable();
        assert_eq!(p, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_partial_permutation_distinct_in_range() {
        let mut rng = partition_stream(2);
        let p = permute(50, 7, &mut rng).unwrap();
        assert_eq!(p.len(), 7);
        assert!(p.iter().all(|&i| i < 50));
        assert_eq!(p.iter().collect::<HashSet<_>>().len(), 7);
    }

    #[test]
    fn test_edge_cases() {
        let mut rng = partition_stream(3);
        assert!(permute(0, 0, &mut rng).unwrap().is_empty());
        assert!(permute(5, 0, &mut rng).unwrap().is_empty());
        let err = permute(3, 4, &mut rng).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_reproducible() {
        let a = permute(100, 20, &mut partition_stream(42)).unwrap();
        let b = permute(100, 20, &mut partition_stream(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_roughly_uniform_first_position() {
        // Each index should lead the permutation about 1/4 of the time.
        let mut rng = partition_stream(9);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[permute(4, 4, &mut rng).unwrap()[0]] += 1;
        }
        for c in counts {
            assert!((800..1200).contains(&c), "counts skewed: {:?}", counts);
        }
    }
}
