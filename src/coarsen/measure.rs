//! Global influence measures

use num_traits::Num;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::comm::{exchange_reverse_add, CommPkg, Communicator};
use crate::error::Result;
use crate::matrix::{ParCsrMatrix, SparseMatrixCSR};

/// Number of stored entries in each column of `m`
pub fn column_counts<T>(m: &SparseMatrixCSR<T>) -> Vec<f64> {
    let mut counts = vec![0.0; m.n_cols];
    for &col in &m.col_idx {
        counts[col] += 1.0;
    }
    counts
}

/// Adds a uniform value in `[0, 1)` to every measure
///
/// The stream is fully determined by `seed`, so a rerun with the same seed
/// and partition reproduces the same markers.
pub fn add_jitter(measure: &mut [f64], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for m in measure.iter_mut() {
        *m += rng.gen::<f64>();
    }
}

/// Computes the measure of every local row: how many rows, on any rank,
/// it strongly influences, plus a random tie breaker
///
/// Column counts of the off-diagonal block belong to other ranks and are
/// sent back to their owners, which add them in.
pub fn global_measure<T, C>(s: &ParCsrMatrix<T>, comm: &C, pkg: &CommPkg, seed: u64) -> Result<Vec<f64>>
where
    T: Copy + Num,
    C: Communicator,
{
    let mut measure = column_counts(s.diag());
    let offd_counts = column_counts(s.offd());
    exchange_reverse_add(comm, pkg, &offd_counts, &mut measure)?;

    add_jitter(&mut measure, seed.wrapping_add(comm.rank() as u64));
    Ok(measure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_counts() {
        let m = SparseMatrixCSR::new(2, 3, vec![0, 2, 3], vec![0, 2, 2], vec![1.0; 3]);
        assert_eq!(column_counts(&m), vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_jitter_is_deterministic_and_bounded() {
        let mut first = vec![2.0; 16];
        let mut second = vec![2.0; 16];
        add_jitter(&mut first, 11);
        add_jitter(&mut second, 11);

        assert_eq!(first, second);
        assert!(first.iter().all(|&m| (2.0..3.0).contains(&m)));
    }
}
