//! Per-row nonzero estimates for sizing the first attempt's global tables

use num_traits::Num;
use rayon::prelude::*;

use crate::matrix::SparseMatrixCSR;
use crate::utils::next_power_of_two;

/// Number of intermediate products of each row of `a * b`
pub fn intermediate_products<T>(a: &SparseMatrixCSR<T>, b: &SparseMatrixCSR<T>) -> Vec<usize>
where
    T: Copy + Num + Send + Sync,
{
    (0..a.n_rows)
        .into_par_iter()
        .map(|i| a.row_iter(i).map(|(k, _)| b.row_nnz(k)).sum())
        .collect()
}

/// Upper bound on the nonzeros of each row of `a * b`
///
/// A row cannot hold more entries than it has intermediate products, nor
/// more than `b` has columns.
pub fn row_nnz_upper_bound<T>(a: &SparseMatrixCSR<T>, b: &SparseMatrixCSR<T>) -> Vec<usize>
where
    T: Copy + Num + Send + Sync,
{
    let n_cols = b.n_cols;
    intermediate_products(a, b)
        .into_par_iter()
        .map(|products| products.min(n_cols))
        .collect()
}

/// Global table capacity each row needs beyond the small table
pub fn global_capacities(estimates: &[usize], small_table_size: usize) -> Vec<usize> {
    estimates
        .par_iter()
        .map(|&est| {
            if est > small_table_size {
                next_power_of_two(est - small_table_size)
            } else {
                0
            }
        })
        .collect()
}
