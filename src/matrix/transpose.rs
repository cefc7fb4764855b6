//! Sort-based sparse transpose
//!
//! Every nonzero is tagged with its row, the (column, position) pairs are
//! stable-sorted by column, and the sorted column stream becomes the row
//! pointer of the transpose. Because the sort is stable, each row of the
//! result lists its columns in increasing order.

use num_traits::Num;
use rayon::prelude::*;

use crate::matrix::SparseMatrixCSR;
use crate::utils::exclusive_scan;

/// Expands a row pointer into one row index per nonzero
pub fn row_ptr_to_indices(row_ptr: &[usize]) -> Vec<usize> {
    let nnz = row_ptr.last().copied().unwrap_or(0);
    let mut rows = vec![0; nnz];

    let mut pieces = crate::utils::split_by_offsets_mut(&mut rows, row_ptr);
    pieces.par_iter_mut().enumerate().for_each(|(row, piece)| piece.fill(row));

    rows
}

/// Compresses sorted row indices into a row pointer of `n_rows + 1` entries
pub fn row_indices_to_ptr(n_rows: usize, sorted_rows: &[usize]) -> Vec<usize> {
    debug_assert!(sorted_rows.windows(2).all(|w| w[0] <= w[1]));
    let mut counts = vec![0; n_rows];
    for &row in sorted_rows {
        counts[row] += 1;
    }
    exclusive_scan(&counts)
}

/// Computes the transpose of `a`
///
/// When `want_values` is false only the sparsity pattern is transposed and
/// every stored value is zero.
pub fn transpose<T>(a: &SparseMatrixCSR<T>, want_values: bool) -> SparseMatrixCSR<T>
where
    T: Copy + Num + Send + Sync,
{
    let nnz = a.nnz();

    if nnz == 0 {
        return SparseMatrixCSR::zeros(a.n_cols, a.n_rows);
    }

    let rows = row_ptr_to_indices(&a.row_ptr);

    let mut keyed: Vec<(usize, usize)> = a.col_idx.par_iter().copied().zip(0..nnz).collect();
    keyed.par_sort_by_key(|&(col, _)| col);

    let col_idx: Vec<usize> = keyed.par_iter().map(|&(_, pos)| rows[pos]).collect();
    let values: Vec<T> = if want_values {
        keyed.par_iter().map(|&(_, pos)| a.values[pos]).collect()
    } else {
        vec![T::zero(); nnz]
    };

    let sorted_cols: Vec<usize> = keyed.into_iter().map(|(col, _)| col).collect();
    let row_ptr = row_indices_to_ptr(a.n_cols, &sorted_cols);
    debug_assert_eq!(row_ptr[a.n_cols], nnz);

    SparseMatrixCSR {
        n_rows: a.n_cols,
        n_cols: a.n_rows,
        row_ptr,
        col_idx,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_ptr_to_indices() {
        assert_eq!(row_ptr_to_indices(&[0, 2, 2, 5]), vec![0, 0, 2, 2, 2]);
    }

    #[test]
    fn test_row_indices_to_ptr() {
        assert_eq!(row_indices_to_ptr(4, &[0, 0, 2, 2, 2]), vec![0, 2, 2, 5, 5]);
    }

    #[test]
    fn test_transpose_rectangular() {
        // A = [1 0 2; 0 3 0]
        let a = SparseMatrixCSR::new(2, 3, vec![0, 2, 3], vec![2, 0, 1], vec![2.0, 1.0, 3.0]);

        let t = transpose(&a, true);

        assert_eq!(t.n_rows, 3);
        assert_eq!(t.n_cols, 2);
        assert_eq!(t.row_ptr, vec![0, 1, 2, 3]);
        assert_eq!(t.col_idx, vec![0, 1, 0]);
        assert_eq!(t.values, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_transpose_without_values() {
        let a = SparseMatrixCSR::new(2, 2, vec![0, 1, 2], vec![1, 0], vec![4.0, 5.0]);

        let t = transpose(&a, false);

        assert_eq!(t.col_idx, vec![1, 0]);
        assert_eq!(t.values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_transpose_empty() {
        let a = SparseMatrixCSR::<f64>::zeros(3, 5);

        let t = transpose(&a, true);

        assert_eq!(t.n_rows, 5);
        assert_eq!(t.n_cols, 3);
        assert_eq!(t.row_ptr, vec![0; 6]);
        assert!(t.col_idx.is_empty());
        assert!(t.values.is_empty());
    }
}
