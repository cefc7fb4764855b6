//! Sequential SpGEMM used as a correctness oracle
//!
//! The hash kernel keeps every structurally nonzero entry, including
//! entries whose products cancel to zero, so this reference does the same.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use num_traits::Num;

use crate::matrix::SparseMatrixCSR;

/// Multiplies `a` by `b` row by row with an ordered map accumulator
///
/// Output rows are sorted by column.
///
/// # Panics
///
/// Panics if `a.n_cols != b.n_rows`.
pub fn reference_spgemm<T>(a: &SparseMatrixCSR<T>, b: &SparseMatrixCSR<T>) -> SparseMatrixCSR<T>
where
    T: Copy + Num + AddAssign,
{
    assert_eq!(
        a.n_cols, b.n_rows,
        "Matrix dimensions must be compatible for multiplication"
    );

    let mut row_ptr = Vec::with_capacity(a.n_rows + 1);
    let mut col_idx = Vec::new();
    let mut values = Vec::new();
    row_ptr.push(0);

    for i in 0..a.n_rows {
        let mut accum: BTreeMap<usize, T> = BTreeMap::new();

        for (k, &a_val) in a.row_iter(i) {
            for (j, &b_val) in b.row_iter(k) {
                *accum.entry(j).or_insert_with(T::zero) += a_val * b_val;
            }
        }

        for (j, val) in accum {
            col_idx.push(j);
            values.push(val);
        }
        row_ptr.push(col_idx.len());
    }

    SparseMatrixCSR::new(a.n_rows, b.n_cols, row_ptr, col_idx, values)
}
