//! Utilities for converting between our matrix format and sprs

use num_traits::Num;
use sprs::CsMat;

use crate::matrix::SparseMatrixCSR;

/// Converts our CSR matrix format to sprs CsMat format
///
/// sprs requires sorted column indices, so rows are sorted on a copy first.
pub fn to_sprs_csr<T>(matrix: &SparseMatrixCSR<T>) -> CsMat<T>
where
    T: Copy + Num + Default,
{
    let mut sorted = matrix.clone();
    if !sorted.has_sorted_indices() {
        sorted.sort_indices();
    }

    CsMat::new(
        (sorted.n_rows, sorted.n_cols),
        sorted.row_ptr,
        sorted.col_idx,
        sorted.values,
    )
}

/// Converts sprs CsMat to our SparseMatrixCSR format
pub fn from_sprs_csr<T>(matrix: CsMat<T>) -> SparseMatrixCSR<T>
where
    T: Copy + Num + Default,
{
    let matrix = if matrix.is_csr() { matrix } else { matrix.to_csr() };

    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    SparseMatrixCSR::new(shape.0, shape.1, indptr, indices, data)
}
