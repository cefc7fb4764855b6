//! Compressed Sparse Row (CSR) matrix format implementation

use std::fmt;
use std::ops::Range;

use ndarray::Array2;
use num_traits::Num;

use crate::constants::{MAX_DISPLAY_ELEMENTS_PER_ROW, MAX_DISPLAY_ROWS};
use crate::error::{AmgError, Result};

/// A sparse matrix in Compressed Sparse Row (CSR) format
///
/// The CSR format stores a sparse matrix using three arrays:
/// - row_ptr: Array of size n_rows + 1 containing indices into col_idx and values arrays
/// - col_idx: Array of size nnz containing column indices of non-zero elements
/// - values: Array of size nnz containing the non-zero values
///
/// Column indices inside a row are not required to be sorted. The hash
/// SpGEMM kernel produces rows in hash-table order; call
/// [`SparseMatrixCSR::sort_indices`] when a canonical order is needed.
#[derive(Clone)]
pub struct SparseMatrixCSR<T> {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Row pointers (size: n_rows + 1)
    /// row_ptr[i] is the index in col_idx and values where row i starts
    /// row_ptr[n_rows] is equal to nnz
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<T>,
}

impl<T> SparseMatrixCSR<T>
where
    T: Copy + Num,
{
    /// Creates a new CSR matrix with the given dimensions and data
    ///
    /// # Panics
    ///
    /// Panics if the input arrays are inconsistent:
    /// - row_ptr.len() must be n_rows + 1
    /// - col_idx.len() must equal values.len()
    /// - row_ptr[n_rows] must equal col_idx.len()
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr.len() must be n_rows + 1");
        assert_eq!(col_idx.len(), values.len(), "col_idx.len() must equal values.len()");
        assert_eq!(
            row_ptr[n_rows],
            col_idx.len(),
            "row_ptr[n_rows] must equal col_idx.len()"
        );

        for &col in &col_idx {
            assert!(col < n_cols, "Column index {} out of bounds (n_cols = {})", col, n_cols);
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Creates a new CSR matrix, reporting inconsistencies as an error
    /// instead of panicking.
    ///
    /// In addition to the checks of [`SparseMatrixCSR::new`] this verifies
    /// that the row pointers start at zero and never decrease.
    pub fn try_new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if row_ptr.len() != n_rows + 1 {
            return Err(AmgError::InvalidMatrix(format!(
                "row_ptr has length {}, expected {}",
                row_ptr.len(),
                n_rows + 1
            )));
        }
        if col_idx.len() != values.len() {
            return Err(AmgError::InvalidMatrix(format!(
                "{} column indices but {} values",
                col_idx.len(),
                values.len()
            )));
        }
        if row_ptr[0] != 0 || row_ptr[n_rows] != col_idx.len() {
            return Err(AmgError::InvalidMatrix(format!(
                "row_ptr must span [0, {}], got [{}, {}]",
                col_idx.len(),
                row_ptr[0],
                row_ptr[n_rows]
            )));
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(AmgError::InvalidMatrix(format!("row_ptr decreases at row {}", i)));
        }
        if let Some(&col) = col_idx.iter().find(|&&col| col >= n_cols) {
            return Err(AmgError::InvalidMatrix(format!(
                "column index {} out of bounds (n_cols = {})",
                col, n_cols
            )));
        }

        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Returns the number of non-zero elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Number of stored entries in row i
    #[inline]
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }

    /// Positions of row i inside `col_idx` and `values`
    #[inline]
    pub fn row_range(&self, i: usize) -> Range<usize> {
        self.row_ptr[i]..self.row_ptr[i + 1]
    }

    /// Returns an iterator over the non-zero elements in row i
    ///
    /// Each item is a tuple (col_idx, value) representing a non-zero element
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, &T)> {
        assert!(i < self.n_rows, "Row index out of bounds");

        let range = self.row_range(i);

        self.col_idx[range.clone()]
            .iter()
            .zip(&self.values[range])
            .map(|(&col, val)| (col, val))
    }

    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
        }
    }

    /// Sorts the column indices (and values) of every row in place
    pub fn sort_indices(&mut self) {
        for i in 0..self.n_rows {
            let range = self.row_range(i);
            let mut entries: Vec<(usize, T)> = self.col_idx[range.clone()]
                .iter()
                .copied()
                .zip(self.values[range.clone()].iter().copied())
                .collect();
            entries.sort_by_key(|&(col, _)| col);

            for (offset, (col, val)) in entries.into_iter().enumerate() {
                self.col_idx[range.start + offset] = col;
                self.values[range.start + offset] = val;
            }
        }
    }

    /// Returns true when every row lists its columns in increasing order
    pub fn has_sorted_indices(&self) -> bool {
        (0..self.n_rows).all(|i| self.col_idx[self.row_range(i)].windows(2).all(|w| w[0] < w[1]))
    }

    /// Expands the matrix into a dense array, summing duplicate entries
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.n_rows, self.n_cols), T::zero());

        for i in 0..self.n_rows {
            for (j, &val) in self.row_iter(i) {
                dense[[i, j]] = dense[[i, j]] + val;
            }
        }

        dense
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for SparseMatrixCSR<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseMatrixCSR {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        let max_rows_to_print = MAX_DISPLAY_ROWS.min(self.n_rows);

        if max_rows_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let range = self.row_range(i);

                if range.is_empty() {
                    writeln!(f, "(empty)")?;
                    continue;
                }

                let shown = MAX_DISPLAY_ELEMENTS_PER_ROW.min(range.len());
                for j in range.start..(range.start + shown) {
                    write!(f, "({}, {:?}) ", self.col_idx[j], self.values[j])?;
                }
                if range.len() > shown {
                    write!(f, "... ({} more)", range.len() - shown)?;
                }
                writeln!(f)?;
            }

            if self.n_rows > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
            }
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrixCSR<i32> {
        SparseMatrixCSR::new(3, 3, vec![0, 2, 3, 5], vec![1, 0, 1, 2, 0], vec![2, 1, 3, 5, 4])
    }

    #[test]
    fn test_new_matrix() {
        let matrix = sample();

        assert_eq!(matrix.n_rows, 3);
        assert_eq!(matrix.n_cols, 3);
        assert_eq!(matrix.nnz(), 5);
        assert_eq!(matrix.row_nnz(0), 2);
        assert_eq!(matrix.row_range(2), 3..5);
    }

    #[test]
    fn test_row_iter() {
        let matrix = sample();

        let row0: Vec<_> = matrix.row_iter(0).collect();
        assert_eq!(row0, vec![(1, &2), (0, &1)]);

        let row1: Vec<_> = matrix.row_iter(1).collect();
        assert_eq!(row1, vec![(1, &3)]);
    }

    #[test]
    fn test_sort_indices() {
        let mut matrix = sample();
        assert!(!matrix.has_sorted_indices());

        matrix.sort_indices();

        assert!(matrix.has_sorted_indices());
        assert_eq!(matrix.col_idx, vec![0, 1, 1, 0, 2]);
        assert_eq!(matrix.values, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_to_dense() {
        let dense = sample().to_dense();

        assert_eq!(dense[[0, 0]], 1);
        assert_eq!(dense[[0, 1]], 2);
        assert_eq!(dense[[1, 1]], 3);
        assert_eq!(dense[[2, 0]], 4);
        assert_eq!(dense[[2, 2]], 5);
        assert_eq!(dense[[1, 0]], 0);
    }

    #[test]
    fn test_identity() {
        let identity = SparseMatrixCSR::<i32>::identity(3);

        assert_eq!(identity.row_ptr, vec![0, 1, 2, 3]);
        assert_eq!(identity.col_idx, vec![0, 1, 2]);
        assert_eq!(identity.values, vec![1, 1, 1]);
    }

    #[test]
    fn test_try_new_rejects_decreasing_row_ptr() {
        let result = SparseMatrixCSR::try_new(2, 2, vec![0, 2, 1], vec![0], vec![1.0]);
        assert!(matches!(result, Err(AmgError::InvalidMatrix(_))));
    }

    #[test]
    fn test_try_new_rejects_out_of_bounds_column() {
        let result = SparseMatrixCSR::try_new(1, 2, vec![0, 1], vec![2], vec![1.0]);
        assert!(matches!(result, Err(AmgError::InvalidMatrix(_))));
    }

    #[test]
    #[should_panic(expected = "row_ptr.len() must be n_rows + 1")]
    fn test_invalid_row_ptr() {
        SparseMatrixCSR::new(3, 3, vec![0, 2, 3], vec![0, 1, 1, 0, 2], vec![1, 2, 3, 4, 5]);
    }
}
