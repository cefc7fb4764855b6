//! Model problems and strength graphs for demos, tests and benchmarks

use crate::matrix::SparseMatrixCSR;

/// 5-point Laplacian on an `nx` x `ny` grid, rows in x-fastest order
pub fn laplacian_5pt(nx: usize, ny: usize) -> SparseMatrixCSR<f64> {
    laplacian_7pt(nx, ny, 1, [1.0, 1.0, 0.0])
}

/// 7-point Laplacian on an `nx` x `ny` x `nz` grid with per-direction
/// coupling coefficients `[cx, cy, cz]`
///
/// Off-diagonal entries are `-c` for the direction of the neighbor and the
/// diagonal is `2 * (cx + cy + cz)`. Directions with a zero coefficient
/// contribute no entries, so anisotropic problems keep a clean pattern.
pub fn laplacian_7pt(nx: usize, ny: usize, nz: usize, coeffs: [f64; 3]) -> SparseMatrixCSR<f64> {
    let n = nx * ny * nz;
    let [cx, cy, cz] = coeffs;
    let diagonal = 2.0 * (cx + cy + cz);

    let mut row_ptr = Vec::with_capacity(n + 1);
    let mut col_idx = Vec::with_capacity(7 * n);
    let mut values = Vec::with_capacity(7 * n);
    row_ptr.push(0);

    let index = |x: usize, y: usize, z: usize| x + nx * (y + ny * z);

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let mut push = |col: usize, val: f64| {
                    col_idx.push(col);
                    values.push(val);
                };

                if cz != 0.0 && z > 0 {
                    push(index(x, y, z - 1), -cz);
                }
                if cy != 0.0 && y > 0 {
                    push(index(x, y - 1, z), -cy);
                }
                if cx != 0.0 && x > 0 {
                    push(index(x - 1, y, z), -cx);
                }
                push(index(x, y, z), diagonal);
                if cx != 0.0 && x + 1 < nx {
                    push(index(x + 1, y, z), -cx);
                }
                if cy != 0.0 && y + 1 < ny {
                    push(index(x, y + 1, z), -cy);
                }
                if cz != 0.0 && z + 1 < nz {
                    push(index(x, y, z + 1), -cz);
                }

                row_ptr.push(col_idx.len());
            }
        }
    }

    SparseMatrixCSR::new(n, n, row_ptr, col_idx, values)
}

/// Classical strength of connection
///
/// Row `i` strongly depends on `j != i` when
/// `-a_ij >= theta * max_k(-a_ik)` over the off-diagonal entries of the
/// row. The result holds only the strong entries, each with value 1.
/// Rows without negative off-diagonal entries have no strong connections.
pub fn classical_strength(a: &SparseMatrixCSR<f64>, theta: f64) -> SparseMatrixCSR<f64> {
    let mut row_ptr = Vec::with_capacity(a.n_rows + 1);
    let mut col_idx = Vec::new();
    row_ptr.push(0);

    for i in 0..a.n_rows {
        let max_neg = a
            .row_iter(i)
            .filter(|&(j, _)| j != i)
            .map(|(_, &v)| -v)
            .fold(0.0_f64, f64::max);

        if max_neg > 0.0 {
            col_idx.extend(
                a.row_iter(i)
                    .filter(|&(j, &v)| j != i && -v >= theta * max_neg)
                    .map(|(j, _)| j),
            );
        }
        row_ptr.push(col_idx.len());
    }

    let nnz = col_idx.len();
    SparseMatrixCSR::new(a.n_rows, a.n_cols, row_ptr, col_idx, vec![1.0; nnz])
}

/// Splits `n` rows into `ranks` contiguous blocks whose sizes differ by at
/// most one
pub fn uniform_row_starts(n: usize, ranks: usize) -> Vec<usize> {
    let ranks = ranks.max(1);
    let (base, extra) = (n / ranks, n % ranks);
    let mut starts = Vec::with_capacity(ranks + 1);
    starts.push(0);
    for r in 0..ranks {
        let size = base + usize::from(r < extra);
        starts.push(starts[r] + size);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laplacian_5pt_structure() {
        let a = laplacian_5pt(4, 4);

        assert_eq!(a.n_rows, 16);
        // corners have 3 entries, edges 4, interior 5
        assert_eq!(a.nnz(), 4 * 3 + 8 * 4 + 4 * 5);
        assert!(a.has_sorted_indices());
        let row_sums: Vec<f64> = (0..16).map(|i| a.row_iter(i).map(|(_, &v)| v).sum()).collect();
        assert_eq!(row_sums[5], 0.0);
    }

    #[test]
    fn test_laplacian_7pt_anisotropic() {
        let a = laplacian_7pt(3, 3, 3, [1.0, 1.0, 0.001]);
        let s = classical_strength(&a, 0.25);

        // z couplings are weak, so the center row keeps only its 4 in-plane neighbors
        let center = 1 + 3 * (1 + 3);
        assert_eq!(a.row_nnz(center), 7);
        assert_eq!(s.row_nnz(center), 4);
    }

    #[test]
    fn test_classical_strength_drops_diagonal() {
        let a = laplacian_5pt(3, 1);
        let s = classical_strength(&a, 0.25);

        assert_eq!(s.row_ptr, vec![0, 1, 3, 4]);
        assert_eq!(s.col_idx, vec![1, 0, 2, 1]);
    }

    #[test]
    fn test_uniform_row_starts() {
        assert_eq!(uniform_row_starts(10, 3), vec![0, 4, 7, 10]);
        assert_eq!(uniform_row_starts(2, 3), vec![0, 1, 2, 2]);
    }
}
