//! Row-partitioned distributed CSR matrix

use std::fmt;
use std::sync::OnceLock;

use num_traits::Num;

use crate::comm::package::owner_of;
use crate::comm::{CommPkg, Communicator};
use crate::error::{AmgError, Result};
use crate::matrix::SparseMatrixCSR;

/// The rows of a global matrix owned by one rank
///
/// Columns inside the rank's own row range live in `diag` with local
/// indices; all other columns live in `offd`, whose column `j` is global
/// column `col_map_offd[j]`.
pub struct ParCsrMatrix<T> {
    row_starts: Vec<usize>,
    rank: usize,
    diag: SparseMatrixCSR<T>,
    offd: SparseMatrixCSR<T>,
    col_map_offd: Vec<usize>,
    comm_pkg: OnceLock<CommPkg>,
}

impl<T> ParCsrMatrix<T>
where
    T: Copy + Num,
{
    /// Assembles a rank's blocks, checking that they agree with the partition
    pub fn new(
        row_starts: Vec<usize>,
        rank: usize,
        diag: SparseMatrixCSR<T>,
        offd: SparseMatrixCSR<T>,
        col_map_offd: Vec<usize>,
    ) -> Result<Self> {
        if rank + 1 >= row_starts.len() {
            return Err(AmgError::InvalidConfig(format!(
                "rank {} outside a partition of {} ranks",
                rank,
                row_starts.len().saturating_sub(1)
            )));
        }
        if row_starts.windows(2).any(|w| w[0] > w[1]) || row_starts[0] != 0 {
            return Err(AmgError::InvalidConfig(
                "row_starts must start at 0 and be non-decreasing".to_string(),
            ));
        }

        let local = row_starts[rank + 1] - row_starts[rank];
        for (context, left, right) in [
            ("ParCsrMatrix diag rows", diag.n_rows, local),
            ("ParCsrMatrix diag cols", diag.n_cols, local),
            ("ParCsrMatrix offd rows", offd.n_rows, local),
            ("ParCsrMatrix offd cols", offd.n_cols, col_map_offd.len()),
        ] {
            if left != right {
                return Err(AmgError::DimensionMismatch { context, left, right });
            }
        }

        if col_map_offd.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AmgError::InvalidMatrix(
                "off-diagonal column map must be strictly increasing".to_string(),
            ));
        }
        let global = row_starts[row_starts.len() - 1];
        let own = row_starts[rank]..row_starts[rank + 1];
        if let Some(&col) = col_map_offd.iter().find(|&&c| c >= global || own.contains(&c)) {
            return Err(AmgError::InvalidMatrix(format!(
                "off-diagonal column {} is local or out of range",
                col
            )));
        }

        Ok(Self {
            row_starts,
            rank,
            diag,
            offd,
            col_map_offd,
            comm_pkg: OnceLock::new(),
        })
    }

    /// Extracts rank `rank`'s rows of a square global matrix
    pub fn from_global(global: &SparseMatrixCSR<T>, row_starts: &[usize], rank: usize) -> Result<Self> {
        if global.n_rows != global.n_cols {
            return Err(AmgError::DimensionMismatch {
                context: "ParCsrMatrix::from_global square",
                left: global.n_rows,
                right: global.n_cols,
            });
        }
        if row_starts.last().copied() != Some(global.n_rows) {
            return Err(AmgError::DimensionMismatch {
                context: "ParCsrMatrix::from_global partition",
                left: row_starts.last().copied().unwrap_or(0),
                right: global.n_rows,
            });
        }
        if rank + 1 >= row_starts.len() {
            return Err(AmgError::InvalidConfig(format!("rank {} outside the partition", rank)));
        }

        let (first, last) = (row_starts[rank], row_starts[rank + 1]);
        let local = last - first;

        let mut col_map_offd: Vec<usize> = (first..last)
            .flat_map(|i| global.row_iter(i).map(|(c, _)| c))
            .filter(|&c| c < first || c >= last)
            .collect();
        col_map_offd.sort_unstable();
        col_map_offd.dedup();

        let mut diag_ptr = vec![0];
        let mut diag_cols = Vec::new();
        let mut diag_vals = Vec::new();
        let mut offd_ptr = vec![0];
        let mut offd_cols = Vec::new();
        let mut offd_vals = Vec::new();

        for i in first..last {
            for (c, &v) in global.row_iter(i) {
                if (first..last).contains(&c) {
                    diag_cols.push(c - first);
                    diag_vals.push(v);
                } else {
                    // col_map_offd holds every off-block column of these rows
                    let j = col_map_offd.binary_search(&c).unwrap_or_else(|pos| pos);
                    offd_cols.push(j);
                    offd_vals.push(v);
                }
            }
            diag_ptr.push(diag_cols.len());
            offd_ptr.push(offd_cols.len());
        }

        let diag = SparseMatrixCSR::try_new(local, local, diag_ptr, diag_cols, diag_vals)?;
        let offd = SparseMatrixCSR::try_new(local, col_map_offd.len(), offd_ptr, offd_cols, offd_vals)?;

        Self::new(row_starts.to_vec(), rank, diag, offd, col_map_offd)
    }

    /// Communication package, built collectively on first use
    pub fn comm_pkg<C: Communicator>(&self, comm: &C) -> Result<&CommPkg> {
        if let Some(pkg) = self.comm_pkg.get() {
            return Ok(pkg);
        }
        let pkg = CommPkg::build(comm, &self.row_starts, &self.col_map_offd)?;
        Ok(self.comm_pkg.get_or_init(|| pkg))
    }

    /// Installs a prebuilt communication package
    pub fn set_comm_pkg(&mut self, pkg: CommPkg) {
        self.comm_pkg = OnceLock::from(pkg);
    }

    pub fn diag(&self) -> &SparseMatrixCSR<T> {
        &self.diag
    }

    pub fn offd(&self) -> &SparseMatrixCSR<T> {
        &self.offd
    }

    pub fn col_map_offd(&self) -> &[usize] {
        &self.col_map_offd
    }

    pub fn row_starts(&self) -> &[usize] {
        &self.row_starts
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.row_starts.len() - 1
    }

    pub fn num_local_rows(&self) -> usize {
        self.diag.n_rows
    }

    pub fn num_offd_cols(&self) -> usize {
        self.col_map_offd.len()
    }

    /// Global index of the first local row
    pub fn first_row(&self) -> usize {
        self.row_starts[self.rank]
    }

    pub fn global_num_rows(&self) -> usize {
        self.row_starts[self.row_starts.len() - 1]
    }

    /// Global index of local row `local`
    #[inline]
    pub fn global_row(&self, local: usize) -> usize {
        self.first_row() + local
    }

    /// Rank owning global row `global`
    pub fn owner_of(&self, global: usize) -> usize {
        owner_of(&self.row_starts, global)
    }
}

impl<T: fmt::Debug + Copy + Num> fmt::Debug for ParCsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParCsrMatrix")
            .field("rank", &self.rank)
            .field("row_starts", &self.row_starts)
            .field("diag", &self.diag)
            .field("offd", &self.offd)
            .field("col_map_offd", &self.col_map_offd)
            .finish()
    }
}
