//! Row-parallel hash-table SpGEMM
//!
//! Each output row is accumulated in two tiers of open-addressing hash
//! tables: a small table owned by the worker and a per-row global table
//! carved out of one packed arena. The multiplication runs in two
//! attempts. The first learns how many entries each row produces; the
//! second reruns only the rows that did not fit, with global tables sized
//! from those counts. A compaction pass then copies each row's tables into
//! the output arrays.

pub mod attempt;
pub mod estimate;

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{AmgError, Result};
use crate::hash::{AtomicScalar, HashArena, HashSlots};
use crate::matrix::config::{OverflowPolicy, RowNnzEstimate, SpgemmConfig};
use crate::matrix::transpose::transpose;
use crate::matrix::SparseMatrixCSR;
use crate::utils::{exclusive_scan, split_by_offsets_mut};

pub use attempt::{Attempt, RowOutcome};

/// Counters describing one multiplication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpgemmStats {
    /// Rows rerun on the second attempt
    pub attempt2_rows: usize,
    /// Global slots allocated for the first attempt
    pub attempt1_global_capacity: usize,
    /// Global slots allocated for the second attempt
    pub attempt2_global_capacity: usize,
    /// Rows truncated after overflowing the second attempt
    pub overflow_rows: usize,
    /// Entries in the product
    pub nnz: usize,
}

/// Computes `a * b`
///
/// Column indices within each output row are in hash-table order; call
/// [`SparseMatrixCSR::sort_indices`] for a canonical layout. Entries whose
/// products cancel to zero are kept.
pub fn spgemm<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    b: &SparseMatrixCSR<T>,
    config: &SpgemmConfig,
) -> Result<SparseMatrixCSR<T>> {
    spgemm_with_stats(a, b, config).map(|(c, _)| c)
}

/// Computes `a * b` and reports how the hash tables were used
pub fn spgemm_with_stats<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    b: &SparseMatrixCSR<T>,
    config: &SpgemmConfig,
) -> Result<(SparseMatrixCSR<T>, SpgemmStats)> {
    config.validate()?;
    if a.n_cols != b.n_rows {
        return Err(AmgError::DimensionMismatch {
            context: "spgemm inner dimension",
            left: a.n_cols,
            right: b.n_rows,
        });
    }

    let n_rows = a.n_rows;
    let mut stats = SpgemmStats::default();

    let arena1 = match config.row_estimate {
        RowNnzEstimate::None => HashArena::empty(n_rows),
        RowNnzEstimate::UpperBound => {
            let bounds = estimate::row_nnz_upper_bound(a, b);
            HashArena::new(&estimate::global_capacities(&bounds, config.small_table_size))
        }
    };
    stats.attempt1_global_capacity = arena1.total_capacity();

    let mut outcomes = attempt::first_attempt(a, b, &arena1, config);

    let mut required = vec![0; n_rows];
    let mut redo_rows = Vec::new();
    for (row, outcome) in outcomes.iter().enumerate() {
        if let RowOutcome::Overflow { required: capacity } = outcome {
            required[row] = *capacity;
            redo_rows.push(row);
        }
    }
    stats.attempt2_rows = redo_rows.len();

    debug!(
        "spgemm {}x{} * {}x{}: attempt 1 used {} global slots, {} rows overflowed",
        a.n_rows,
        a.n_cols,
        b.n_rows,
        b.n_cols,
        stats.attempt1_global_capacity,
        redo_rows.len()
    );

    let arena2 = if redo_rows.is_empty() {
        HashArena::empty(n_rows)
    } else {
        HashArena::new(&required)
    };
    stats.attempt2_global_capacity = arena2.total_capacity();

    if !redo_rows.is_empty() {
        let redone = attempt::second_attempt(a, b, &redo_rows, &arena2, config);
        stats.overflow_rows = apply_overflow_policy(&redo_rows, &redone, config.overflow_policy)?;

        for (row, outcome) in redo_rows.into_iter().zip(redone) {
            outcomes[row] = outcome;
        }
        debug!(
            "spgemm: attempt 2 reran {} rows with {} global slots",
            stats.attempt2_rows, stats.attempt2_global_capacity
        );
    }

    let c = compact(n_rows, b.n_cols, &outcomes, &arena1, &arena2);
    stats.nnz = c.nnz();
    Ok((c, stats))
}

/// Checks the rows rerun on the second attempt against `policy`
///
/// Returns the number of truncated rows, or [`AmgError::HashOverflow`]
/// under [`OverflowPolicy::Error`] when any row was truncated.
fn apply_overflow_policy<T>(
    rows: &[usize],
    redone: &[RowOutcome<T>],
    policy: OverflowPolicy,
) -> Result<usize> {
    let truncated: Vec<usize> = rows
        .iter()
        .zip(redone)
        .filter(|(_, outcome)| matches!(outcome, RowOutcome::Done { truncated: true, .. }))
        .map(|(&row, _)| row)
        .collect();

    let Some(&first_row) = truncated.first() else {
        return Ok(0);
    };
    match policy {
        OverflowPolicy::Error => Err(AmgError::HashOverflow {
            rows: truncated.len(),
            first_row,
        }),
        OverflowPolicy::Truncate => {
            warn!(
                "spgemm: {} row(s) overflowed on attempt 2 and were truncated (first: row {})",
                truncated.len(),
                first_row
            );
            Ok(truncated.len())
        }
    }
}

/// Copies every row's tables into freshly allocated CSR arrays
///
/// Row `i` receives its small-table entries followed by the occupied slots
/// of its second-attempt segment, or of its first-attempt segment when it
/// was not rerun.
fn compact<T: AtomicScalar>(
    n_rows: usize,
    n_cols: usize,
    outcomes: &[RowOutcome<T>],
    arena1: &HashArena<T>,
    arena2: &HashArena<T>,
) -> SparseMatrixCSR<T> {
    let counts: Vec<usize> = outcomes.iter().map(RowOutcome::count).collect();
    let row_ptr = exclusive_scan(&counts);
    let nnz = row_ptr[n_rows];

    let mut col_idx = vec![0usize; nnz];
    let mut values = vec![T::zero(); nnz];

    let col_pieces = split_by_offsets_mut(&mut col_idx, &row_ptr);
    let val_pieces = split_by_offsets_mut(&mut values, &row_ptr);

    col_pieces
        .into_par_iter()
        .zip(val_pieces)
        .zip(outcomes.par_iter())
        .enumerate()
        .for_each(|(row, ((cols, vals), outcome))| {
            if let RowOutcome::Done { small, .. } = outcome {
                let global = if arena2.segment_capacity(row) > 0 {
                    arena2.segment(row)
                } else {
                    arena1.segment(row)
                };
                let written = copy_row(small, global, cols, vals);
                debug_assert_eq!(written, cols.len(), "row {} count disagrees with its tables", row);
            }
        });

    SparseMatrixCSR {
        n_rows,
        n_cols,
        row_ptr,
        col_idx,
        values,
    }
}

fn copy_row<T: AtomicScalar>(
    small: &[(usize, T)],
    global: HashSlots<'_, T>,
    cols: &mut [usize],
    vals: &mut [T],
) -> usize {
    for (pos, &(col, val)) in small.iter().enumerate() {
        cols[pos] = col;
        vals[pos] = val;
    }

    let base = small.len();
    let occupied: Vec<usize> = (0..global.capacity())
        .map(|slot| global.key_at(slot).is_some() as usize)
        .collect();
    let offsets = exclusive_scan(&occupied);

    for slot in 0..global.capacity() {
        if let Some(key) = global.key_at(slot) {
            let pos = base + offsets[slot];
            cols[pos] = key;
            vals[pos] = global.value_at(slot);
        }
    }

    base + offsets[global.capacity()]
}

/// Computes the triple product `r * a * p`
pub fn galerkin_product<T: AtomicScalar>(
    r: &SparseMatrixCSR<T>,
    a: &SparseMatrixCSR<T>,
    p: &SparseMatrixCSR<T>,
    config: &SpgemmConfig,
) -> Result<SparseMatrixCSR<T>> {
    let ra = spgemm(r, a, config)?;
    spgemm(&ra, p, config)
}

/// Computes the coarse operator `transpose(p) * a * p`
pub fn rap<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    p: &SparseMatrixCSR<T>,
    config: &SpgemmConfig,
) -> Result<SparseMatrixCSR<T>> {
    let r = transpose(p, true);
    galerkin_product(&r, a, p, config)
}
