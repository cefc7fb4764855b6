//! One pass of hash accumulation over the rows of `A * B`

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::hash::{AtomicScalar, HashArena, HashSlots, HashTable, InsertOutcome};
use crate::matrix::config::{HashType, SpgemmConfig};
use crate::matrix::SparseMatrixCSR;
use crate::utils::next_power_of_two;

/// Which of the two passes is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Sized from the estimate; failures are counted and retried
    First,
    /// Sized from the first pass's counts; authoritative
    Second,
}

/// Insertion tally of one row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCount {
    /// Keys that claimed a slot, plus keys that found no slot
    pub inserts: usize,
    /// Some key found no slot in either table
    pub failed: bool,
}

impl RowCount {
    fn merge(self, other: RowCount) -> RowCount {
        RowCount {
            inserts: self.inserts + other.inserts,
            failed: self.failed || other.failed,
        }
    }
}

/// Result of running a row through one attempt
#[derive(Debug, Clone)]
pub enum RowOutcome<T> {
    /// The row of A has no entries
    Empty,
    /// Every product fit; `small` holds the small table's occupied entries
    Done {
        count: usize,
        small: Vec<(usize, T)>,
        truncated: bool,
    },
    /// The row needs a global table of `required` slots
    Overflow { required: usize },
}

impl<T> RowOutcome<T> {
    /// Output entries of the row; zero unless [`RowOutcome::Done`]
    pub fn count(&self) -> usize {
        match self {
            RowOutcome::Done { count, .. } => *count,
            _ => 0,
        }
    }
}

/// Accumulates every product of row `row` of `a * b` into `small`, then
/// `global`
///
/// Rows with more than `parallel_threshold` products are split across
/// workers over the entries of A's row, all inserting into the same two
/// tables. On the first attempt a failed row keeps counting but stops
/// accumulating values, since they will be recomputed.
#[allow(clippy::too_many_arguments)]
pub fn accumulate_row<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    b: &SparseMatrixCSR<T>,
    row: usize,
    small: HashSlots<'_, T>,
    global: HashSlots<'_, T>,
    hash_type: HashType,
    attempt: Attempt,
    parallel_threshold: usize,
) -> RowCount {
    let row_failed = AtomicBool::new(false);

    let process = |idx: usize| -> RowCount {
        let k = a.col_idx[idx];
        let a_val = a.values[idx];
        let mut count = RowCount::default();

        for (col, &b_val) in b.row_iter(k) {
            let accumulate = attempt == Attempt::Second || !row_failed.load(Ordering::Relaxed);
            let product = a_val * b_val;

            let mut outcome = small.insert_or_accumulate(hash_type, col, product, accumulate);
            if !outcome.is_stored() {
                outcome = global.insert_or_accumulate(hash_type, col, product, accumulate);
            }

            match outcome {
                InsertOutcome::New(_) => count.inserts += 1,
                InsertOutcome::Existing(_) => {}
                InsertOutcome::Full => {
                    count.inserts += 1;
                    count.failed = true;
                    row_failed.store(true, Ordering::Relaxed);
                }
            }
        }
        count
    };

    let range = a.row_range(row);
    let products: usize = a.row_iter(row).map(|(k, _)| b.row_nnz(k)).sum();

    if products > parallel_threshold {
        range
            .into_par_iter()
            .map(process)
            .reduce(RowCount::default, RowCount::merge)
    } else {
        range.map(process).fold(RowCount::default(), RowCount::merge)
    }
}

/// Runs the first attempt over all rows
///
/// Each worker owns one small table which it resets for every row. Rows
/// that overflow report the global capacity they need for the second
/// attempt.
pub fn first_attempt<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    b: &SparseMatrixCSR<T>,
    arena: &HashArena<T>,
    config: &SpgemmConfig,
) -> Vec<RowOutcome<T>> {
    let small_size = config.small_table_size;

    (0..a.n_rows)
        .into_par_iter()
        .map_init(
            || HashTable::<T>::new(small_size),
            |table, row| {
                if a.row_nnz(row) == 0 {
                    return RowOutcome::Empty;
                }
                table.reset();

                let count = accumulate_row(
                    a,
                    b,
                    row,
                    table.slots(),
                    arena.segment(row),
                    config.hash_type,
                    Attempt::First,
                    config.intra_row_parallel_threshold,
                );

                if count.failed {
                    RowOutcome::Overflow {
                        required: next_power_of_two(count.inserts.saturating_sub(small_size)),
                    }
                } else {
                    RowOutcome::Done {
                        count: count.inserts,
                        small: table.slots().entries().collect(),
                        truncated: false,
                    }
                }
            },
        )
        .collect()
}

/// Reruns the overflowing rows against the second-attempt arena
///
/// Returns the new outcome of each listed row, in the same order. A row
/// that still overflows keeps the entries that fit and is flagged as
/// truncated.
pub fn second_attempt<T: AtomicScalar>(
    a: &SparseMatrixCSR<T>,
    b: &SparseMatrixCSR<T>,
    rows: &[usize],
    arena: &HashArena<T>,
    config: &SpgemmConfig,
) -> Vec<RowOutcome<T>> {
    let small_size = config.small_table_size;

    rows.par_iter()
        .map_init(
            || HashTable::<T>::new(small_size),
            |table, &row| {
                table.reset();
                let global = arena.segment(row);

                let count = accumulate_row(
                    a,
                    b,
                    row,
                    table.slots(),
                    global,
                    config.hash_type,
                    Attempt::Second,
                    config.intra_row_parallel_threshold,
                );

                let small: Vec<(usize, T)> = table.slots().entries().collect();
                let kept = if count.failed {
                    small.len() + global.occupied()
                } else {
                    count.inserts
                };
                RowOutcome::Done {
                    count: kept,
                    small,
                    truncated: count.failed,
                }
            },
        )
        .collect()
}
