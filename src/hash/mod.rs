//! Lock-free open-addressing hash tables for sparse accumulation
//!
//! The SpGEMM kernel accumulates the intermediate products of one output
//! row into a hash table keyed by column index. Several workers may insert
//! into the same table at once: slots are claimed with a compare-and-swap
//! on the key and values are accumulated with an atomic add.
//!
//! Two tiers exist. [`HashTable`] owns a small fixed-capacity table that a
//! worker reuses row after row. [`HashArena`] is one packed allocation that
//! holds a larger table per row, sized from a nonzero-count estimate.

pub mod table;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use num_traits::Num;

pub use table::{HashArena, HashSlots, HashTable, InsertOutcome};

/// Scalars that can be accumulated atomically
///
/// Floating point types have no native atomic add, so the accumulation is a
/// compare-exchange loop over the bit pattern.
pub trait AtomicScalar: Copy + Num + Send + Sync + 'static {
    /// Atomic cell holding one value
    type Atomic: Send + Sync;

    /// Creates a cell initialized to `value`
    fn new_atomic(value: Self) -> Self::Atomic;

    /// Reads the cell
    fn load(cell: &Self::Atomic) -> Self;

    /// Overwrites the cell
    fn store(cell: &Self::Atomic, value: Self);

    /// Adds `value` to the cell
    fn fetch_add(cell: &Self::Atomic, value: Self);
}

impl AtomicScalar for f64 {
    type Atomic = AtomicU64;

    fn new_atomic(value: Self) -> AtomicU64 {
        AtomicU64::new(value.to_bits())
    }

    #[inline]
    fn load(cell: &AtomicU64) -> Self {
        f64::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(cell: &AtomicU64, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    fn fetch_add(cell: &AtomicU64, value: Self) {
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

impl AtomicScalar for f32 {
    type Atomic = AtomicU32;

    fn new_atomic(value: Self) -> AtomicU32 {
        AtomicU32::new(value.to_bits())
    }

    #[inline]
    fn load(cell: &AtomicU32) -> Self {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(cell: &AtomicU32, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    fn fetch_add(cell: &AtomicU32, value: Self) {
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}
