//! Hash table storage and the insert-or-accumulate primitive

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::AtomicScalar;
use crate::constants::EMPTY_KEY;
use crate::matrix::config::HashType;
use crate::utils::exclusive_scan;

/// Result of one insert-or-accumulate call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key claimed a previously empty slot
    New(usize),
    /// The key was already present in this slot
    Existing(usize),
    /// Every slot was probed without finding the key or a free slot
    Full,
}

impl InsertOutcome {
    /// True unless the table was full
    #[inline]
    pub fn is_stored(&self) -> bool {
        !matches!(self, InsertOutcome::Full)
    }
}

/// Borrowed view of one hash table: a key array and a value array of
/// equal power-of-two length
///
/// Both the owned [`HashTable`] and the per-row segments of a
/// [`HashArena`] are used through this view.
pub struct HashSlots<'a, T: AtomicScalar> {
    keys: &'a [AtomicUsize],
    vals: &'a [T::Atomic],
}

impl<'a, T: AtomicScalar> Clone for HashSlots<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: AtomicScalar> Copy for HashSlots<'a, T> {}

impl<'a, T: AtomicScalar> HashSlots<'a, T> {
    /// A table with no slots; every insertion reports [`InsertOutcome::Full`]
    pub fn empty() -> Self {
        Self { keys: &[], vals: &[] }
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Inserts `key` or accumulates into its existing slot
    ///
    /// The probe sequence is given by `hash_type`. A slot is claimed by
    /// swapping its key from [`EMPTY_KEY`] to `key`; whichever writer wins
    /// the swap owns the slot and all later writers of the same key add to
    /// it. `value` is only added when `accumulate` is set, which lets a
    /// caller keep counting insertions for a row whose values it will
    /// discard.
    #[inline]
    pub fn insert_or_accumulate(
        &self,
        hash_type: HashType,
        key: usize,
        value: T,
        accumulate: bool,
    ) -> InsertOutcome {
        debug_assert_ne!(key, EMPTY_KEY, "the sentinel cannot be inserted");
        let capacity = self.capacity();
        let mut slot = 0;

        for attempt in 0..capacity {
            slot = hash_type.probe(capacity, key, attempt, slot);

            let outcome = match self.keys[slot].compare_exchange(
                EMPTY_KEY,
                key,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => InsertOutcome::New(slot),
                Err(existing) if existing == key => InsertOutcome::Existing(slot),
                Err(_) => continue,
            };

            if accumulate {
                T::fetch_add(&self.vals[slot], value);
            }
            return outcome;
        }

        InsertOutcome::Full
    }

    /// Marks every slot empty and zeroes every value
    pub fn reset(&self) {
        for key in self.keys {
            key.store(EMPTY_KEY, Ordering::Relaxed);
        }
        for val in self.vals {
            T::store(val, T::zero());
        }
    }

    /// Key stored in `slot`, `None` if the slot is empty
    #[inline]
    pub fn key_at(&self, slot: usize) -> Option<usize> {
        match self.keys[slot].load(Ordering::Acquire) {
            EMPTY_KEY => None,
            key => Some(key),
        }
    }

    /// Value accumulated in `slot`
    #[inline]
    pub fn value_at(&self, slot: usize) -> T {
        T::load(&self.vals[slot])
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        (0..self.capacity()).filter(|&slot| self.key_at(slot).is_some()).count()
    }

    /// Occupied (key, value) pairs in slot order
    pub fn entries(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        (0..self.capacity()).filter_map(move |slot| self.key_at(slot).map(|key| (key, self.value_at(slot))))
    }
}

/// An owned table of fixed capacity
///
/// SpGEMM workers keep one of these as their small table and reset it for
/// every row they process.
pub struct HashTable<T: AtomicScalar> {
    keys: Vec<AtomicUsize>,
    vals: Vec<T::Atomic>,
}

impl<T: AtomicScalar> HashTable<T> {
    /// Create an empty table
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not zero or a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity == 0 || capacity.is_power_of_two(),
            "hash table capacity must be a power of two, got {}",
            capacity
        );
        Self {
            keys: (0..capacity).map(|_| AtomicUsize::new(EMPTY_KEY)).collect(),
            vals: (0..capacity).map(|_| T::new_atomic(T::zero())).collect(),
        }
    }

    /// View used for insertion and extraction
    #[inline]
    pub fn slots(&self) -> HashSlots<'_, T> {
        HashSlots {
            keys: &self.keys,
            vals: &self.vals,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Marks every slot empty
    pub fn reset(&self) {
        self.slots().reset();
    }
}

/// One packed allocation holding a table for every row
///
/// Row `i` owns slots `offsets[i]..offsets[i + 1]`; rows with zero
/// capacity own nothing.
pub struct HashArena<T: AtomicScalar> {
    offsets: Vec<usize>,
    keys: Vec<AtomicUsize>,
    vals: Vec<T::Atomic>,
}

impl<T: AtomicScalar> HashArena<T> {
    /// Allocate segments of the given per-row capacities, each zero or a
    /// power of two
    pub fn new(capacities: &[usize]) -> Self {
        debug_assert!(capacities.iter().all(|&c| c == 0 || c.is_power_of_two()));
        let offsets = exclusive_scan(capacities);
        let total = offsets[capacities.len()];

        Self {
            offsets,
            keys: (0..total).into_par_iter().map(|_| AtomicUsize::new(EMPTY_KEY)).collect(),
            vals: (0..total).into_par_iter().map(|_| T::new_atomic(T::zero())).collect(),
        }
    }

    /// An arena in which every row has zero capacity
    pub fn empty(n_rows: usize) -> Self {
        Self {
            offsets: vec![0; n_rows + 1],
            keys: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Total number of slots across all rows
    pub fn total_capacity(&self) -> usize {
        self.keys.len()
    }

    /// Capacity of row `row`
    #[inline]
    pub fn segment_capacity(&self, row: usize) -> usize {
        self.offsets[row + 1] - self.offsets[row]
    }

    /// Table of row `row`
    #[inline]
    pub fn segment(&self, row: usize) -> HashSlots<'_, T> {
        let range = self.offsets[row]..self.offsets[row + 1];
        HashSlots {
            keys: &self.keys[range.clone()],
            vals: &self.vals[range],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_new_then_existing() {
        let table = HashTable::<f64>::new(8);
        let slots = table.slots();

        let first = slots.insert_or_accumulate(HashType::Linear, 3, 1.5, true);
        let second = slots.insert_or_accumulate(HashType::Linear, 3, 2.0, true);

        let slot = match first {
            InsertOutcome::New(slot) => slot,
            other => panic!("expected a new slot, got {:?}", other),
        };
        assert_eq!(second, InsertOutcome::Existing(slot));
        assert_eq!(slots.occupied(), 1);
        assert_eq!(slots.value_at(slot), 3.5);
    }

    #[test]
    fn test_full_table() {
        for hash_type in HashType::ALL {
            let table = HashTable::<f64>::new(4);
            let slots = table.slots();

            for key in 0..4 {
                assert!(slots.insert_or_accumulate(hash_type, key * 7, 1.0, true).is_stored());
            }
            assert_eq!(
                slots.insert_or_accumulate(hash_type, 100, 1.0, true),
                InsertOutcome::Full
            );
            // Keys already present still accumulate in a full table
            assert!(slots.insert_or_accumulate(hash_type, 14, 1.0, true).is_stored());
        }
    }

    #[test]
    fn test_empty_slots_are_always_full() {
        let slots = HashSlots::<f64>::empty();
        assert_eq!(slots.insert_or_accumulate(HashType::Double, 1, 1.0, true), InsertOutcome::Full);
    }

    #[test]
    fn test_insert_without_accumulate_keeps_zero() {
        let table = HashTable::<f64>::new(4);
        let slots = table.slots();

        slots.insert_or_accumulate(HashType::Quadratic, 2, 5.0, false);

        assert_eq!(slots.entries().collect::<Vec<_>>(), vec![(2, 0.0)]);
    }

    #[test]
    fn test_reset() {
        let table = HashTable::<f64>::new(4);
        table.slots().insert_or_accumulate(HashType::Linear, 1, 1.0, true);
        table.reset();

        assert_eq!(table.slots().occupied(), 0);
        assert_eq!(table.slots().value_at(1), 0.0);
    }

    #[test]
    fn test_arena_segments_are_disjoint() {
        let arena = HashArena::<f64>::new(&[4, 0, 2]);

        assert_eq!(arena.total_capacity(), 6);
        assert_eq!(arena.segment_capacity(1), 0);

        arena.segment(0).insert_or_accumulate(HashType::Linear, 1, 1.0, true);
        arena.segment(2).insert_or_accumulate(HashType::Linear, 1, 2.0, true);

        assert_eq!(arena.segment(0).entries().collect::<Vec<_>>(), vec![(1, 1.0)]);
        assert_eq!(arena.segment(2).entries().collect::<Vec<_>>(), vec![(1, 2.0)]);
        assert_eq!(arena.segment(1).occupied(), 0);
    }
}
