//! Utility functions and helpers

pub mod formats;

pub use formats::{from_sprs_csr, to_sprs_csr};

/// Computes an exclusive prefix sum (scan) for a vector
///
/// The result has one more element than the input; its last element is the
/// total.
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0);

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}

/// Smallest power of two that is >= `n`; zero stays zero
#[inline]
pub fn next_power_of_two(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        n.next_power_of_two()
    }
}

/// Splits `data` into consecutive mutable pieces delimited by `offsets`
///
/// `offsets` has the shape of a CSR row pointer: piece `i` is
/// `data[offsets[i]..offsets[i + 1]]`.
pub fn split_by_offsets_mut<'a, T>(mut data: &'a mut [T], offsets: &[usize]) -> Vec<&'a mut [T]> {
    debug_assert_eq!(offsets.first().copied().unwrap_or(0), 0);
    let mut pieces = Vec::with_capacity(offsets.len().saturating_sub(1));

    for window in offsets.windows(2) {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(window[1] - window[0]);
        pieces.push(head);
        data = tail;
    }

    pieces
}
