//! Unsigned lexicographic byte comparison.
//!
//! Every "higher hash wins" decision in the stores goes through this one
//! comparator so the tie-break rule is identical everywhere.

use std::cmp::Ordering;

/// Compare two byte slices as unsigned big-endian values of possibly
/// different lengths.
///
/// Bytes are compared pairwise; if one slice is a prefix of the other, the
/// longer slice orders last. Matches lexicographic key order in the
/// underlying store.
pub fn bytes_compare(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}
