//! 16-bit RTP sequence number arithmetic
//!
//! Sequence numbers wrap at 2^16, so ordinary integer comparison is wrong
//! once a stream crosses the boundary. Every module in this crate goes
//! through the three operations here instead of comparing raw values.

use std::cmp::Ordering;

/// Returns true if `a` is strictly earlier than `b` in sequence order.
///
/// The difference is interpreted as a signed 16-bit value, so numbers up to
/// half the sequence space apart compare correctly across wraparound.
#[must_use]
pub fn before(a: u16, b: u16) -> bool {
    (a.wrapping_sub(b) as i16) < 0
}

/// Three-way comparison of two sequence numbers in sequence order.
#[must_use]
pub fn cmp(a: u16, b: u16) -> Ordering {
    (a.wrapping_sub(b) as i16).cmp(&0)
}

/// Unsigned modular distance from `a` forward to `b`.
///
/// `distance(a, b)` is the number of increments that take `a` to `b`.
#[must_use]
pub fn distance(a: u16, b: u16) -> u16 {
    b.wrapping_sub(a)
}
