//! Slice bound normalization
//!
//! Maps optional, possibly negative `start`/`stop` bounds onto a concrete
//! half-open element range, the same way sequence slicing does:
//!
//! ```text
//! len = 5          start   stop    range
//! [1:3]            1       3       1..3
//! [-2:]            -2      None    3..5
//! [:-2]            None    -2      0..3
//! [7:]             7       None    5..5   (clamped, empty)
//! [3:1]            3       1       3..3   (empty)
//! ```

use std::ops::Range;

/// Resolve slice bounds against an array of `len` elements.
///
/// The returned range is always within `0..=len` and never reversed.
pub fn normalize_slice(len: u64, start: Option<i64>, stop: Option<i64>) -> Range<u64> {
    let resolve = |bound: i64| -> u64 {
        if bound < 0 {
            len.saturating_sub(bound.unsigned_abs())
        } else {
            (bound as u64).min(len)
        }
    };

    let start = start.map_or(0, resolve);
    let stop = stop.map_or(len, resolve);

    start..stop.max(start)
}
