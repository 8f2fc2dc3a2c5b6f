//! Positional split selection and micro-chunk planning.
//!
//! A producing run is responsible for one contiguous half of the source
//! dataset by original index, never by value. The half is walked in small
//! fixed-size ranges so only one micro-chunk of raw records is ever
//! materialized at a time.

use std::ops::Range;

/// Which contiguous half of the source dataset a run is responsible for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitSelector {
    /// Indices `[0, total / 2)`.
    FirstHalf,
    /// Indices `[total / 2, total)`.
    SecondHalf,
}

/// Index range of the half selected by `selector`.
pub fn half_range(total_records: usize, selector: SplitSelector) -> Range<usize> {
    let half = total_records / 2;
    match selector {
        SplitSelector::FirstHalf => 0..half,
        SplitSelector::SecondHalf => half..total_records,
    }
}

/// Lazy sequence of contiguous micro-chunk ranges spanning the selected half.
///
/// Chunks have `micro_chunk_size` entries except the final one, which may be
/// shorter. A zero chunk size is treated as one.
pub fn plan(
    total_records: usize,
    selector: SplitSelector,
    micro_chunk_size: usize,
) -> impl Iterator<Item = Range<usize>> {
    let range = half_range(total_records, selector);
    let chunk = micro_chunk_size.max(1);
    let end = range.end;
    range.step_by(chunk).map(move |start| {
        let stop = (start + chunk).min(end);
        start..stop
    })
}
