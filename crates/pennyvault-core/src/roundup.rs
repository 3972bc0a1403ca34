//! Round-up calculation
//!
//! Pure functions: the round-up of an amount is what brings it to the next
//! whole 100-unit boundary.

use pennyvault_types::{RoundupItem, RoundupResult, TransactionRecord, MINOR_UNITS_PER_WHOLE};

/// Round-up of a single amount in minor units.
///
/// `roundup(a) = (100 - a mod 100) mod 100`
pub fn roundup(amount: u64) -> u64 {
    let remainder = amount % MINOR_UNITS_PER_WHOLE;
    if remainder == 0 {
        0
    } else {
        MINOR_UNITS_PER_WHOLE - remainder
    }
}

/// Round-up of a record; amounts that are not non-negative integers count as 0
pub fn record_roundup(record: &TransactionRecord) -> u64 {
    record.minor_units().map(roundup).unwrap_or(0)
}

/// Per-record round-ups and their total
pub fn compute_roundups(records: &[TransactionRecord]) -> RoundupResult {
    let per_item: Vec<RoundupItem> = records
        .iter()
        .map(|record| RoundupItem {
            record: record.clone(),
            roundup: record_roundup(record),
        })
        .collect();
    let total = per_item.iter().map(|item| item.roundup).sum();
    RoundupResult { per_item, total }
}
