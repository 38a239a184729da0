//! HAR entry assembly.
//!
//! Only `time` and `timings` go into the exported archive; waterfall
//! offsets stay in the live payload.

use super::normalizer::compute_event_timings;
use super::types::*;

/// Builds the HAR fields of an entry from its normalized timings.
pub fn build_har_entry_timings(event: &EventTimings) -> HarEntryTimings {
    HarEntryTimings {
        time: event.total_time,
        timings: event.timings,
    }
}

/// Normalizes a batch of records into HAR entry fields, preserving order.
pub fn build_har_entries(records: &[ActivityRecord]) -> Vec<HarEntryTimings> {
    records
        .iter()
        .map(|record| build_har_entry_timings(&compute_event_timings(record)))
        .collect()
}
