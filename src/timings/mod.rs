pub mod har_builder;
pub mod normalizer;
pub mod recorder;
pub mod server_timing;
pub mod types;

use thiserror::Error;

pub use har_builder::{build_har_entries, build_har_entry_timings};
pub use normalizer::{
    compute_event_timings, compute_timings, extract_service_worker_timings, to_millis,
    ConnectionSource, NormalizedTimings,
};
pub use recorder::MarkerRecorder;
pub use server_timing::{extract_server_timings, parse_server_timing_header};
pub use types::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimingError {
    #[error("Unknown timing marker: {0}")]
    UnknownMarker(String),
}
