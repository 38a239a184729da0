//! Accumulation of network activity notifications into phase markers.
//!
//! The network observer sees the same marker several times (a large request
//! body produces many `STATUS_SENDING_TO` notifications). Only the first and
//! the most recent timestamp of each marker are kept.

use super::types::{
    ActivityRecord, MarkerSpan, RawTimingMarkers, RequestMetadata, TimedChannelSnapshot,
    TimingMarker,
};

/// Collects activity notifications for a single request.
#[derive(Debug, Default)]
pub struct MarkerRecorder {
    markers: RawTimingMarkers,
    notifications: usize,
}

impl MarkerRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a notification for `marker` at `timestamp` microseconds.
    pub fn record(&mut self, marker: TimingMarker, timestamp: i64) {
        self.notifications += 1;
        self.markers.record(marker, timestamp);
    }

    /// Records a notification identified by its wire name.
    ///
    /// Unknown names are skipped; the observer reports statuses we do not
    /// use for timings (e.g. `STATUS_WAITING_FOR`).
    pub fn record_named(&mut self, name: &str, timestamp: i64) -> bool {
        match name.parse::<TimingMarker>() {
            Ok(marker) => {
                self.record(marker, timestamp);
                true
            }
            Err(e) => {
                tracing::trace!(error = %e, "Ignoring activity notification");
                false
            }
        }
    }

    pub fn span(&self, marker: TimingMarker) -> Option<&MarkerSpan> {
        self.markers.get(marker)
    }

    /// Number of notifications recorded so far.
    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub fn markers(&self) -> &RawTimingMarkers {
        &self.markers
    }

    pub fn into_markers(self) -> RawTimingMarkers {
        self.markers
    }

    /// Bundles the collected markers with the transport snapshot and
    /// request metadata once the request has finished.
    pub fn finish(self, snapshot: TimedChannelSnapshot, meta: RequestMetadata) -> ActivityRecord {
        ActivityRecord {
            markers: self.markers,
            snapshot,
            meta,
        }
    }
}
