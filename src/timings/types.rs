use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::TimingError;

/// Network stack activity markers, in the order the stack emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimingMarker {
    #[serde(rename = "STATUS_RESOLVING")]
    Resolving,
    #[serde(rename = "STATUS_RESOLVED")]
    Resolved,
    #[serde(rename = "STATUS_CONNECTING_TO")]
    ConnectingTo,
    #[serde(rename = "STATUS_CONNECTED_TO")]
    ConnectedTo,
    #[serde(rename = "STATUS_TLS_STARTING")]
    TlsStarting,
    #[serde(rename = "STATUS_TLS_ENDING")]
    TlsEnding,
    #[serde(rename = "STATUS_SENDING_TO")]
    SendingTo,
    #[serde(rename = "REQUEST_HEADER")]
    RequestHeader,
    #[serde(rename = "REQUEST_BODY_SENT")]
    RequestBodySent,
    #[serde(rename = "RESPONSE_START")]
    ResponseStart,
    #[serde(rename = "RESPONSE_COMPLETE")]
    ResponseComplete,
}

impl TimingMarker {
    pub const ALL: [TimingMarker; 11] = [
        TimingMarker::Resolving,
        TimingMarker::Resolved,
        TimingMarker::ConnectingTo,
        TimingMarker::ConnectedTo,
        TimingMarker::TlsStarting,
        TimingMarker::TlsEnding,
        TimingMarker::SendingTo,
        TimingMarker::RequestHeader,
        TimingMarker::RequestBodySent,
        TimingMarker::ResponseStart,
        TimingMarker::ResponseComplete,
    ];

    /// Wire name used by the network observer.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingMarker::Resolving => "STATUS_RESOLVING",
            TimingMarker::Resolved => "STATUS_RESOLVED",
            TimingMarker::ConnectingTo => "STATUS_CONNECTING_TO",
            TimingMarker::ConnectedTo => "STATUS_CONNECTED_TO",
            TimingMarker::TlsStarting => "STATUS_TLS_STARTING",
            TimingMarker::TlsEnding => "STATUS_TLS_ENDING",
            TimingMarker::SendingTo => "STATUS_SENDING_TO",
            TimingMarker::RequestHeader => "REQUEST_HEADER",
            TimingMarker::RequestBodySent => "REQUEST_BODY_SENT",
            TimingMarker::ResponseStart => "RESPONSE_START",
            TimingMarker::ResponseComplete => "RESPONSE_COMPLETE",
        }
    }
}

impl fmt::Display for TimingMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimingMarker {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimingMarker::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| TimingError::UnknownMarker(s.to_string()))
    }
}

/// First and last time (microseconds) a marker fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSpan {
    pub first: i64,
    pub last: i64,
}

impl MarkerSpan {
    pub fn at(timestamp: i64) -> Self {
        Self {
            first: timestamp,
            last: timestamp,
        }
    }
}

/// Raw phase markers captured for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTimingMarkers(BTreeMap<TimingMarker, MarkerSpan>);

impl RawTimingMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, marker: TimingMarker) -> Option<&MarkerSpan> {
        self.0.get(&marker)
    }

    pub fn contains(&self, marker: TimingMarker) -> bool {
        self.0.contains_key(&marker)
    }

    /// Records an activity notification: the first one seen sets both ends,
    /// later ones only move `last`.
    pub fn record(&mut self, marker: TimingMarker, timestamp: i64) {
        self.0
            .entry(marker)
            .and_modify(|span| span.last = timestamp)
            .or_insert_with(|| MarkerSpan::at(timestamp));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimingMarker, &MarkerSpan)> {
        self.0.iter()
    }
}

impl FromIterator<(TimingMarker, MarkerSpan)> for RawTimingMarkers {
    fn from_iter<T: IntoIterator<Item = (TimingMarker, MarkerSpan)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Absolute timestamps (microseconds) read from the transport object.
///
/// A value of `0` means the timestamp was never recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimedChannelSnapshot {
    pub async_open_time: i64,
    pub tcp_connect_end_time: i64,
    pub connect_start_time: i64,
    pub connect_end_time: i64,
    pub secure_connection_start_time: i64,
    pub domain_lookup_end_time: i64,
    pub domain_lookup_start_time: i64,
    pub launch_service_worker_start_time: i64,
    pub launch_service_worker_end_time: i64,
    pub dispatch_fetch_event_start_time: i64,
    pub dispatch_fetch_event_end_time: i64,
    pub handle_fetch_event_start_time: i64,
    pub handle_fetch_event_end_time: i64,
}

/// Server-Timing metric as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTiming {
    pub name: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestMetadata {
    pub from_cache: bool,
    pub from_service_worker: bool,
    pub server_timings: Vec<ServerTiming>,
    /// Unparsed `Server-Timing` response header values.
    pub server_timing_headers: Vec<String>,
}

/// Everything captured for one request, as posted by the network observer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(default)]
    pub markers: RawTimingMarkers,
    #[serde(default)]
    pub snapshot: TimedChannelSnapshot,
    #[serde(default)]
    pub meta: RequestMetadata,
}

/// Duration of a single HAR phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseDuration {
    Unmeasured,
    Measured(i64),
}

impl PhaseDuration {
    /// True for unmeasured phases and measured ones that are not positive.
    pub fn is_non_positive(&self) -> bool {
        match self {
            PhaseDuration::Unmeasured => true,
            PhaseDuration::Measured(v) => *v <= 0,
        }
    }

    /// Width used when stacking phases; unmeasured phases take no room.
    pub fn width(&self) -> i64 {
        match self {
            PhaseDuration::Unmeasured => 0,
            PhaseDuration::Measured(v) => *v,
        }
    }

    /// HAR encoding: `-1` for not applicable.
    pub fn to_har(&self) -> i64 {
        match self {
            PhaseDuration::Unmeasured => -1,
            PhaseDuration::Measured(v) => *v,
        }
    }
}

/// HAR 1.1 `timings` object, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarTimings {
    pub blocked: i64,
    pub dns: i64,
    pub connect: i64,
    pub ssl: i64,
    pub send: i64,
    pub wait: i64,
    pub receive: i64,
}

impl HarTimings {
    pub fn values(&self) -> [i64; 7] {
        [
            self.blocked,
            self.dns,
            self.connect,
            self.ssl,
            self.send,
            self.wait,
            self.receive,
        ]
    }
}

/// Start offset of each phase from the request start, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offsets {
    pub blocked: i64,
    pub dns: i64,
    pub connect: i64,
    pub ssl: i64,
    pub send: i64,
    pub wait: i64,
    pub receive: i64,
}

impl Offsets {
    pub fn values(&self) -> [i64; 7] {
        [
            self.blocked,
            self.dns,
            self.connect,
            self.ssl,
            self.send,
            self.wait,
            self.receive,
        ]
    }
}

/// Time spent in service worker interception, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWorkerTimings {
    pub launch_service_worker: i64,
    pub request_to_service_worker: i64,
    pub handled_by_service_worker: i64,
}

/// Normalized timings for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTimings {
    pub timings: HarTimings,
    pub offsets: Offsets,
    pub total_time: i64,
    pub server_timings: Vec<ServerTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_worker_timings: Option<ServiceWorkerTimings>,
}

/// HAR entry fields derived from the timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HarEntryTimings {
    pub time: i64,
    pub timings: HarTimings,
}

/// Batch of records posted for HAR export.
#[derive(Debug, Deserialize)]
pub struct HarTimingsRequest {
    #[serde(default)]
    pub records: Vec<ActivityRecord>,
}

#[derive(Debug, Serialize)]
pub struct HarTimingsResponse {
    pub entries: Vec<HarEntryTimings>,
}
