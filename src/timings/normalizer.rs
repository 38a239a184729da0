//! HAR timing normalization.
//!
//! Turns the raw phase markers of a finished request into HAR `timings`,
//! waterfall offsets and a total. Connection phases may overlap the send
//! phase when TCP Fast Open or TLS 1.3 0-RTT is used, so the TLS and send
//! start times are tracked relative to `STATUS_CONNECTING_TO` and used
//! instead of naively stacking `connect`, `ssl` and `send`.

use super::server_timing::extract_server_timings;
use super::types::*;

/// HAR timings, waterfall offsets and total time (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedTimings {
    pub timings: HarTimings,
    pub offsets: Offsets,
    pub total: i64,
}

impl NormalizedTimings {
    /// Result for responses served from the cache: no network activity.
    pub fn empty() -> Self {
        Self {
            timings: HarTimings::default(),
            offsets: Offsets::default(),
            total: 0,
        }
    }
}

/// Which data source wins for the `connect`/`ssl` phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSource {
    /// Phase markers observed on this request.
    PrimaryMarkers,
    /// The markers missed connection setup (speculative or reused
    /// connection); the timed channel carries the real values.
    TimedChannel,
    /// TCP Fast Open did not send any data and the TLS start was corrected
    /// by the transport; `ssl` is taken from the timed channel.
    CorrectedTlsStart,
}

#[derive(Debug, Clone, Copy)]
struct Phases {
    blocked: PhaseDuration,
    dns: PhaseDuration,
    connect: PhaseDuration,
    ssl: PhaseDuration,
    send: PhaseDuration,
    wait: PhaseDuration,
    receive: PhaseDuration,
}

impl Phases {
    fn to_millis(self) -> Self {
        Self {
            blocked: phase_to_millis(self.blocked),
            dns: phase_to_millis(self.dns),
            connect: phase_to_millis(self.connect),
            ssl: phase_to_millis(self.ssl),
            send: phase_to_millis(self.send),
            wait: phase_to_millis(self.wait),
            receive: phase_to_millis(self.receive),
        }
    }

    fn to_har(self) -> HarTimings {
        HarTimings {
            blocked: self.blocked.to_har(),
            dns: self.dns.to_har(),
            connect: self.connect.to_har(),
            ssl: self.ssl.to_har(),
            send: self.send.to_har(),
            wait: self.wait.to_har(),
            receive: self.receive.to_har(),
        }
    }
}

/// Timed channel timestamps with stale values dropped.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelTimes {
    tcp_connect_end: i64,
    connect_start: i64,
    connect_end: i64,
    secure_connection_start: i64,
    domain_lookup_end: i64,
    domain_lookup_start: i64,
}

impl ChannelTimes {
    /// A pooled connection object can still carry timestamps of a previous
    /// request; anything recorded before this channel was opened is ignored.
    fn from_snapshot(snapshot: &TimedChannelSnapshot) -> Self {
        let open = snapshot.async_open_time;
        let valid = |value: i64| {
            if value != 0 && open != 0 && value < open {
                0
            } else {
                value
            }
        };

        Self {
            tcp_connect_end: valid(snapshot.tcp_connect_end_time),
            connect_start: valid(snapshot.connect_start_time),
            connect_end: valid(snapshot.connect_end_time),
            secure_connection_start: valid(snapshot.secure_connection_start_time),
            domain_lookup_end: valid(snapshot.domain_lookup_end_time),
            domain_lookup_start: valid(snapshot.domain_lookup_start_time),
        }
    }
}

/// Computes HAR timings, offsets and total for one request.
pub fn compute_timings(
    markers: &RawTimingMarkers,
    snapshot: &TimedChannelSnapshot,
    meta: &RequestMetadata,
) -> NormalizedTimings {
    if meta.from_cache {
        return NormalizedTimings::empty();
    }

    let channel = ChannelTimes::from_snapshot(snapshot);

    let mut phases = Phases {
        blocked: blocked_timing(markers),
        dns: dns_timing(markers),
        connect: connect_timing(markers),
        ssl: ssl_timing(markers),
        send: send_timing(markers),
        wait: wait_timing(markers),
        receive: receive_timing(markers),
    };

    // Relative to the connection start; `None` when not measurable or when
    // the TLS start is known only as an absolute time.
    let mut secure_start = secure_connection_start(markers);

    match connection_source(markers, &phases, &channel) {
        ConnectionSource::PrimaryMarkers => {}
        ConnectionSource::TimedChannel => {
            phases.connect =
                PhaseDuration::Measured(channel.tcp_connect_end - channel.connect_start);
            if channel.secure_connection_start != 0 {
                phases.ssl =
                    PhaseDuration::Measured(channel.connect_end - channel.secure_connection_start);
                secure_start = Some(channel.secure_connection_start - channel.connect_start);
            } else {
                phases.ssl = PhaseDuration::Unmeasured;
            }
        }
        ConnectionSource::CorrectedTlsStart => {
            phases.ssl =
                PhaseDuration::Measured(channel.connect_end - channel.secure_connection_start);
            secure_start = None;
        }
    }

    if phases.dns.is_non_positive()
        && channel.domain_lookup_end != 0
        && channel.domain_lookup_start != 0
    {
        phases.dns =
            PhaseDuration::Measured(channel.domain_lookup_end - channel.domain_lookup_start);
    }

    let start_sending = start_sending_time(markers, &channel);

    let phases = phases.to_millis();
    let secure_start = secure_start.map(relative_to_millis);
    let start_sending = start_sending.map(relative_to_millis);

    let (offsets, total) = offsets_and_total(&phases, secure_start, start_sending);

    NormalizedTimings {
        timings: phases.to_har(),
        offsets,
        total,
    }
}

/// Normalizes a full activity record, including the pass-through data.
pub fn compute_event_timings(record: &ActivityRecord) -> EventTimings {
    let normalized = compute_timings(&record.markers, &record.snapshot, &record.meta);

    EventTimings {
        timings: normalized.timings,
        offsets: normalized.offsets,
        total_time: normalized.total,
        server_timings: extract_server_timings(&record.meta),
        service_worker_timings: extract_service_worker_timings(&record.meta, &record.snapshot),
    }
}

/// Service worker interception timings, only for responses the worker served.
pub fn extract_service_worker_timings(
    meta: &RequestMetadata,
    snapshot: &TimedChannelSnapshot,
) -> Option<ServiceWorkerTimings> {
    if !meta.from_service_worker {
        return None;
    }

    Some(ServiceWorkerTimings {
        launch_service_worker: snapshot.launch_service_worker_end_time
            - snapshot.launch_service_worker_start_time,
        request_to_service_worker: snapshot.dispatch_fetch_event_end_time
            - snapshot.dispatch_fetch_event_start_time,
        handled_by_service_worker: snapshot.handle_fetch_event_end_time
            - snapshot.handle_fetch_event_start_time,
    })
}

/// Picks the source for `connect`/`ssl`. Rules are checked in order and the
/// first match wins.
fn connection_source(
    markers: &RawTimingMarkers,
    phases: &Phases,
    channel: &ChannelTimes,
) -> ConnectionSource {
    if phases.connect.is_non_positive()
        && channel.tcp_connect_end != 0
        && channel.connect_start != 0
    {
        return ConnectionSource::TimedChannel;
    }

    if let Some(tls_starting) = markers.get(TimingMarker::TlsStarting) {
        if channel.secure_connection_start != 0
            && channel.secure_connection_start > tls_starting.first
        {
            return ConnectionSource::CorrectedTlsStart;
        }
    }

    ConnectionSource::PrimaryMarkers
}

fn measured(value: Option<i64>) -> PhaseDuration {
    value.map_or(PhaseDuration::Unmeasured, PhaseDuration::Measured)
}

fn blocked_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    let start = if markers.contains(TimingMarker::Resolving)
        && markers.contains(TimingMarker::ConnectingTo)
    {
        markers.get(TimingMarker::Resolving)
    } else {
        markers.get(TimingMarker::SendingTo)
    };

    measured(
        start
            .zip(markers.get(TimingMarker::RequestHeader))
            .map(|(start, header)| start.first - header.first),
    )
}

fn dns_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    measured(
        markers
            .get(TimingMarker::Resolving)
            .zip(markers.get(TimingMarker::Resolved))
            .map(|(resolving, resolved)| resolved.last - resolving.first),
    )
}

fn connect_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    measured(
        markers
            .get(TimingMarker::ConnectingTo)
            .zip(markers.get(TimingMarker::ConnectedTo))
            .map(|(connecting, connected)| connected.last - connecting.first),
    )
}

fn ssl_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    measured(
        markers
            .get(TimingMarker::TlsStarting)
            .zip(markers.get(TimingMarker::TlsEnding))
            .map(|(starting, ending)| ending.last - starting.first),
    )
}

fn send_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    if let Some(sending) = markers.get(TimingMarker::SendingTo) {
        return PhaseDuration::Measured(sending.last - sending.first);
    }

    measured(
        markers
            .get(TimingMarker::RequestHeader)
            .zip(markers.get(TimingMarker::RequestBodySent))
            .map(|(header, body_sent)| body_sent.last - header.first),
    )
}

fn wait_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    let sent = markers
        .get(TimingMarker::RequestBodySent)
        .or_else(|| markers.get(TimingMarker::SendingTo));

    measured(
        markers
            .get(TimingMarker::ResponseStart)
            .zip(sent)
            .map(|(response_start, sent)| response_start.first - sent.last),
    )
}

fn receive_timing(markers: &RawTimingMarkers) -> PhaseDuration {
    measured(
        markers
            .get(TimingMarker::ResponseStart)
            .zip(markers.get(TimingMarker::ResponseComplete))
            .map(|(start, complete)| complete.last - start.first),
    )
}

fn secure_connection_start(markers: &RawTimingMarkers) -> Option<i64> {
    let tls_starting = markers.get(TimingMarker::TlsStarting)?;
    markers.get(TimingMarker::TlsEnding)?;

    let start = markers
        .get(TimingMarker::ConnectingTo)
        .map_or(0, |connecting| tls_starting.first - connecting.first);
    Some(start.max(0))
}

fn start_sending_time(markers: &RawTimingMarkers, channel: &ChannelTimes) -> Option<i64> {
    let sending = markers.get(TimingMarker::SendingTo)?;

    let origin = match markers.get(TimingMarker::ConnectingTo) {
        Some(connecting) => connecting.first,
        None if channel.connect_start != 0 => channel.connect_start,
        None => return None,
    };
    Some((sending.first - origin).max(0))
}

/// Microseconds to milliseconds, rounding half up. Never below `-1`.
pub fn to_millis(micros: i64) -> i64 {
    let round_up = i64::from(micros.rem_euclid(1000) >= 500);
    (micros.div_euclid(1000) + round_up).max(-1)
}

/// Negative durations are artifacts of inconsistent markers; HAR reports
/// them as not applicable.
fn phase_to_millis(phase: PhaseDuration) -> PhaseDuration {
    match phase {
        PhaseDuration::Measured(micros) => match to_millis(micros) {
            ms if ms >= 0 => PhaseDuration::Measured(ms),
            _ => PhaseDuration::Unmeasured,
        },
        PhaseDuration::Unmeasured => PhaseDuration::Unmeasured,
    }
}

fn relative_to_millis(micros: i64) -> i64 {
    to_millis(micros).max(0)
}

fn offsets_and_total(
    phases: &Phases,
    secure_start: Option<i64>,
    start_sending: Option<i64>,
) -> (Offsets, i64) {
    // connect and ssl may overlap send, so they only count through the
    // relative start times below.
    let mut total = [
        phases.blocked,
        phases.dns,
        phases.send,
        phases.wait,
        phases.receive,
    ]
    .iter()
    .fold(0i64, |total, phase| total.saturating_add(phase.width()));

    if let Some(start_sending) = start_sending {
        total = total.saturating_add(start_sending);
    } else if let Some(secure_start) = secure_start {
        total = total
            .saturating_add(secure_start)
            .saturating_add(phases.ssl.width());
    }

    let blocked = 0;
    let dns = blocked + phases.blocked.width();
    let connect = dns.saturating_add(phases.dns.width());
    let mut ssl = match secure_start {
        Some(secure_start) => connect.saturating_add(secure_start),
        None => connect.saturating_add(phases.connect.width()),
    };
    let send = match start_sending {
        Some(start_sending) => {
            let send = connect.saturating_add(start_sending);
            if secure_start.is_none() {
                ssl = (send - phases.ssl.width()).max(0);
            }
            send
        }
        None => ssl.saturating_add(phases.ssl.width()),
    };
    let wait = send.saturating_add(phases.send.width());
    let receive = wait.saturating_add(phases.wait.width());

    let offsets = Offsets {
        blocked,
        dns,
        connect,
        ssl,
        send,
        wait,
        receive,
    };
    (offsets, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn markers(entries: &[(TimingMarker, i64, i64)]) -> RawTimingMarkers {
        entries
            .iter()
            .map(|&(marker, first, last)| (marker, MarkerSpan { first, last }))
            .collect()
    }

    fn network() -> RequestMetadata {
        RequestMetadata::default()
    }

    /// Plain sequential HTTPS request: every phase follows the previous one.
    fn sequential_https() -> RawTimingMarkers {
        markers(&[
            (TimingMarker::RequestHeader, 1_000_000, 1_000_000),
            (TimingMarker::Resolving, 1_002_000, 1_002_000),
            (TimingMarker::Resolved, 1_012_000, 1_012_000),
            (TimingMarker::ConnectingTo, 1_012_500, 1_012_500),
            (TimingMarker::ConnectedTo, 1_040_500, 1_040_500),
            (TimingMarker::TlsStarting, 1_040_500, 1_040_500),
            (TimingMarker::TlsEnding, 1_070_500, 1_070_500),
            (TimingMarker::SendingTo, 1_071_000, 1_072_000),
            (TimingMarker::ResponseStart, 1_122_000, 1_122_000),
            (TimingMarker::ResponseComplete, 1_150_000, 1_222_000),
        ])
    }

    #[test]
    fn test_cache_short_circuit() {
        let meta = RequestMetadata {
            from_cache: true,
            ..Default::default()
        };
        let snapshot = TimedChannelSnapshot {
            connect_start_time: 5,
            tcp_connect_end_time: 10,
            ..Default::default()
        };
        let result = compute_timings(&sequential_https(), &snapshot, &meta);
        assert_eq!(result, NormalizedTimings::empty());
        assert_eq!(result.timings.values(), [0; 7]);
        assert_eq!(result.offsets.values(), [0; 7]);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_no_markers_yields_sentinels() {
        let result = compute_timings(
            &RawTimingMarkers::new(),
            &TimedChannelSnapshot::default(),
            &network(),
        );
        assert_eq!(result.timings.values(), [-1; 7]);
        assert_eq!(result.offsets.values(), [0; 7]);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn test_dns_rounds_to_millis() {
        let markers = markers(&[
            (TimingMarker::Resolving, 1_000_000, 1_000_000),
            (TimingMarker::Resolved, 1_100_000, 1_123_456),
        ]);
        let result = compute_timings(&markers, &TimedChannelSnapshot::default(), &network());
        assert_eq!(result.timings.dns, 123);
        assert_eq!(result.timings.blocked, -1);
        assert_eq!(result.total, 123);
    }

    #[test]
    fn test_to_millis() {
        assert_eq!(to_millis(0), 0);
        assert_eq!(to_millis(499), 0);
        assert_eq!(to_millis(500), 1);
        assert_eq!(to_millis(123_456), 123);
        assert_eq!(to_millis(-500), 0);
        assert_eq!(to_millis(-1_000), -1);
        assert_eq!(to_millis(-75_000), -1);
        assert_eq!(to_millis(i64::MAX), i64::MAX / 1000 + 1);
        assert_eq!(to_millis(i64::MIN), -1);
    }

    #[test]
    fn test_huge_timestamps_do_not_overflow() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 0, 0),
            (TimingMarker::Resolving, 0, 0),
            (TimingMarker::Resolved, i64::MAX, i64::MAX),
            (TimingMarker::ConnectingTo, 0, 0),
            (TimingMarker::SendingTo, i64::MAX, i64::MAX),
            (TimingMarker::ResponseStart, i64::MAX, i64::MAX),
            (TimingMarker::ResponseComplete, i64::MAX, i64::MAX),
        ]);
        let result = compute_timings(&markers, &TimedChannelSnapshot::default(), &network());

        let max_ms = i64::MAX / 1000 + 1;
        assert_eq!(result.timings.dns, max_ms);
        assert_eq!(result.timings.receive, 0);
        // dns plus the relative start of sending
        assert_eq!(result.total, 2 * max_ms);
        assert_eq!(result.offsets.connect, max_ms);
        assert_eq!(result.offsets.send, 2 * max_ms);
        assert!(result.offsets.values().iter().all(|&offset| offset >= 0));
    }

    #[test]
    fn test_sequential_https_request() {
        let result = compute_timings(
            &sequential_https(),
            &TimedChannelSnapshot::default(),
            &network(),
        );

        assert_eq!(
            result.timings,
            HarTimings {
                blocked: 2,
                dns: 10,
                connect: 28,
                ssl: 30,
                send: 1,
                wait: 50,
                receive: 100,
            }
        );
        assert_eq!(
            result.offsets,
            Offsets {
                blocked: 0,
                dns: 2,
                connect: 12,
                ssl: 40,
                send: 71,
                wait: 72,
                receive: 122,
            }
        );
        // REQUEST_HEADER to RESPONSE_COMPLETE.last
        assert_eq!(result.total, 222);
    }

    #[test]
    fn test_offsets_monotonic_without_overlap() {
        let result = compute_timings(
            &sequential_https(),
            &TimedChannelSnapshot::default(),
            &network(),
        );
        let offsets = result.offsets.values();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "{:?}", offsets);
    }

    #[test]
    fn test_plain_http_without_tls() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 0, 0),
            (TimingMarker::SendingTo, 3_000, 4_000),
            (TimingMarker::ResponseStart, 10_000, 10_000),
            (TimingMarker::ResponseComplete, 10_000, 15_000),
        ]);
        let result = compute_timings(&markers, &TimedChannelSnapshot::default(), &network());

        assert_eq!(result.timings.values(), [3, -1, -1, -1, 1, 6, 5]);
        assert_eq!(result.offsets.values(), [0, 3, 3, 3, 3, 4, 10]);
        assert_eq!(result.total, 15);
    }

    #[test]
    fn test_fast_open_uses_timed_channel() {
        // Data goes out before the handshake completes; CONNECTED_TO was
        // attached to a speculative connection.
        let markers = markers(&[
            (TimingMarker::RequestHeader, 1_000_000, 1_000_000),
            (TimingMarker::ConnectingTo, 1_000_000, 1_000_000),
            (TimingMarker::TlsStarting, 1_001_000, 1_001_000),
            (TimingMarker::TlsEnding, 1_031_000, 1_031_000),
            (TimingMarker::SendingTo, 1_002_000, 1_003_000),
            (TimingMarker::ResponseStart, 1_053_000, 1_053_000),
            (TimingMarker::ResponseComplete, 1_060_000, 1_063_000),
        ]);
        let snapshot = TimedChannelSnapshot {
            async_open_time: 500_000,
            connect_start_time: 1_000_000,
            tcp_connect_end_time: 1_020_000,
            connect_end_time: 1_040_000,
            secure_connection_start_time: 1_020_000,
            ..Default::default()
        };

        let result = compute_timings(&markers, &snapshot, &network());

        assert_eq!(result.timings.connect, 20);
        assert_eq!(result.timings.ssl, 20);
        assert_eq!(result.timings.values(), [2, -1, 20, 20, 1, 50, 10]);
        assert_eq!(result.offsets.values(), [0, 2, 2, 22, 4, 5, 55]);
        // Sending started 2ms after connecting; connect and ssl are not
        // added on top of it.
        assert_eq!(result.total, 2 + 1 + 50 + 10 + 2);
    }

    #[test]
    fn test_timed_channel_secure_start_counts_in_total() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 1_000_000, 1_000_000),
            (TimingMarker::ConnectingTo, 1_000_000, 1_000_000),
            (TimingMarker::TlsStarting, 1_001_000, 1_001_000),
            (TimingMarker::TlsEnding, 1_031_000, 1_031_000),
            (TimingMarker::RequestBodySent, 1_003_000, 1_003_000),
            (TimingMarker::ResponseStart, 1_053_000, 1_053_000),
            (TimingMarker::ResponseComplete, 1_060_000, 1_063_000),
        ]);
        let snapshot = TimedChannelSnapshot {
            connect_start_time: 1_000_000,
            tcp_connect_end_time: 1_020_000,
            connect_end_time: 1_040_000,
            secure_connection_start_time: 1_020_000,
            ..Default::default()
        };

        let result = compute_timings(&markers, &snapshot, &network());

        assert_eq!(result.timings.values(), [-1, -1, 20, 20, 3, 50, 10]);
        assert_eq!(result.offsets.values(), [0, 0, 0, 20, 40, 43, 93]);
        assert_eq!(result.total, 3 + 50 + 10 + 20 + 20);
    }

    #[test]
    fn test_timed_channel_without_tls() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 0, 0),
            (TimingMarker::ConnectingTo, 0, 0),
            (TimingMarker::ConnectedTo, 0, 0),
        ]);
        let snapshot = TimedChannelSnapshot {
            connect_start_time: 1_000,
            tcp_connect_end_time: 9_000,
            ..Default::default()
        };
        let result = compute_timings(&markers, &snapshot, &network());
        assert_eq!(result.timings.connect, 8);
        assert_eq!(result.timings.ssl, -1);
    }

    #[test]
    fn test_corrected_tls_start() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 1_000_000, 1_000_000),
            (TimingMarker::ConnectingTo, 1_000_000, 1_000_000),
            (TimingMarker::ConnectedTo, 1_010_000, 1_010_000),
            (TimingMarker::TlsStarting, 1_010_000, 1_010_000),
            (TimingMarker::TlsEnding, 1_040_000, 1_040_000),
            (TimingMarker::SendingTo, 1_040_000, 1_041_000),
            (TimingMarker::ResponseStart, 1_051_000, 1_051_000),
        ]);
        let snapshot = TimedChannelSnapshot {
            connect_end_time: 1_040_000,
            secure_connection_start_time: 1_015_000,
            ..Default::default()
        };

        let phases = Phases {
            blocked: blocked_timing(&markers),
            dns: dns_timing(&markers),
            connect: connect_timing(&markers),
            ssl: ssl_timing(&markers),
            send: send_timing(&markers),
            wait: wait_timing(&markers),
            receive: receive_timing(&markers),
        };
        let channel = ChannelTimes::from_snapshot(&snapshot);
        assert_eq!(
            connection_source(&markers, &phases, &channel),
            ConnectionSource::CorrectedTlsStart
        );

        let result = compute_timings(&markers, &snapshot, &network());
        assert_eq!(result.timings.values(), [40, -1, 10, 25, 1, 10, -1]);
        assert_eq!(result.offsets.values(), [0, 40, 40, 55, 80, 81, 91]);
        assert_eq!(result.total, 40 + 1 + 10 + 40);
    }

    #[test]
    fn test_primary_markers_win_when_connect_measured() {
        let markers = sequential_https();
        let snapshot = TimedChannelSnapshot {
            connect_start_time: 1_000_000,
            tcp_connect_end_time: 1_500_000,
            ..Default::default()
        };
        let result = compute_timings(&markers, &snapshot, &network());
        assert_eq!(result.timings.connect, 28);
        assert_eq!(result.timings.ssl, 30);
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let markers = markers(&[
            (TimingMarker::RequestHeader, 2_000_000, 2_000_000),
            (TimingMarker::ConnectingTo, 2_000_000, 2_000_000),
        ]);
        let snapshot = TimedChannelSnapshot {
            async_open_time: 2_000_000,
            connect_start_time: 1_000_000,
            tcp_connect_end_time: 2_500_000,
            domain_lookup_start_time: 900_000,
            domain_lookup_end_time: 2_100_000,
            ..Default::default()
        };
        let result = compute_timings(&markers, &snapshot, &network());
        assert_eq!(result.timings.connect, -1);
        assert_eq!(result.timings.dns, -1);

        let fresh = TimedChannelSnapshot {
            connect_start_time: 2_000_000,
            domain_lookup_start_time: 2_000_000,
            ..snapshot
        };
        let result = compute_timings(&markers, &fresh, &network());
        assert_eq!(result.timings.connect, 500);
        assert_eq!(result.timings.dns, 100);
    }

    #[test]
    fn test_service_worker_timings() {
        let snapshot = TimedChannelSnapshot {
            launch_service_worker_start_time: 100,
            launch_service_worker_end_time: 350,
            dispatch_fetch_event_start_time: 400,
            dispatch_fetch_event_end_time: 420,
            handle_fetch_event_start_time: 420,
            handle_fetch_event_end_time: 1_420,
            ..Default::default()
        };

        assert_eq!(extract_service_worker_timings(&network(), &snapshot), None);

        let meta = RequestMetadata {
            from_service_worker: true,
            ..Default::default()
        };
        assert_eq!(
            extract_service_worker_timings(&meta, &snapshot),
            Some(ServiceWorkerTimings {
                launch_service_worker: 250,
                request_to_service_worker: 20,
                handled_by_service_worker: 1_000,
            })
        );
    }

    #[test]
    fn test_event_timings_omit_service_worker() {
        let record = ActivityRecord {
            markers: sequential_https(),
            ..Default::default()
        };
        let event = compute_event_timings(&record);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("serviceWorkerTimings").is_none());
        assert_eq!(json["totalTime"], 222);
        assert_eq!(json["timings"]["ssl"], 30);
    }

    fn span() -> impl Strategy<Value = Option<MarkerSpan>> {
        let bounds = prop_oneof![
            (0i64..10_000_000, 0i64..2_000_000),
            (0i64..=i64::MAX / 2, 0i64..=i64::MAX / 2),
        ];
        proptest::option::of(
            bounds.prop_map(|(first, len)| MarkerSpan { first, last: first + len }),
        )
    }

    fn timestamp() -> impl Strategy<Value = i64> {
        prop_oneof![Just(0i64), 0i64..12_000_000, 0i64..=i64::MAX]
    }

    proptest! {
        #[test]
        fn test_outputs_never_below_sentinel(
            spans in proptest::collection::vec(span(), TimingMarker::ALL.len()),
            times in proptest::collection::vec(timestamp(), 7),
        ) {
            let markers: RawTimingMarkers = TimingMarker::ALL
                .iter()
                .copied()
                .zip(spans)
                .filter_map(|(marker, span)| span.map(|span| (marker, span)))
                .collect();
            let snapshot = TimedChannelSnapshot {
                async_open_time: times[0],
                tcp_connect_end_time: times[1],
                connect_start_time: times[2],
                connect_end_time: times[3],
                secure_connection_start_time: times[4],
                domain_lookup_end_time: times[5],
                domain_lookup_start_time: times[6],
                ..Default::default()
            };

            let result = compute_timings(&markers, &snapshot, &RequestMetadata::default());
            for value in result.timings.values() {
                prop_assert!(value >= -1);
            }
            for value in result.offsets.values() {
                prop_assert!(value >= 0);
            }
            prop_assert!(result.total >= 0);
        }
    }
}
