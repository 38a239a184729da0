use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

use super::ApiResponse;
use crate::config::Config;
use crate::error::AppError;
use crate::timings::{
    build_har_entries, compute_event_timings, ActivityRecord, EventTimings, HarTimingsRequest,
    HarTimingsResponse, TimedChannelSnapshot,
};

pub async fn normalize_timings(
    payload: Result<Json<ActivityRecord>, JsonRejection>,
) -> Result<Json<ApiResponse<EventTimings>>, AppError> {
    let Json(record) = payload.map_err(reject)?;
    validate_record(&record).map_err(reject)?;

    let event = compute_event_timings(&record);
    tracing::debug!(
        total = event.total_time,
        from_cache = record.meta.from_cache,
        from_service_worker = record.meta.from_service_worker,
        "Normalized request timings"
    );

    Ok(Json(ApiResponse::success(event)))
}

pub async fn har_timings(
    State(config): State<Arc<Config>>,
    payload: Result<Json<HarTimingsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<HarTimingsResponse>>, AppError> {
    let Json(request) = payload.map_err(reject)?;

    if request.records.len() > config.max_batch {
        return Err(reject(AppError::BatchTooLarge {
            len: request.records.len(),
            max: config.max_batch,
        }));
    }
    for record in &request.records {
        validate_record(record).map_err(reject)?;
    }

    let entries = build_har_entries(&request.records);
    tracing::debug!(entries = entries.len(), "Built HAR entry timings");

    Ok(Json(ApiResponse::success(HarTimingsResponse { entries })))
}

fn reject(err: impl Into<AppError>) -> AppError {
    let err = err.into();
    tracing::warn!(code = err.code(), message = %err, "Rejected timings request");
    err
}

/// Timestamps are microsecond counts; a negative one means the observer
/// produced garbage.
fn validate_record(record: &ActivityRecord) -> Result<(), AppError> {
    for (marker, span) in record.markers.iter() {
        if span.first < 0 || span.last < 0 {
            return Err(AppError::InvalidRecord(format!(
                "{} has a negative timestamp",
                marker
            )));
        }
    }

    for (name, value) in snapshot_fields(&record.snapshot) {
        if value < 0 {
            return Err(AppError::InvalidRecord(format!(
                "snapshot.{} is negative",
                name
            )));
        }
    }

    Ok(())
}

fn snapshot_fields(snapshot: &TimedChannelSnapshot) -> [(&'static str, i64); 13] {
    [
        ("asyncOpenTime", snapshot.async_open_time),
        ("tcpConnectEndTime", snapshot.tcp_connect_end_time),
        ("connectStartTime", snapshot.connect_start_time),
        ("connectEndTime", snapshot.connect_end_time),
        ("secureConnectionStartTime", snapshot.secure_connection_start_time),
        ("domainLookupEndTime", snapshot.domain_lookup_end_time),
        ("domainLookupStartTime", snapshot.domain_lookup_start_time),
        ("launchServiceWorkerStartTime", snapshot.launch_service_worker_start_time),
        ("launchServiceWorkerEndTime", snapshot.launch_service_worker_end_time),
        ("dispatchFetchEventStartTime", snapshot.dispatch_fetch_event_start_time),
        ("dispatchFetchEventEndTime", snapshot.dispatch_fetch_event_end_time),
        ("handleFetchEventStartTime", snapshot.handle_fetch_event_start_time),
        ("handleFetchEventEndTime", snapshot.handle_fetch_event_end_time),
    ]
}
