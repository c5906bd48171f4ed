//! Connection history, paired devices and notification endpoints.
//!
//! History is returned newest first. Timestamps are given in RFC 3339 (UTC)
//! and as a short display string in the configured display timezone.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use blueflow_core::{
    is_valid_mac_address, ConnectionOutcome, Decision, DeviceClass, DeviceId, HistoryEntry,
    Notification, PairedDevice, SessionSnapshot,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Display format for local timestamps, e.g. `2024-01-15 14:30`.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Creates the history router.
pub fn history_router() -> Router<SharedState> {
    Router::new().route("/", get(get_history).delete(clear_history))
}

/// Creates the paired devices router.
pub fn paired_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_paired))
        .route("/{address}", delete(remove_paired))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A past connection attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "01941f29-7c00-7000-8000-000000000001",
    "device_name": "AirPods Pro",
    "address": "BB:CC:DD:EE:FF:00",
    "outcome": "connected",
    "timestamp_utc": "2024-01-15T14:30:00+00:00",
    "timestamp_local": "2024-01-15 14:30",
    "duration_ms": 8_100_000,
    "duration": "2h 15m"
}))]
pub struct HistoryEntryView {
    /// Entry identifier.
    pub id: Uuid,

    /// Device name at the time of the attempt.
    pub device_name: String,

    /// Device hardware address.
    pub address: String,

    /// How the attempt ended.
    pub outcome: ConnectionOutcome,

    /// When the attempt resolved, RFC 3339 UTC.
    pub timestamp_utc: String,

    /// When the attempt resolved, in the display timezone.
    pub timestamp_local: String,

    /// Connection length in milliseconds.
    pub duration_ms: u64,

    /// Connection length for display.
    #[schema(example = "2h 15m")]
    pub duration: String,
}

impl HistoryEntryView {
    fn new(entry: &HistoryEntry, tz: Tz) -> Self {
        Self {
            id: entry.id,
            device_name: entry.device_name.clone(),
            address: entry.address.clone(),
            outcome: entry.outcome,
            timestamp_utc: entry.timestamp.to_rfc3339(),
            timestamp_local: format_local(entry.timestamp, tz),
            duration_ms: u64::try_from(entry.duration.as_millis()).unwrap_or(u64::MAX),
            duration: format_duration(entry.duration),
        }
    }
}

/// Connection history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Entries, most recent first.
    pub entries: Vec<HistoryEntryView>,

    /// Number of entries.
    #[schema(example = 4)]
    pub total: usize,
}

impl HistoryResponse {
    pub(crate) fn from_snapshot(snapshot: &SessionSnapshot, tz: Tz) -> Self {
        let entries: Vec<_> = snapshot
            .history
            .iter()
            .rev()
            .map(|entry| HistoryEntryView::new(entry, tz))
            .collect();
        Self {
            total: entries.len(),
            entries,
        }
    }
}

/// Request to clear connection history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "confirm": true }))]
pub struct ClearHistoryRequest {
    /// The user's answer to "Are you sure you want to clear all connection history?".
    pub confirm: bool,
}

/// A paired device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "5",
    "name": "MacBook Pro",
    "address": "EE:FF:00:11:22:33",
    "device_class": "computer",
    "last_connected_utc": "2024-01-12T11:20:00+00:00",
    "last_connected_local": "2024-01-12 11:20"
}))]
pub struct PairedDeviceView {
    /// Identifier of the device when it was paired.
    pub id: DeviceId,

    /// Display name.
    pub name: String,

    /// Hardware address.
    pub address: String,

    /// Device category.
    pub device_class: DeviceClass,

    /// Last successful connection, RFC 3339 UTC.
    pub last_connected_utc: String,

    /// Last successful connection, in the display timezone.
    pub last_connected_local: String,
}

impl PairedDeviceView {
    fn new(device: &PairedDevice, tz: Tz) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
            address: device.address.clone(),
            device_class: device.device_class,
            last_connected_utc: device.last_connected.to_rfc3339(),
            last_connected_local: format_local(device.last_connected, tz),
        }
    }
}

/// Paired devices in pairing order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PairedResponse {
    /// Paired devices.
    pub devices: Vec<PairedDeviceView>,

    /// Number of paired devices.
    #[schema(example = 2)]
    pub total: usize,
}

impl PairedResponse {
    pub(crate) fn from_snapshot(snapshot: &SessionSnapshot, tz: Tz) -> Self {
        let devices: Vec<_> = snapshot
            .paired
            .iter()
            .map(|device| PairedDeviceView::new(device, tz))
            .collect();
        Self {
            total: devices.len(),
            devices,
        }
    }
}

/// Recent notifications, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationsResponse {
    /// Notifications, most recent first.
    pub notifications: Vec<Notification>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get connection history.
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "history",
    operation_id = "getHistory",
    summary = "Get connection history",
    description = "Returns every recorded connection attempt, most recent first.",
    responses(
        (status = 200, description = "History retrieved", body = HistoryResponse)
    )
)]
pub async fn get_history(State(state): State<SharedState>) -> Json<HistoryResponse> {
    let snapshot = state.session().snapshot();
    Json(HistoryResponse::from_snapshot(
        &snapshot,
        state.display_timezone(),
    ))
}

/// Clear connection history.
///
/// The request body carries the user's answer to the confirmation prompt.
#[utoipa::path(
    delete,
    path = "/api/history",
    tag = "history",
    operation_id = "clearHistory",
    summary = "Clear connection history",
    description = "Removes every history entry if `confirm` is true. A declined \
        confirmation leaves history unchanged and returns 409.",
    request_body = ClearHistoryRequest,
    responses(
        (status = 200, description = "History cleared", body = HistoryResponse),
        (status = 409, description = "Confirmation declined", body = super::error::ErrorResponse)
    )
)]
pub async fn clear_history(
    State(state): State<SharedState>,
    Json(request): Json<ClearHistoryRequest>,
) -> ApiResult<Json<HistoryResponse>> {
    let snapshot = state
        .session()
        .clear_history(Decision::from(request.confirm))
        .await?;
    Ok(Json(HistoryResponse::from_snapshot(
        &snapshot,
        state.display_timezone(),
    )))
}

/// Get paired devices.
#[utoipa::path(
    get,
    path = "/api/paired",
    tag = "paired",
    operation_id = "getPaired",
    summary = "Get paired devices",
    description = "Returns every device that has connected successfully, in pairing order.",
    responses(
        (status = 200, description = "Paired devices retrieved", body = PairedResponse)
    )
)]
pub async fn get_paired(State(state): State<SharedState>) -> Json<PairedResponse> {
    let snapshot = state.session().snapshot();
    Json(PairedResponse::from_snapshot(
        &snapshot,
        state.display_timezone(),
    ))
}

/// Forget a paired device.
#[utoipa::path(
    delete,
    path = "/api/paired/{address}",
    tag = "paired",
    operation_id = "removePaired",
    summary = "Forget a paired device",
    description = "Removes the device with this hardware address from the paired list. \
        Unknown addresses are ignored and the current list is returned.",
    params(
        ("address" = String, Path, description = "Hardware address, e.g. AA:BB:CC:DD:EE:FF")
    ),
    responses(
        (status = 200, description = "Paired devices after removal", body = PairedResponse),
        (status = 400, description = "Malformed address", body = super::error::ErrorResponse)
    )
)]
pub async fn remove_paired(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> ApiResult<Json<PairedResponse>> {
    if !is_valid_mac_address(&address) {
        return Err(ApiError::BadRequest {
            error_code: "invalid_address".to_string(),
            message: format!("'{address}' is not a hardware address (AA:BB:CC:DD:EE:FF)"),
        });
    }

    let snapshot = state.session().remove_from_paired(address).await?;
    Ok(Json(PairedResponse::from_snapshot(
        &snapshot,
        state.display_timezone(),
    )))
}

/// Get recent notifications.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    operation_id = "getNotifications",
    summary = "Get recent notifications",
    description = "Returns the status messages raised by connection attempts, most recent first.",
    responses(
        (status = 200, description = "Notifications retrieved", body = NotificationsResponse)
    )
)]
pub async fn get_notifications(State(state): State<SharedState>) -> Json<NotificationsResponse> {
    let mut notifications = state.notifications().recent();
    notifications.reverse();
    Json(NotificationsResponse { notifications })
}

// ============================================================================
// Helpers
// ============================================================================

/// Render `timestamp` in `tz` for display.
pub(crate) fn format_local(timestamp: DateTime<Utc>, tz: Tz) -> String {
    timestamp.with_timezone(&tz).format(DISPLAY_FORMAT).to_string()
}

/// Render a duration as hours and minutes, e.g. `2h 15m`, `45m`, `0m`.
pub(crate) fn format_duration(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use blueflow_core::SeedData;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(8100)), "2h 15m");
        assert_eq!(format_duration(Duration::from_secs(2700)), "45m");
        assert_eq!(format_duration(Duration::from_secs(12_120)), "3h 22m");
        assert_eq!(format_duration(Duration::ZERO), "0m");
        assert_eq!(format_duration(Duration::from_secs(59)), "0m");
    }

    #[test]
    fn test_format_local_uses_timezone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(format_local(ts, Tz::UTC), "2024-01-15 14:30");
        assert_eq!(format_local(ts, Tz::America__New_York), "2024-01-15 09:30");
    }

    #[test]
    fn test_history_is_newest_first() {
        let seed = SeedData::demo();
        let snapshot = SessionSnapshot {
            history: seed.history,
            ..SessionSnapshot::default()
        };

        let response = HistoryResponse::from_snapshot(&snapshot, Tz::UTC);
        assert_eq!(response.total, 4);
        assert_eq!(response.entries[0].device_name, "AirPods Pro");
        assert_eq!(response.entries[0].duration, "2h 15m");
        assert_eq!(response.entries[0].duration_ms, 8_100_000);
        assert_eq!(response.entries[3].device_name, "MacBook Pro");
    }

    #[test]
    fn test_clear_history_request_deserialization() {
        let request: ClearHistoryRequest = serde_json::from_str(r#"{"confirm": false}"#).unwrap();
        assert!(!request.confirm);
    }
}
