//! Discovery session endpoints.
//!
//! Every mutating endpoint returns the session view after the transition.
//! Scans and connections resolve later; poll `GET /api/session` (or watch
//! `version`) to see their results.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use blueflow_core::{classify, Device, DeviceId, ScanState, SessionSnapshot, SignalClass};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::api::records::{HistoryResponse, PairedResponse};
use crate::state::SharedState;

/// Creates the session router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_session))
        .route("/scan", post(start_scan))
        .route("/select", post(select_device))
        .route("/cancel", post(cancel_selection))
        .route("/connect", post(confirm_connect))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A discovered device with its signal classification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "2",
    "name": "AirPods Pro",
    "address": "BB:CC:DD:EE:FF:00",
    "signal_strength": -30,
    "device_class": "headphones",
    "signal": { "tier": "excellent", "color": "success" }
}))]
pub struct DeviceView {
    /// The device as discovered.
    #[serde(flatten)]
    pub device: Device,

    /// Signal tier and color key for `signal_strength`.
    pub signal: SignalClass,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        let signal = classify(device.signal_strength);
        Self { device, signal }
    }
}

/// Full session view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Incremented on every applied transition.
    #[schema(example = 3)]
    pub version: u64,

    /// Scan progress.
    pub scan_state: ScanState,

    /// Devices from the last completed scan.
    pub devices: Vec<DeviceView>,

    /// Device picked for connection, if any.
    pub selected: Option<DeviceView>,

    /// Whether the connect dialog is showing.
    pub modal_open: bool,

    /// Device whose connection is being resolved.
    pub connecting: Option<DeviceView>,

    /// Connection history, newest first.
    pub history: HistoryResponse,

    /// Paired devices.
    pub paired: PairedResponse,
}

impl SessionResponse {
    /// Build the view of `snapshot`, rendering local times in `tz`.
    #[must_use]
    pub fn new(snapshot: SessionSnapshot, tz: Tz) -> Self {
        let history = HistoryResponse::from_snapshot(&snapshot, tz);
        let paired = PairedResponse::from_snapshot(&snapshot, tz);

        Self {
            version: snapshot.version,
            scan_state: snapshot.scan_state,
            devices: snapshot.devices.into_iter().map(DeviceView::from).collect(),
            selected: snapshot.selected.map(DeviceView::from),
            modal_open: snapshot.modal_open,
            connecting: snapshot.connecting.map(DeviceView::from),
            history,
            paired,
        }
    }
}

/// Request naming a listed device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "device_id": "2" }))]
pub struct DeviceRequest {
    /// Device identifier from the current scan.
    pub device_id: DeviceId,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the current session.
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    operation_id = "getSession",
    summary = "Get the discovery session",
    description = "Returns scan state, discovered devices with signal tiers, the current \
        selection, any connection in flight, history and paired devices.",
    responses(
        (status = 200, description = "Session retrieved", body = SessionResponse)
    )
)]
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionResponse> {
    Json(SessionResponse::new(
        state.session().snapshot(),
        state.display_timezone(),
    ))
}

/// Start scanning for devices.
#[utoipa::path(
    post,
    path = "/api/session/scan",
    tag = "session",
    operation_id = "startScan",
    summary = "Start a device scan",
    description = "Clears the device list and any selection, then discovers devices. \
        Results appear once the scan latency has elapsed.",
    responses(
        (status = 200, description = "Scan started", body = SessionResponse),
        (status = 409, description = "A scan is already running", body = super::error::ErrorResponse)
    )
)]
pub async fn start_scan(State(state): State<SharedState>) -> ApiResult<Json<SessionResponse>> {
    let snapshot = state.session().start_scan().await?;
    Ok(Json(SessionResponse::new(snapshot, state.display_timezone())))
}

/// Select a device and open the connect dialog.
#[utoipa::path(
    post,
    path = "/api/session/select",
    tag = "session",
    operation_id = "selectDevice",
    summary = "Select a device",
    request_body = DeviceRequest,
    responses(
        (status = 200, description = "Device selected", body = SessionResponse),
        (status = 404, description = "Device is not in the current list", body = super::error::ErrorResponse)
    )
)]
pub async fn select_device(
    State(state): State<SharedState>,
    Json(request): Json<DeviceRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let snapshot = state.session().select_device(request.device_id).await?;
    Ok(Json(SessionResponse::new(snapshot, state.display_timezone())))
}

/// Close the connect dialog.
#[utoipa::path(
    post,
    path = "/api/session/cancel",
    tag = "session",
    operation_id = "cancelSelection",
    summary = "Cancel the selection",
    responses(
        (status = 200, description = "Selection cleared", body = SessionResponse)
    )
)]
pub async fn cancel_selection(
    State(state): State<SharedState>,
) -> ApiResult<Json<SessionResponse>> {
    let snapshot = state.session().cancel_selection().await?;
    Ok(Json(SessionResponse::new(snapshot, state.display_timezone())))
}

/// Connect to the selected device.
#[utoipa::path(
    post,
    path = "/api/session/connect",
    tag = "session",
    operation_id = "confirmConnect",
    summary = "Connect to the selected device",
    description = "Closes the dialog immediately. The outcome is recorded in history \
        once the connect latency has elapsed; a successful connection also pairs the device.",
    request_body = DeviceRequest,
    responses(
        (status = 200, description = "Connection started", body = SessionResponse),
        (status = 404, description = "Device is not the selected device", body = super::error::ErrorResponse),
        (status = 409, description = "Another connection is in progress", body = super::error::ErrorResponse)
    )
)]
pub async fn confirm_connect(
    State(state): State<SharedState>,
    Json(request): Json<DeviceRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let snapshot = state.session().confirm_connect(request.device_id).await?;
    Ok(Json(SessionResponse::new(snapshot, state.display_timezone())))
}
