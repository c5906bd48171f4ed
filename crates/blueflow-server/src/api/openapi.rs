//! OpenAPI specification generation for the blueflow API.
//!
//! The generated document is served at `/api/openapi.json`, rendered by the
//! Swagger UI at `/swagger-ui`, and written to disk by the `gen-openapi`
//! binary for client generation.

use axum::Json;
use blueflow_core::{
    ColorKey, ConnectionOutcome, Device, DeviceClass, DeviceId, Notification, NotificationKind,
    ScanState, SignalClass, SignalTier,
};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::records::{
    ClearHistoryRequest, HistoryEntryView, HistoryResponse, NotificationsResponse,
    PairedDeviceView, PairedResponse,
};
use super::session::{DeviceRequest, DeviceView, SessionResponse};

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json` and returns the complete
/// OpenAPI 3 specification for the blueflow API.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for blueflow.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "blueflow API",
        version = "0.1.0",
        description = r#"
# blueflow API

blueflow discovers nearby wireless devices, connects to them, and keeps a
history of connection attempts and a list of paired devices.

## Flow

1. **Scan**: `POST /api/session/scan` clears the device list and starts discovery.
   Results appear after the scan latency (3 s by default).
2. **Select**: `POST /api/session/select` picks a listed device and opens the connect dialog.
3. **Connect**: `POST /api/session/connect` closes the dialog at once. The outcome is
   recorded in history after the connect latency (1.5 s by default); a successful
   connection also adds the device to the paired list.

Every mutating endpoint returns the session view after the change. Watch
`version` to detect later changes.

## Signal tiers

| dBm          | tier      | color   |
|--------------|-----------|---------|
| -39 or above | excellent | success |
| -54 to -40   | good      | success |
| -69 to -55   | fair      | warning |
| -70 or below | poor      | error   |
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local blueflow server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "session", description = "Device scanning, selection and connecting"),
        (name = "history", description = "Log of past connection attempts"),
        (name = "paired", description = "Devices that have connected successfully"),
        (name = "notifications", description = "Status messages raised by connection attempts")
    ),
    paths(
        super::health::health_check,
        super::session::get_session,
        super::session::start_scan,
        super::session::select_device,
        super::session::cancel_selection,
        super::session::confirm_connect,
        super::records::get_history,
        super::records::clear_history,
        super::records::get_paired,
        super::records::remove_paired,
        super::records::get_notifications,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Session types
            SessionResponse,
            DeviceView,
            DeviceRequest,
            Device,
            DeviceId,
            DeviceClass,
            ScanState,
            SignalClass,
            SignalTier,
            ColorKey,
            // Record types
            HistoryResponse,
            HistoryEntryView,
            ClearHistoryRequest,
            ConnectionOutcome,
            PairedResponse,
            PairedDeviceView,
            NotificationsResponse,
            Notification,
            NotificationKind,
        )
    )
)]
pub struct ApiDoc;
