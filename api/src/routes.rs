use std::sync::Arc;

use crate::types;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::error;
use ub_core::config::Backends;
use ub_core::scan::{timed_scan, FullScan, KeyCursorScan, OffsetPagedScan};

/// Scan strategies served by the benchmark routes, one per backend.
#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<dyn FullScan>,
    pub firebase: Arc<dyn FullScan>,
}

impl AppState {
    pub fn new(backends: &Backends) -> Self {
        Self {
            supabase: Arc::new(OffsetPagedScan::supabase(backends.table.clone())),
            firebase: Arc::new(KeyCursorScan::firebase(backends.tree.clone())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/supabase", get(get_supabase))
        .route("/api/firebase", get(get_firebase))
        .with_state(state)
}

/// Runs one full scan and renders its outcome.
///
/// # Returns
/// * `(StatusCode::OK, ScanResponse)` with the record count and elapsed milliseconds.
/// * `(StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse)` when any page fails; no
///   partial count is reported.
async fn scan_response(scan: &dyn FullScan) -> Response {
    match timed_scan(scan).await {
        Ok(report) => (StatusCode::OK, Json(types::ScanResponse::from(report))).into_response(),
        Err(err) => {
            error!("{} scan failed: {:#}", scan.label(), err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(types::ErrorResponse {
                    error: format!("{err:#}"),
                }),
            )
                .into_response()
        }
    }
}

/// Pages through every row of the Supabase `users` table by offset and
/// reports how long it took.
pub(crate) async fn get_supabase(State(state): State<AppState>) -> Response {
    scan_response(state.supabase.as_ref()).await
}

/// Pages through every child of the Firebase `users` node by key and reports
/// how long it took.
pub(crate) async fn get_firebase(State(state): State<AppState>) -> Response {
    scan_response(state.firebase.as_ref()).await
}
