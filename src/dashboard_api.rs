// Copyright 2024 the doorsync authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thin JSON core API exposed to the (out-of-scope, §1) dashboard: the
//! logical operations of §6's "Core API exposed to the dashboard" as an
//! `axum` router, following the teacher's `controllers::reload` pattern of
//! a per-request token check rather than session auth.
//!
//! This module renders no HTML: the dashboard's own templates and form
//! handlers are an external collaborator (§1 Non-goals). Every route here
//! is a `Json` in, `Json` out operation on the orchestrator or one of the
//! operator-facing stores.

use crate::{
    config::Config,
    errors::InternalError,
    model::{
        approval::{ApprovedNames, SafeHours},
        cancellations::CancelledEvent,
        mapping::Mapping,
        office_hours::OfficeHours,
        overrides::Overrides,
        schedule::DisplayItem,
        snapshot::StatusSnapshot,
    },
    orchestrator::Orchestrator,
    scheduler::Scheduler,
};
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub scheduler: Arc<Scheduler>,
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/run-once", post(run_once))
        .route("/api/preview", get(get_preview))
        .route("/api/upcoming-preview", get(get_upcoming_preview))
        .route("/api/apply-mode", post(set_apply_mode))
        .route("/api/pending", get(list_pending))
        .route("/api/pending/approve", post(approve))
        .route("/api/pending/deny", post(deny))
        .route("/api/cancelled", get(list_cancelled))
        .route("/api/cancelled/cancel", post(cancel))
        .route("/api/cancelled/restore", post(restore))
        .route("/api/mapping", get(get_mapping).put(put_mapping))
        .route("/api/office-hours", get(get_office_hours).put(put_office_hours))
        .route("/api/overrides", get(get_overrides).put(put_overrides))
        .route("/api/safe-hours", get(get_safe_hours).put(put_safe_hours))
        .route(
            "/api/approved-names",
            get(get_approved_names).put(put_approved_names),
        )
        .with_state(state)
}

/// Extracts and checks the `X-Dashboard-Token` header against
/// `Config::dashboard_token`. An empty configured token (the default)
/// disables the check, matching a local/dev setup with nothing to protect.
struct DashboardToken;

impl<S> FromRequestParts<S> for DashboardToken
where
    ApiState: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = InternalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = ApiState::from_ref(state);
        if api_state.config.dashboard_token.is_empty() {
            return Ok(Self);
        }
        let provided = parts
            .headers
            .get("X-Dashboard-Token")
            .and_then(|v| v.to_str().ok());
        if provided == Some(api_state.config.dashboard_token.as_str()) {
            Ok(Self)
        } else {
            Err(InternalError::Unauthorised)
        }
    }
}

impl axum::extract::FromRef<ApiState> for ApiState {
    fn from_ref(input: &ApiState) -> Self {
        input.clone()
    }
}

/// `getStatusSnapshot` (§6).
async fn get_status(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Json<StatusSnapshot> {
    Json(state.orchestrator.snapshot())
}

/// `runOnce` (§6): the manual trigger, which awaits completion (§4.12).
async fn run_once(_token: DashboardToken, State(state): State<ApiState>) -> Result<Json<StatusSnapshot>, InternalError> {
    match state.scheduler.run_manual().await {
        Ok(()) => Ok(Json(state.orchestrator.snapshot())),
        Err(error) if error.to_string() == "busy" => Err(InternalError::Busy),
        Err(error) => Err(InternalError::Internal(error)),
    }
}

/// `getPreview` (§6): the preview from the most recently completed cycle.
async fn get_preview(_token: DashboardToken, State(state): State<ApiState>) -> Json<Vec<DisplayItem>> {
    Json(state.orchestrator.get_preview())
}

/// `getUpcomingPreview` (§6, §4.11): always live, never persists state or
/// writes to the remote controller.
async fn get_upcoming_preview(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<Vec<DisplayItem>>, InternalError> {
    let preview = state
        .orchestrator
        .get_upcoming_preview()
        .await
        .map_err(InternalError::Internal)?;
    Ok(Json(preview))
}

#[derive(Deserialize)]
struct ApplyModeRequest {
    apply_to_unifi: bool,
}

/// `setApplyMode` (§6).
async fn set_apply_mode(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(request): Json<ApplyModeRequest>,
) -> Result<StatusCode, InternalError> {
    state
        .orchestrator
        .set_apply_mode(request.apply_to_unifi)
        .await
        .map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `listPending` (§6).
async fn list_pending(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<Vec<crate::model::approval::PendingApproval>>, InternalError> {
    let pending = state.orchestrator.list_pending().map_err(InternalError::Internal)?;
    Ok(Json(pending))
}

#[derive(Deserialize)]
struct EventIdRequest {
    id: String,
}

#[derive(Serialize)]
struct ChangedResponse {
    changed: bool,
}

/// `approve(id)` (§6).
async fn approve(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(request): Json<EventIdRequest>,
) -> Result<Json<ChangedResponse>, InternalError> {
    let changed = state.orchestrator.approve(&request.id).await.map_err(InternalError::Internal)?;
    Ok(Json(ChangedResponse { changed }))
}

/// `deny(id)` (§6).
async fn deny(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(request): Json<EventIdRequest>,
) -> Result<Json<ChangedResponse>, InternalError> {
    let changed = state.orchestrator.deny(&request.id).await.map_err(InternalError::Internal)?;
    Ok(Json(ChangedResponse { changed }))
}

/// `listCancelled` (§6).
async fn list_cancelled(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<Vec<CancelledEvent>>, InternalError> {
    let cancelled = state.orchestrator.list_cancelled().map_err(InternalError::Internal)?;
    Ok(Json(cancelled))
}

/// `cancel(event)` (§6).
async fn cancel(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(event): Json<CancelledEvent>,
) -> Result<StatusCode, InternalError> {
    state.orchestrator.cancel(event).map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `restore(id)` (§6).
async fn restore(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(request): Json<EventIdRequest>,
) -> Result<Json<ChangedResponse>, InternalError> {
    let changed = state.orchestrator.restore(&request.id).map_err(InternalError::Internal)?;
    Ok(Json(ChangedResponse { changed }))
}

async fn get_mapping(_token: DashboardToken, State(state): State<ApiState>) -> Result<Json<Mapping>, InternalError> {
    let mapping = state.orchestrator.get_mapping().map_err(InternalError::Internal)?;
    Ok(Json(mapping))
}

/// §9: "an explicit validator in front of every write" — a rejected mapping
/// never reaches the file, and the reasons come back as structured errors
/// rather than a free-text message.
async fn put_mapping(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(mapping): Json<Mapping>,
) -> Result<StatusCode, InternalError> {
    let problems = state.orchestrator.save_mapping(&mapping).map_err(InternalError::Internal)?;
    if problems.is_empty() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(InternalError::Validation(problems))
    }
}

async fn get_office_hours(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<OfficeHours>, InternalError> {
    let office_hours = state.orchestrator.get_office_hours().map_err(InternalError::Internal)?;
    Ok(Json(office_hours))
}

async fn put_office_hours(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(office_hours): Json<OfficeHours>,
) -> Result<StatusCode, InternalError> {
    state.orchestrator.save_office_hours(&office_hours).map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_overrides(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<Overrides>, InternalError> {
    let overrides = state.orchestrator.get_overrides().map_err(InternalError::Internal)?;
    Ok(Json(overrides))
}

async fn put_overrides(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(overrides): Json<Overrides>,
) -> Result<StatusCode, InternalError> {
    state.orchestrator.save_overrides(&overrides).map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_safe_hours(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<SafeHours>, InternalError> {
    let safe_hours = state.orchestrator.get_safe_hours().map_err(InternalError::Internal)?;
    Ok(Json(safe_hours))
}

async fn put_safe_hours(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(safe_hours): Json<SafeHours>,
) -> Result<StatusCode, InternalError> {
    state.orchestrator.save_safe_hours(&safe_hours).map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_approved_names(
    _token: DashboardToken,
    State(state): State<ApiState>,
) -> Result<Json<ApprovedNames>, InternalError> {
    let approved = state.orchestrator.get_approved_names().map_err(InternalError::Internal)?;
    Ok(Json(approved))
}

async fn put_approved_names(
    _token: DashboardToken,
    State(state): State<ApiState>,
    Json(approved): Json<ApprovedNames>,
) -> Result<StatusCode, InternalError> {
    state.orchestrator.save_approved_names(&approved).map_err(InternalError::Internal)?;
    Ok(StatusCode::NO_CONTENT)
}
