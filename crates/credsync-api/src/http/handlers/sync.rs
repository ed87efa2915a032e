//! Sync scheduler endpoint handlers.
//!
//! Read-only status views plus per-job toggles. `start`/`stop` are aliases of
//! `enable`/`disable`; `trigger` asks for a run on the next dispatcher wake.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use credsync_types::job::{JobSnapshot, SchedulerTotals};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub started: bool,
    pub totals: SchedulerTotals,
    pub jobs: BTreeMap<String, JobSnapshot>,
}

/// GET /api/v1/sync/status - Aggregate totals plus every snapshot.
pub async fn sync_status(State(state): State<AppState>) -> Json<ApiResponse<SyncStatus>> {
    let start = Instant::now();
    let jobs = state.scheduler.status_all().await;
    let status = SyncStatus {
        started: state.scheduler.is_started(),
        totals: SchedulerTotals::from_snapshots(jobs.values()),
        jobs,
    };
    Json(ApiResponse::success(status, start).with_link("jobs", "/api/v1/sync/jobs"))
}

/// GET /api/v1/sync/jobs - Every job snapshot, ordered by name.
pub async fn list_jobs(State(state): State<AppState>) -> Json<ApiResponse<Vec<JobSnapshot>>> {
    let start = Instant::now();
    let jobs = state.scheduler.status_all().await.into_values().collect();
    Json(ApiResponse::success(jobs, start))
}

/// GET /api/v1/sync/jobs/{name}
pub async fn get_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<JobSnapshot>>, AppError> {
    let start = Instant::now();
    let snapshot = state.scheduler.status(&name).await?;
    Ok(Json(
        ApiResponse::success(snapshot, start)
            .with_link("self", &format!("/api/v1/sync/jobs/{name}")),
    ))
}

/// POST /api/v1/sync/jobs/{name}/enable (and `/start`)
pub async fn enable_job(
    state: State<AppState>,
    name: Path<String>,
) -> Result<Json<ApiResponse<JobSnapshot>>, AppError> {
    toggle(state, name, true).await
}

/// POST /api/v1/sync/jobs/{name}/disable (and `/stop`)
pub async fn disable_job(
    state: State<AppState>,
    name: Path<String>,
) -> Result<Json<ApiResponse<JobSnapshot>>, AppError> {
    toggle(state, name, false).await
}

/// POST /api/v1/sync/jobs/{name}/trigger - Run on the next dispatcher wake.
pub async fn trigger_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<JobSnapshot>>, AppError> {
    let start = Instant::now();
    state.scheduler.trigger(&name).await?;
    let snapshot = state.scheduler.status(&name).await?;
    Ok(Json(ApiResponse::success(snapshot, start)))
}

async fn toggle(
    State(state): State<AppState>,
    Path(name): Path<String>,
    enabled: bool,
) -> Result<Json<ApiResponse<JobSnapshot>>, AppError> {
    let start = Instant::now();
    state.scheduler.set_enabled(&name, enabled).await?;
    let snapshot = state.scheduler.status(&name).await?;
    Ok(Json(ApiResponse::success(snapshot, start)))
}
