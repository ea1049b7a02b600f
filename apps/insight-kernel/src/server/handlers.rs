// [[RARO]]/apps/insight-kernel/src/server/handlers.rs
// Purpose: API Handlers. Thin wrappers over the run ledger and detectors.
// Architecture: API Layer
// Dependencies: Axum, Ledger

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::detect::{detect_chartable_data, detect_structured_data, ChartableData, StructuredData};
use crate::error::KernelError;
use crate::events::{EventKind, RunEvent};
use crate::filter::FilterOptions;
use crate::ledger::{RunLedger, RunManifest, RunSnapshot};
use crate::models::JobStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Insight Kernel is running".to_string(),
    })
}

pub async fn create_run(
    State(ledger): State<Arc<RunLedger>>,
    manifest: Option<Json<RunManifest>>,
) -> (StatusCode, Json<Value>) {
    let manifest = manifest.map(|Json(m)| m).unwrap_or_default();
    let run_id = ledger.create_run(manifest);
    (StatusCode::CREATED, Json(json!({ "run_id": run_id })))
}

pub async fn append_events(
    State(ledger): State<Arc<RunLedger>>,
    Path(run_id): Path<String>,
    Json(events): Json<Vec<RunEvent>>,
) -> Result<Json<Value>, KernelError> {
    let accepted = events.len();
    let total = ledger.append_events(&run_id, events)?;
    tracing::debug!("Run {}: accepted {} events ({} total)", run_id, accepted, total);

    Ok(Json(json!({
        "accepted": accepted,
        "total": total
    })))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    status: JobStatus,
    #[serde(default)]
    error: Option<String>,
}

pub async fn set_status(
    State(ledger): State<Arc<RunLedger>>,
    Path(run_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<StatusCode, KernelError> {
    ledger.set_status(&run_id, update.status, update.error)?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct SnapshotQuery {
    agent: Option<String>,
    /// Comma-separated event kinds, e.g. `tool_call,tool_result`
    types: Option<String>,
    show_debug: Option<bool>,
    hide_llm_calls: Option<bool>,
    hide_phase_events: Option<bool>,
}

impl SnapshotQuery {
    fn into_options(self) -> Result<FilterOptions, KernelError> {
        let defaults = FilterOptions::default();

        let event_types = match self.types.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_kinds(raw)?),
        };

        Ok(FilterOptions {
            hide_phase_events: self.hide_phase_events.unwrap_or(defaults.hide_phase_events),
            selected_agent_name: self.agent.filter(|a| !a.trim().is_empty()),
            event_types,
            show_debug: self.show_debug.unwrap_or(defaults.show_debug),
            hide_llm_calls: self.hide_llm_calls.unwrap_or(defaults.hide_llm_calls),
        })
    }
}

fn parse_kinds(raw: &str) -> Result<Vec<EventKind>, KernelError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match EventKind::parse(part) {
            EventKind::Unrecognized(other) => Err(KernelError::InvalidInput(format!(
                "unknown event type '{}'",
                other
            ))),
            kind => Ok(kind),
        })
        .collect()
}

pub async fn get_snapshot(
    State(ledger): State<Arc<RunLedger>>,
    Path(run_id): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<RunSnapshot>, KernelError> {
    let options = query.into_options()?;
    ledger.snapshot(&run_id, &options).map(Json)
}

pub async fn delete_run(
    State(ledger): State<Arc<RunLedger>>,
    Path(run_id): Path<String>,
) -> Result<StatusCode, KernelError> {
    ledger.remove_run(&run_id)?;
    tracing::info!("Removed run {}", run_id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    payload: Value,
}

#[derive(Serialize)]
pub struct DetectResponse {
    chart: Option<ChartableData>,
    structured: Option<StructuredData>,
}

pub async fn detect_shape(Json(request): Json<DetectRequest>) -> Json<DetectResponse> {
    Json(DetectResponse {
        chart: detect_chartable_data(&request.payload),
        structured: detect_structured_data(&request.payload),
    })
}
