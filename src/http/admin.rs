//! Admin HTTP surface: raise/clear ingest, active/history reads, capacity
//! configuration, and definition registry CRUD. Missing mandatory fields
//! on raise/clear are a logged no-op with a 200; malformed JSON is a 400.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::core::AlarmManager;
use crate::definitions::UpsertReport;
use crate::error::AppJson;
use crate::model::{AlarmDefinition, RawAlarmMessage};

pub fn router(manager: Arc<AlarmManager>) -> Router {
    Router::new()
        .route("/ric/v1/alarms", post(raise_or_clear).delete(clear))
        .route("/ric/v1/alarms/active", get(get_active))
        .route("/ric/v1/alarms/history", get(get_history))
        .route("/ric/v1/alarms/config", post(set_config).get(get_config))
        .route("/ric/v1/alarms/define", post(define).get(list_definitions))
        .route("/ric/v1/alarms/define/:id", get(get_definition).delete(delete_definition))
        .route("/metrics", get(metrics))
        .with_state(manager)
}

async fn metrics() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], crate::metrics::render())
}

/// Accepts the message regardless of `AlarmAction`; RAISE/CLEAR/RERAISE/
/// CLEARALL are all routed through the same state engine entry point.
async fn raise_or_clear(State(manager): State<Arc<AlarmManager>>, AppJson(raw): AppJson<RawAlarmMessage>) -> impl IntoResponse {
    ingest(manager, raw).await
}

async fn clear(State(manager): State<Arc<AlarmManager>>, AppJson(raw): AppJson<RawAlarmMessage>) -> impl IntoResponse {
    ingest(manager, raw).await
}

async fn ingest(manager: Arc<AlarmManager>, raw: RawAlarmMessage) -> impl IntoResponse {
    match raw.into_message() {
        Ok(message) => {
            manager.handle_message(message).await;
            StatusCode::OK.into_response()
        }
        Err(_) => {
            warn!("alarm message missing mandatory fields, dropping");
            crate::metrics::ALARMS_DROPPED_TOTAL.inc();
            StatusCode::OK.into_response()
        }
    }
}

async fn get_active(State(manager): State<Arc<AlarmManager>>) -> impl IntoResponse {
    Json(manager.active_alarms().await)
}

async fn get_history(State(manager): State<Arc<AlarmManager>>) -> impl IntoResponse {
    Json(manager.alarm_history().await)
}

#[derive(Debug, Deserialize, Serialize)]
struct CapacityConfig {
    #[serde(rename = "maxactivealarms")]
    max_active_alarms: usize,
    #[serde(rename = "maxalarmhistory")]
    max_alarm_history: usize,
}

async fn set_config(State(manager): State<Arc<AlarmManager>>, AppJson(body): AppJson<CapacityConfig>) -> impl IntoResponse {
    manager.set_capacities(body.max_active_alarms, body.max_alarm_history).await;
    StatusCode::OK.into_response()
}

async fn get_config(State(manager): State<Arc<AlarmManager>>) -> impl IntoResponse {
    let (max_active_alarms, max_alarm_history) = manager.capacities().await;
    Json(CapacityConfig { max_active_alarms, max_alarm_history })
}

#[derive(Debug, Deserialize)]
struct DefineRequest {
    #[serde(rename = "alarmdefinitions")]
    alarm_definitions: Vec<AlarmDefinition>,
}

async fn define(State(manager): State<Arc<AlarmManager>>, AppJson(body): AppJson<DefineRequest>) -> impl IntoResponse {
    let report: UpsertReport = manager.define(body.alarm_definitions).await;
    Json(json!({ "inserted": report.inserted, "rejected": report.rejected })).into_response()
}

async fn list_definitions(State(manager): State<Arc<AlarmManager>>) -> impl IntoResponse {
    Json(manager.list_definitions().await)
}

async fn get_definition(State(manager): State<Arc<AlarmManager>>, Path(id): Path<i32>) -> impl IntoResponse {
    match manager.get_definition(id).await {
        Some(def) => Json(def).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": format!("alarm definition {} not found", id) }))).into_response(),
    }
}

async fn delete_definition(State(manager): State<Arc<AlarmManager>>, Path(id): Path<i32>) -> impl IntoResponse {
    match manager.delete_definition(id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
