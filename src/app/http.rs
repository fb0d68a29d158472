// ==========================================
// Space Stowage - HTTP layer
// ==========================================
// Envelope: { success: true, ...payload }
//           { success: false, code, message, details? }
// Every call runs on the blocking pool (std locks + SQLite) under a
// PerfGuard.
// ==========================================

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::dto::{
    AddContainersRequest, AddItemsRequest, CompleteUndockingRequest, ConfirmPlacementRequest,
    PlaceRequest, RetrieveRequest, ReturnPlanRequest, SearchQuery, SimulateRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::app::state::AppState;
use crate::domain::action_log::LogFilter;
use crate::domain::item::ItemDescriptor;
use crate::perf::PerfGuard;

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/placement", post(placement_recommend))
        .route("/api/placement/confirm", post(placement_confirm))
        .route("/api/search", get(search))
        .route("/api/retrieve", post(retrieve))
        .route("/api/place", post(place))
        .route("/api/waste/identify", get(waste_identify))
        .route("/api/waste/return-plan", post(waste_return_plan))
        .route("/api/waste/complete-undocking", post(waste_complete_undocking))
        .route("/api/simulate/day", post(simulate_day))
        .route("/api/logs", get(logs))
        .route("/api/logs/recent", get(logs_recent))
        .route("/api/containers", get(list_containers).post(add_containers))
        .route("/api/containers/:container_id/arrangement", get(arrangement))
        .route("/api/items", get(list_items).post(add_items))
        .route("/api/date", get(current_date))
        .with_state(state)
}

// ==========================================
// Envelope + error mapping
// ==========================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::ValidationError(_) | ApiError::InvalidRange(_) | ApiError::ItemNotStowed(_) => {
            StatusCode::BAD_REQUEST
        }
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Overlap { .. }
        | ApiError::OutOfBounds { .. }
        | ApiError::NotReserved(_)
        | ApiError::Conflict(_) => StatusCode::CONFLICT,
        ApiError::NoCapacity { .. } | ApiError::Capacity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ApiError::DatabaseError(_) | ApiError::InternalError(_) | ApiError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if self.is_client_error() {
            tracing::info!(code = self.code(), error = %self, "request rejected");
        } else {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            success: false,
            code: self.code(),
            message: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Flatten an object payload next to `success`; other payloads go under `key`.
fn envelope<T: Serialize>(key: &str, payload: T) -> ApiResult<Response> {
    let value = serde_json::to_value(payload)
        .map_err(|e| ApiError::InternalError(format!("response serialization: {}", e)))?;
    let body = match value {
        Value::Object(mut map) => {
            map.insert("success".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        other => {
            let mut map = serde_json::Map::new();
            map.insert("success".to_string(), Value::Bool(true));
            map.insert(key.to_string(), other);
            Value::Object(map)
        }
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::ValidationError(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(v)| v)
        .map_err(|e| ApiError::ValidationError(e.body_text()))
}

async fn run_blocking<T, F>(op: &'static str, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _perf = PerfGuard::new(op);
        f()
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("{} worker failed: {}", op, e)))?
}

// ==========================================
// Handlers
// ==========================================

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok", "version": crate::VERSION }))
}

async fn placement_recommend(
    State(state): State<SharedState>,
    payload: Result<Json<ItemDescriptor>, JsonRejection>,
) -> ApiResult<Response> {
    let descriptor = body(payload)?;
    let api = state.placement_api.clone();
    let out = run_blocking("placement.recommend", move || api.recommend(descriptor)).await?;
    envelope("placement", out)
}

async fn placement_confirm(
    State(state): State<SharedState>,
    payload: Result<Json<ConfirmPlacementRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.placement_api.clone();
    let out = run_blocking("placement.confirm", move || api.confirm(request)).await?;
    envelope("placement", out)
}

async fn search(
    State(state): State<SharedState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let q = query(params)?;
    let api = state.retrieval_api.clone();
    let out = run_blocking("retrieval.search", move || api.search(q)).await?;
    envelope("search", out)
}

async fn retrieve(
    State(state): State<SharedState>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.retrieval_api.clone();
    let out = run_blocking("retrieval.retrieve", move || api.retrieve(request)).await?;
    envelope("retrieval", out)
}

async fn place(
    State(state): State<SharedState>,
    payload: Result<Json<PlaceRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.retrieval_api.clone();
    let out = run_blocking("retrieval.place", move || api.place(request)).await?;
    envelope("placement", out)
}

async fn waste_identify(State(state): State<SharedState>) -> ApiResult<Response> {
    let api = state.waste_api.clone();
    let out = run_blocking("waste.identify", move || api.identify()).await?;
    envelope("waste", out)
}

async fn waste_return_plan(
    State(state): State<SharedState>,
    payload: Result<Json<ReturnPlanRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.waste_api.clone();
    let out = run_blocking("waste.return_plan", move || api.return_plan(request)).await?;
    envelope("returnPlan", out)
}

async fn waste_complete_undocking(
    State(state): State<SharedState>,
    payload: Result<Json<CompleteUndockingRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.waste_api.clone();
    let out = run_blocking("waste.complete_undocking", move || {
        api.complete_undocking(request)
    })
    .await?;
    envelope("undocking", out)
}

async fn simulate_day(
    State(state): State<SharedState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.simulation_api.clone();
    let out = run_blocking("simulation.simulate", move || api.simulate(request)).await?;
    envelope("simulation", out)
}

async fn logs(
    State(state): State<SharedState>,
    params: Result<Query<LogFilter>, QueryRejection>,
) -> ApiResult<Response> {
    let filter = query(params)?;
    let api = state.log_api.clone();
    let out = run_blocking("logs.query", move || api.query(filter)).await?;
    envelope("logs", out)
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    #[serde(default = "default_recent_limit")]
    limit: u32,
}

fn default_recent_limit() -> u32 {
    50
}

async fn logs_recent(
    State(state): State<SharedState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> ApiResult<Response> {
    let RecentParams { limit } = query(params)?;
    let api = state.log_api.clone();
    let out = run_blocking("logs.recent", move || api.recent(limit)).await?;
    envelope("logs", out)
}

async fn list_containers(State(state): State<SharedState>) -> ApiResult<Response> {
    let api = state.inventory_api.clone();
    let out = run_blocking("inventory.list_containers", move || api.list_containers()).await?;
    envelope("containers", out)
}

async fn add_containers(
    State(state): State<SharedState>,
    payload: Result<Json<AddContainersRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.inventory_api.clone();
    let out = run_blocking("inventory.add_containers", move || {
        api.add_containers(request.containers)
    })
    .await?;
    envelope("registered", out)
}

async fn arrangement(
    State(state): State<SharedState>,
    Path(container_id): Path<String>,
) -> ApiResult<Response> {
    let api = state.inventory_api.clone();
    let out = run_blocking("inventory.arrangement", move || api.arrangement(&container_id)).await?;
    envelope("arrangement", out)
}

async fn list_items(State(state): State<SharedState>) -> ApiResult<Response> {
    let api = state.inventory_api.clone();
    let out = run_blocking("inventory.list_items", move || api.list_items()).await?;
    envelope("items", out)
}

async fn add_items(
    State(state): State<SharedState>,
    payload: Result<Json<AddItemsRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = body(payload)?;
    let api = state.inventory_api.clone();
    let out = run_blocking("inventory.add_items", move || api.add_items(request.items)).await?;
    envelope("registered", out)
}

async fn current_date(State(state): State<SharedState>) -> ApiResult<Response> {
    let api = state.simulation_api.clone();
    let out = run_blocking("simulation.current_date", move || api.current_date()).await?;
    envelope("date", out)
}
