use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::dispatch::DispatchPolicy;
use crate::core::model::{Alert, AlertState, AlertSummary};
use crate::core::registry::{AlertRegistry, RegistryError};

/// Shared between the HTTP handlers and the ingestion task. Both mutexes are
/// held only for short, non-awaiting critical sections; when a transition
/// needs the policy as well, the registry lock is always taken first.
pub struct AppState {
    pub registry: Mutex<AlertRegistry>,
    pub policy: Mutex<DispatchPolicy>,
}

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct ListQuery {
    state: Option<String>,
}

#[derive(Deserialize)]
pub struct SingleQuery {
    id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct ManualModeBody {
    pub manual_mode: bool,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub id: Uuid,
    pub from_state: String,
    pub to_state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub success: bool,
}

fn summary_map<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> HashMap<String, AlertSummary> {
    alerts
        .into_iter()
        .map(|alert| (alert.id.to_string(), alert.summary()))
        .collect()
}

/// `GET /list?state=S`. An absent or empty state value is reserved and
/// returns the empty map (legacy behavior, kept on purpose); an unknown
/// state string is a bad request.
pub async fn list_by_state(
    State(app): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<HashMap<String, AlertSummary>>, ApiError> {
    let state = match query.state.as_deref() {
        None | Some("") => return Ok(Json(HashMap::new())),
        Some(raw) => AlertState::parse(raw)
            .ok_or((StatusCode::BAD_REQUEST, format!("unknown state {raw:?}")))?,
    };
    let registry = app.registry.lock().unwrap();
    Ok(Json(summary_map(registry.list_by_state(state))))
}

pub async fn single(
    State(app): State<Arc<AppState>>,
    Query(query): Query<SingleQuery>,
) -> Result<Json<AlertSummary>, ApiError> {
    let registry = app.registry.lock().unwrap();
    registry
        .get(query.id)
        .map(|alert| Json(alert.summary()))
        .ok_or((StatusCode::NOT_FOUND, format!("no alert with id {}", query.id)))
}

pub async fn all(State(app): State<Arc<AppState>>) -> Json<HashMap<String, AlertSummary>> {
    let registry = app.registry.lock().unwrap();
    Json(summary_map(registry.list_all()))
}

pub async fn get_manual_mode(State(app): State<Arc<AppState>>) -> Json<ManualModeBody> {
    let manual_mode = app.policy.lock().unwrap().manual_mode();
    Json(ManualModeBody { manual_mode })
}

pub async fn set_manual_mode(
    State(app): State<Arc<AppState>>,
    Json(body): Json<ManualModeBody>,
) -> Json<ManualModeBody> {
    app.policy.lock().unwrap().set_manual_mode(body.manual_mode);
    Json(body)
}

/// `POST /transition`. A state mismatch is an expected outcome and comes
/// back as `success: false`; an unknown id or an edge outside the state
/// table is an error. Releasing an alert from manual triage hands it to the
/// dispatch policy for notification.
pub async fn transition(
    State(app): State<Arc<AppState>>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let parse = |raw: &str| {
        AlertState::parse(raw).ok_or((StatusCode::BAD_REQUEST, format!("unknown state {raw:?}")))
    };
    let from = parse(&request.from_state)?;
    let to = parse(&request.to_state)?;

    info!("transition request {} ({:?} -> {:?})", request.id, from, to);

    let mut registry = app.registry.lock().unwrap();
    match registry.transition(request.id, from, to) {
        Ok(Some(alert)) => {
            if from == AlertState::ManualTriage && to == AlertState::PendingAcknowledgment {
                app.policy.lock().unwrap().on_manual_release(alert);
            }
            Ok(Json(TransitionResponse { success: true }))
        }
        Ok(None) => Ok(Json(TransitionResponse { success: false })),
        Err(err @ RegistryError::NotFound(_)) => Err((StatusCode::NOT_FOUND, err.to_string())),
        Err(err) => Err((StatusCode::BAD_REQUEST, err.to_string())),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/list", get(list_by_state))
        .route("/single", get(single))
        .route("/all", get(all))
        .route("/manual_mode", get(get_manual_mode).post(set_manual_mode))
        .route("/transition", post(transition))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, port: u16) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("query/command interface listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
