//! REST API handlers.
//!
//! Each handler reads/writes via `StateStore`, notifies the controller
//! after every mutation, and returns JSON responses.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tidescale_core::{AutoscalerStatus, ObjectKey, ScalingSpec};
use tidescale_schedule::{Window, select_active};
use tidescale_state::*;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn internal(e: StateError) -> axum::response::Response {
    error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
}

fn epoch_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn notify(state: &ApiState, key: ObjectKey) {
    if state.triggers.send(key).is_err() {
        debug!("controller not listening, change notification dropped");
    }
}

// ── Scheduled autoscalers ──────────────────────────────────────

fn default_namespace() -> String {
    "default".to_string()
}

/// Body for creating or replacing a scheduled autoscaler.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoscalerRequest {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    pub baseline: ScalingSpec,
}

/// GET /api/v1/autoscalers
pub async fn list_autoscalers(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_autoscalers() {
        Ok(autoscalers) => ApiResponse::ok(autoscalers).into_response(),
        Err(e) => internal(e),
    }
}

/// POST /api/v1/autoscalers
///
/// Replacing an existing autoscaler keeps its status and creation time.
pub async fn put_autoscaler(
    State(state): State<ApiState>,
    Json(req): Json<AutoscalerRequest>,
) -> impl IntoResponse {
    if req.name.is_empty() || req.name.contains('/') || req.namespace.contains('/') {
        return error_response("invalid autoscaler name", StatusCode::BAD_REQUEST).into_response();
    }

    let key = ObjectKey::new(&req.namespace, &req.name);
    let existing = match state.store.get_autoscaler(&key) {
        Ok(existing) => existing,
        Err(e) => return internal(e),
    };

    let now = epoch_secs();
    let (status, created_at, code) = match existing {
        Some(prev) => (prev.status, prev.created_at, StatusCode::OK),
        None => (AutoscalerStatus::default(), now, StatusCode::CREATED),
    };
    let autoscaler = ScheduledAutoscaler {
        namespace: req.namespace,
        name: req.name,
        spec: ScheduledAutoscalerSpec {
            baseline: req.baseline,
        },
        status,
        created_at,
        updated_at: now,
    };

    match state.store.put_autoscaler(&autoscaler) {
        Ok(()) => {
            info!(autoscaler = %key, "autoscaler stored");
            notify(&state, key);
            (code, ApiResponse::ok(autoscaler)).into_response()
        }
        Err(e) => internal(e),
    }
}

/// GET /api/v1/autoscalers/:ns/:name
pub async fn get_autoscaler(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_autoscaler(&ObjectKey::new(ns, name)) {
        Ok(Some(autoscaler)) => ApiResponse::ok(autoscaler).into_response(),
        Ok(None) => error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

/// DELETE /api/v1/autoscalers/:ns/:name
///
/// Cascades to owned schedules and the managed scaler.
pub async fn delete_autoscaler(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = ObjectKey::new(ns, name);
    match state.store.delete_autoscaler(&key) {
        Ok(true) => {
            info!(autoscaler = %key, "autoscaler deleted");
            notify(&state, key);
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

// ── Schedules ──────────────────────────────────────────────────

/// GET /api/v1/autoscalers/:ns/:name/schedules
pub async fn list_schedules(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.list_schedules_for(&ObjectKey::new(ns, name)) {
        Ok(schedules) => ApiResponse::ok(schedules).into_response(),
        Err(e) => internal(e),
    }
}

/// POST /api/v1/autoscalers/:ns/:name/schedules
///
/// Windows are validated here so operators see malformed values at
/// write time; the controller still re-validates on every pass.
pub async fn put_schedule(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
    Json(window): Json<Window>,
) -> impl IntoResponse {
    let owner = ObjectKey::new(ns, name);
    match state.store.get_autoscaler(&owner) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response();
        }
        Err(e) => return internal(e),
    }

    if window.name.is_empty() || window.name.contains('/') {
        return error_response("invalid schedule name", StatusCode::BAD_REQUEST).into_response();
    }
    if let Err(e) = window.bounds() {
        return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
    }

    let created_at = match state.store.get_schedule(&owner, &window.name) {
        Ok(Some(prev)) => prev.created_at,
        Ok(None) => epoch_secs(),
        Err(e) => return internal(e),
    };
    let schedule = Schedule {
        namespace: owner.namespace.clone(),
        owner: owner.name.clone(),
        window,
        created_at,
    };

    match state.store.put_schedule(&schedule) {
        Ok(()) => {
            info!(autoscaler = %owner, schedule = %schedule.window.name, "schedule stored");
            notify(&state, owner);
            (StatusCode::CREATED, ApiResponse::ok(schedule)).into_response()
        }
        Err(e) => internal(e),
    }
}

/// DELETE /api/v1/autoscalers/:ns/:name/schedules/:schedule
pub async fn delete_schedule(
    State(state): State<ApiState>,
    Path((ns, name, schedule)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let owner = ObjectKey::new(ns, name);
    match state.store.delete_schedule(&owner, &schedule) {
        Ok(true) => {
            info!(autoscaler = %owner, %schedule, "schedule deleted");
            notify(&state, owner);
            ApiResponse::ok("deleted").into_response()
        }
        Ok(false) => error_response("schedule not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

// ── Scaler ─────────────────────────────────────────────────────

/// GET /api/v1/autoscalers/:ns/:name/scaler
pub async fn get_scaler(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.store.get_scaler(&ObjectKey::new(ns, name)) {
        Ok(Some(scaler)) => ApiResponse::ok(scaler).into_response(),
        Ok(None) => error_response("scaler not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => internal(e),
    }
}

// ── Active window ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    /// Evaluate at this instant instead of now (RFC 3339).
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ActiveWindow {
    pub evaluated_at: DateTime<Utc>,
    pub active: Option<Window>,
}

/// GET /api/v1/autoscalers/:ns/:name/active
pub async fn get_active(
    State(state): State<ApiState>,
    Path((ns, name)): Path<(String, String)>,
    Query(query): Query<ActiveQuery>,
) -> impl IntoResponse {
    let owner = ObjectKey::new(ns, name);
    match state.store.get_autoscaler(&owner) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response("autoscaler not found", StatusCode::NOT_FOUND).into_response();
        }
        Err(e) => return internal(e),
    }

    let windows: Vec<Window> = match state.store.list_schedules_for(&owner) {
        Ok(schedules) => schedules.into_iter().map(|s| s.window).collect(),
        Err(e) => return internal(e),
    };

    let now = query.at.unwrap_or_else(Utc::now);
    match select_active(now, &windows) {
        Ok(active) => ApiResponse::ok(ActiveWindow {
            evaluated_at: now,
            active: active.cloned(),
        })
        .into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::UNPROCESSABLE_ENTITY).into_response(),
    }
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tidescale_core::{MetricSpec, ScaleTargetRef};
    use tidescale_reconcile::{TriggerReceiver, trigger_channel};
    use tidescale_schedule::DaySpec;

    fn test_state() -> (ApiState, TriggerReceiver) {
        let store = StateStore::open_in_memory().unwrap();
        let (triggers, rx) = trigger_channel();
        (ApiState { store, triggers }, rx)
    }

    fn baseline() -> ScalingSpec {
        ScalingSpec {
            scale_target_ref: ScaleTargetRef {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                name: "web".to_string(),
            },
            min_replicas: Some(1),
            max_replicas: 10,
            metrics: vec![MetricSpec::resource_utilization("cpu", 80)],
            behavior: None,
        }
    }

    fn request(name: &str) -> AutoscalerRequest {
        AutoscalerRequest {
            namespace: "default".to_string(),
            name: name.to_string(),
            baseline: baseline(),
        }
    }

    fn window(name: &str, start: &str, end: &str) -> Window {
        Window {
            name: name.to_string(),
            start_day_of_week: DaySpec::Name("Monday".to_string()),
            start_time: start.to_string(),
            end_day_of_week: DaySpec::Name("Monday".to_string()),
            end_time: end.to_string(),
            utc_offset: None,
            min_replicas: None,
            max_replicas: Some(20),
            metrics: None,
        }
    }

    fn path(name: &str) -> Path<(String, String)> {
        Path(("default".to_string(), name.to_string()))
    }

    #[tokio::test]
    async fn list_autoscalers_empty() {
        let (state, _rx) = test_state();
        let resp = list_autoscalers(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_get_and_replace_autoscaler() {
        let (state, mut rx) = test_state();

        let resp = put_autoscaler(State(state.clone()), Json(request("web")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(rx.try_recv().unwrap(), ObjectKey::new("default", "web"));

        let resp = get_autoscaler(State(state.clone()), path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let mut req = request("web");
        req.baseline.max_replicas = 12;
        let resp = put_autoscaler(State(state.clone()), Json(req))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state
            .store
            .get_autoscaler(&ObjectKey::new("default", "web"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.spec.baseline.max_replicas, 12);
    }

    #[tokio::test]
    async fn reject_slash_in_name() {
        let (state, _rx) = test_state();
        let resp = put_autoscaler(State(state), Json(request("a/b")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_nonexistent_autoscaler() {
        let (state, _rx) = test_state();
        let resp = get_autoscaler(State(state), path("nope")).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn schedule_for_missing_parent_is_404() {
        let (state, _rx) = test_state();
        let resp = put_schedule(State(state), path("nope"), Json(window("peak", "09:00", "17:00")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_schedule_is_400() {
        let (state, _rx) = test_state();
        put_autoscaler(State(state.clone()), Json(request("web"))).await;

        let resp = put_schedule(State(state.clone()), path("web"), Json(window("bad", "25:99", "17:00")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = put_schedule(State(state.clone()), path("web"), Json(window("empty", "09:00", "09:00")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert!(
            state
                .store
                .list_schedules_for(&ObjectKey::new("default", "web"))
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn schedule_lifecycle_notifies_controller() {
        let (state, mut rx) = test_state();
        put_autoscaler(State(state.clone()), Json(request("web"))).await;
        rx.try_recv().unwrap();

        let resp = put_schedule(State(state.clone()), path("web"), Json(window("peak", "09:00", "17:00")))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(rx.try_recv().unwrap(), ObjectKey::new("default", "web"));

        let resp = delete_schedule(
            State(state.clone()),
            Path(("default".to_string(), "web".to_string(), "peak".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(rx.try_recv().unwrap(), ObjectKey::new("default", "web"));

        let resp = delete_schedule(
            State(state),
            Path(("default".to_string(), "web".to_string(), "peak".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn active_reports_selected_window() {
        let (state, _rx) = test_state();
        put_autoscaler(State(state.clone()), Json(request("web"))).await;
        put_schedule(State(state.clone()), path("web"), Json(window("peak", "09:00", "17:00"))).await;

        // 2024-01-01 is a Monday.
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let resp = get_active(State(state.clone()), path("web"), Query(ActiveQuery { at: Some(at) }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_active(State(state), path("nope"), Query(ActiveQuery::default()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_cascades() {
        let (state, _rx) = test_state();
        put_autoscaler(State(state.clone()), Json(request("web"))).await;
        put_schedule(State(state.clone()), path("web"), Json(window("peak", "09:00", "17:00"))).await;

        let resp = delete_autoscaler(State(state.clone()), path("web"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            state
                .store
                .list_schedules_for(&ObjectKey::new("default", "web"))
                .unwrap()
                .is_empty()
        );

        let resp = delete_autoscaler(State(state), path("web")).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_scaler_is_404() {
        let (state, _rx) = test_state();
        let resp = get_scaler(State(state), path("web")).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
