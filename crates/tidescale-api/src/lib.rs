//! tidescale-api — REST API for tidescale.
//!
//! Provides axum route handlers for managing scheduled autoscalers and
//! their schedules, and for reading the managed scalers. Every mutation
//! sends the affected autoscaler's key to the controller.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/autoscalers` | List scheduled autoscalers |
//! | POST | `/api/v1/autoscalers` | Create or replace one |
//! | GET | `/api/v1/autoscalers/:ns/:name` | Get one (with status) |
//! | DELETE | `/api/v1/autoscalers/:ns/:name` | Delete one (cascades) |
//! | GET | `/api/v1/autoscalers/:ns/:name/schedules` | List its schedules |
//! | POST | `/api/v1/autoscalers/:ns/:name/schedules` | Add or replace a schedule |
//! | DELETE | `/api/v1/autoscalers/:ns/:name/schedules/:schedule` | Delete a schedule |
//! | GET | `/api/v1/autoscalers/:ns/:name/scaler` | Read the managed scaler |
//! | GET | `/api/v1/autoscalers/:ns/:name/active` | Evaluate the active window |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use axum::Router;
use axum::routing::{delete, get};
use tidescale_reconcile::TriggerSender;
use tidescale_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub triggers: TriggerSender,
}

/// Build the complete API router.
pub fn build_router(store: StateStore, triggers: TriggerSender) -> Router {
    let api_state = ApiState { store, triggers };

    let api_routes = Router::new()
        .route(
            "/autoscalers",
            get(handlers::list_autoscalers).post(handlers::put_autoscaler),
        )
        .route(
            "/autoscalers/{ns}/{name}",
            get(handlers::get_autoscaler).delete(handlers::delete_autoscaler),
        )
        .route(
            "/autoscalers/{ns}/{name}/schedules",
            get(handlers::list_schedules).post(handlers::put_schedule),
        )
        .route(
            "/autoscalers/{ns}/{name}/schedules/{schedule}",
            delete(handlers::delete_schedule),
        )
        .route("/autoscalers/{ns}/{name}/scaler", get(handlers::get_scaler))
        .route("/autoscalers/{ns}/{name}/active", get(handlers::get_active))
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
