use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};

use crate::engine::aggregation::refresh_metrics;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::metrics::AssignmentMetrics;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assignments", get(list_assignments))
        .route("/assignments/run", post(run_metrics))
        .route("/assignments/metrics", get(get_metrics))
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    Json(state.store.list_assignments())
}

async fn run_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AssignmentMetrics>, AppError> {
    let metrics = refresh_metrics(state).await?;
    Ok(Json(metrics))
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AssignmentMetrics>, AppError> {
    let metrics = state.store.current_metrics().ok_or_else(|| {
        AppError::NotFound("assignment metrics have not been computed yet".to_string())
    })?;

    Ok(Json(metrics))
}
