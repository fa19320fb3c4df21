use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::api::rest::extract::AppQuery;
use crate::api::rest::orders::OrderListQuery;
use crate::engine::performance::{PartnerAvailability, PerformanceMetrics, availability, performance};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/performance", get(order_performance))
        .route("/dashboard/availability", get(partner_availability))
}

async fn order_performance(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> Result<Json<PerformanceMetrics>, AppError> {
    let filter = query.into_filter()?;

    let orders = state.store.list_orders();
    let summary = performance(orders.iter().filter(|order| filter.matches(order)));

    Ok(Json(summary))
}

async fn partner_availability(State(state): State<Arc<AppState>>) -> Json<PartnerAvailability> {
    let partners = state.store.list_partners();
    Json(availability(&partners, state.max_partner_load))
}
