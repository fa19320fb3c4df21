use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::extract::{AppJson, AppPath, AppQuery};
use crate::api::rest::validation::{
    parse_record_id, require_non_blank, require_positive, require_time_of_day,
};
use crate::engine::assignment::assign_partner;
use crate::engine::performance::OrderFilter;
use crate::engine::transition::transition_status;
use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::models::order::{Customer, Order, OrderItem, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/assign", post(assign_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer: Customer,
    pub area: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub scheduled_for: String,
}

impl CreateOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_blank("customer.name", &self.customer.name)?;
        require_non_blank("customer.phone", &self.customer.phone)?;
        require_non_blank("customer.address", &self.customer.address)?;
        require_non_blank("area", &self.area)?;

        if self.items.is_empty() {
            return Err(AppError::InvalidInput(
                "order needs at least one item".to_string(),
            ));
        }
        for item in &self.items {
            require_non_blank("item name", &item.name)?;
            if item.quantity == 0 {
                return Err(AppError::InvalidInput(format!(
                    "quantity of '{}' must be > 0",
                    item.name
                )));
            }
            require_positive("item price", item.price)?;
        }

        require_positive("totalAmount", self.total_amount)?;
        require_time_of_day("scheduledFor", &self.scheduled_for)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub area: Option<String>,
    pub date: Option<String>,
}

impl OrderListQuery {
    pub fn into_filter(self) -> Result<OrderFilter, AppError> {
        let statuses = split_list(self.status.as_deref())
            .map(|raw| {
                raw.parse::<OrderStatus>()
                    .map_err(AppError::InvalidStatus)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let areas = split_list(self.area.as_deref()).map(str::to_string).collect();

        let date = self
            .date
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    AppError::InvalidInput(format!("date '{raw}' must be YYYY-MM-DD"))
                })
            })
            .transpose()?;

        Ok(OrderFilter {
            statuses,
            areas,
            date,
        })
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub order_id: Option<String>,
    pub partner_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    pub reason: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    payload.validate()?;

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        order_number: state.store.next_order_number(now),
        customer: payload.customer,
        area: payload.area.trim().to_string(),
        items: payload.items,
        status: OrderStatus::Pending,
        scheduled_for: payload.scheduled_for,
        assigned_to: None,
        total_amount: payload.total_amount,
        created_at: now,
        updated_at: now,
    };

    state.store.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();

    info!(order_id = %order.id, order_number = %order.order_number, area = %order.area, "order created");
    state.publish(DispatchEvent::OrderCreated {
        order: order.clone(),
    });

    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let filter = query.into_filter()?;

    let orders = state
        .store
        .list_orders()
        .into_iter()
        .filter(|order| filter.matches(order))
        .collect();

    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .order(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order))
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order_id = parse_record_id("orderId", payload.order_id.as_deref())?;
    let partner_id = parse_record_id("partnerId", payload.partner_id.as_deref())?;

    let order = assign_partner(state, order_id, partner_id).await?;
    Ok(Json(order))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = transition_status(state, id, &payload.status, payload.reason).await?;
    Ok(Json(order))
}
