use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::extract::{AppJson, AppPath, AppQuery};
use crate::api::rest::validation::{
    require_email, require_non_blank, require_phone, require_time_of_day,
};
use crate::error::AppError;
use crate::models::partner::{DeliveryPartner, PartnerMetrics, PartnerStatus, Shift};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/partners", get(list_partners).post(create_partner))
        .route(
            "/partners/:id",
            get(get_partner).put(update_partner).delete(delete_partner),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub status: PartnerStatus,
    #[serde(default)]
    pub current_load: u32,
    pub areas: Vec<String>,
    pub shift: Shift,
    #[serde(default)]
    pub metrics: PartnerMetrics,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartnerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<PartnerStatus>,
    pub current_load: Option<u32>,
    pub areas: Option<Vec<String>>,
    pub shift: Option<Shift>,
    pub metrics: Option<PartnerMetrics>,
}

impl UpdatePartnerRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.status.is_none()
            && self.current_load.is_none()
            && self.areas.is_none()
            && self.shift.is_none()
            && self.metrics.is_none()
    }
}

#[derive(Deserialize, Default)]
pub struct PartnerListQuery {
    #[serde(default)]
    pub assignable: bool,
}

fn validate_areas(areas: &[String]) -> Result<(), AppError> {
    if areas.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one area is required".to_string(),
        ));
    }
    areas
        .iter()
        .try_for_each(|area| require_non_blank("area", area))
}

fn validate_shift(shift: &Shift) -> Result<(), AppError> {
    require_time_of_day("shift.start", &shift.start)?;
    require_time_of_day("shift.end", &shift.end)
}

fn validate_metrics(metrics: &PartnerMetrics) -> Result<(), AppError> {
    if !(0.0..=5.0).contains(&metrics.rating) {
        return Err(AppError::InvalidInput(
            "rating must be between 0 and 5".to_string(),
        ));
    }
    Ok(())
}

fn validate_load(load: u32, max_load: u32) -> Result<(), AppError> {
    if load > max_load {
        return Err(AppError::InvalidInput(format!(
            "currentLoad cannot exceed {max_load}"
        )));
    }
    Ok(())
}

async fn create_partner(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreatePartnerRequest>,
) -> Result<(StatusCode, Json<DeliveryPartner>), AppError> {
    require_non_blank("name", &payload.name)?;
    require_email(&payload.email)?;
    require_phone("phone", &payload.phone)?;
    validate_areas(&payload.areas)?;
    validate_shift(&payload.shift)?;
    validate_metrics(&payload.metrics)?;
    validate_load(payload.current_load, state.max_partner_load)?;

    let _tx = state.store.begin().await?;

    if state.store.email_taken(&payload.email, None) {
        return Err(AppError::Conflict(format!(
            "partner already exists with email {}",
            payload.email
        )));
    }

    let now = Utc::now();
    let partner = DeliveryPartner {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: payload.email,
        phone: payload.phone,
        status: payload.status,
        current_load: payload.current_load,
        areas: payload.areas,
        shift: payload.shift,
        metrics: payload.metrics,
        created_at: now,
        updated_at: now,
    };

    state.store.partners.insert(partner.id, partner.clone());
    state
        .metrics
        .record_partner_load(&partner.id.to_string(), partner.current_load);

    info!(partner_id = %partner.id, email = %partner.email, "partner registered");
    Ok((StatusCode::CREATED, Json(partner)))
}

async fn list_partners(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<PartnerListQuery>,
) -> Json<Vec<DeliveryPartner>> {
    let partners = state
        .store
        .list_partners()
        .into_iter()
        .filter(|partner| !query.assignable || partner.is_assignable(state.max_partner_load))
        .collect();

    Json(partners)
}

async fn get_partner(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DeliveryPartner>, AppError> {
    let partner = state
        .store
        .partner(&id)
        .ok_or_else(|| AppError::NotFound(format!("partner {} not found", id)))?;

    Ok(Json(partner))
}

async fn update_partner(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdatePartnerRequest>,
) -> Result<Json<DeliveryPartner>, AppError> {
    if payload.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one field is required".to_string(),
        ));
    }

    if let Some(name) = &payload.name {
        require_non_blank("name", name)?;
    }
    if let Some(email) = &payload.email {
        require_email(email)?;
    }
    if let Some(phone) = &payload.phone {
        require_phone("phone", phone)?;
    }
    if let Some(areas) = &payload.areas {
        validate_areas(areas)?;
    }
    if let Some(shift) = &payload.shift {
        validate_shift(shift)?;
    }
    if let Some(metrics) = &payload.metrics {
        validate_metrics(metrics)?;
    }
    if let Some(load) = payload.current_load {
        validate_load(load, state.max_partner_load)?;
    }

    let _tx = state.store.begin().await?;

    if let Some(email) = &payload.email {
        if state.store.email_taken(email, Some(id)) {
            return Err(AppError::Conflict(format!(
                "partner already exists with email {email}"
            )));
        }
    }

    let mut partner = state
        .store
        .partners
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("partner {} not found", id)))?;

    if let Some(name) = payload.name {
        partner.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        partner.email = email;
    }
    if let Some(phone) = payload.phone {
        partner.phone = phone;
    }
    if let Some(status) = payload.status {
        partner.status = status;
    }
    if let Some(load) = payload.current_load {
        partner.current_load = load;
    }
    if let Some(areas) = payload.areas {
        partner.areas = areas;
    }
    if let Some(shift) = payload.shift {
        partner.shift = shift;
    }
    if let Some(metrics) = payload.metrics {
        partner.metrics = metrics;
    }
    partner.updated_at = Utc::now();

    state
        .metrics
        .record_partner_load(&id.to_string(), partner.current_load);

    info!(partner_id = %id, "partner updated");
    Ok(Json(partner.clone()))
}

async fn delete_partner(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let _tx = state.store.begin().await?;

    let (_, partner) = state
        .store
        .partners
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("partner {} not found", id)))?;

    state.metrics.forget_partner(&id.to_string());

    info!(
        partner_id = %id,
        open_orders = partner.current_load,
        "partner deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
