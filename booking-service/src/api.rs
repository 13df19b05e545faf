use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::*;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::lifecycle::BookingLifecycle;
use crate::models::{Booking, RestaurantTable};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BookingLifecycle>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    #[serde(flatten)]
    pub form: BookingForm,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub customer_id: Uuid,
    #[serde(flatten)]
    pub form: BookingForm,
}

#[derive(Debug, Deserialize)]
pub struct OwnerUpdateBookingRequest {
    pub owner_restaurant_ids: Vec<i32>,
    #[serde(flatten)]
    pub form: BookingForm,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub customer_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub owner_restaurant_ids: Option<Vec<i32>>,
    pub reason: String,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct ValidateVoucherRequest {
    pub code: String,
    pub restaurant_id: i32,
    pub order_amount: BigDecimal,
}

#[derive(Debug, Deserialize)]
pub struct AvailableTablesQuery {
    pub booking_time: DateTime<Utc>,
    pub guest_count: i32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/:id", get(get_booking).put(update_booking))
        .route("/bookings/:id/owner", put(update_booking_for_owner))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/bookings/:id/complete", post(complete_booking))
        .route("/bookings/:id/no-show", post(mark_no_show))
        .route("/bookings/:id/status", patch(update_status))
        .route("/customers/:customer_id/bookings", get(customer_bookings))
        .route("/restaurants/:restaurant_id/bookings", get(restaurant_bookings))
        .route(
            "/restaurants/:restaurant_id/available-tables",
            get(available_tables),
        )
        .route("/vouchers/validate", post(validate_voucher))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> ApiResult<Booking> {
    state
        .lifecycle
        .create(request.form, request.customer_id)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Booking> {
    state.lifecycle.find_booking(id).await.map(Json).map_err(error_reply)
}

async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBookingRequest>,
) -> ApiResult<Booking> {
    state
        .lifecycle
        .update(id, request.form, request.customer_id)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn update_booking_for_owner(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<OwnerUpdateBookingRequest>,
) -> ApiResult<Booking> {
    let restaurant_ids: HashSet<i32> = request.owner_restaurant_ids.into_iter().collect();
    state
        .lifecycle
        .update_for_restaurant_owner(id, request.form, restaurant_ids)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CancelBookingRequest>,
) -> ApiResult<Booking> {
    let actor = match (request.customer_id, request.owner_user_id) {
        (Some(customer_id), _) => CancelActor::Customer(customer_id),
        (None, Some(user_id)) => CancelActor::RestaurantOwner {
            user_id,
            restaurant_ids: request
                .owner_restaurant_ids
                .unwrap_or_default()
                .into_iter()
                .collect(),
        },
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "either customer_id or owner_user_id is required".to_string(),
                }),
            ));
        }
    };

    state
        .lifecycle
        .cancel(
            id,
            actor,
            request.reason,
            request.bank_code.unwrap_or_default(),
            request.account_number.unwrap_or_default(),
        )
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Booking> {
    state.lifecycle.confirm(id).await.map(Json).map_err(error_reply)
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Booking> {
    state.lifecycle.complete(id).await.map(Json).map_err(error_reply)
}

async fn mark_no_show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Booking> {
    state.lifecycle.mark_no_show(id).await.map(Json).map_err(error_reply)
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Booking> {
    state
        .lifecycle
        .update_status(id, request.status)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn customer_bookings(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Vec<Booking>> {
    state
        .lifecycle
        .bookings_for_customer(customer_id)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn restaurant_bookings(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
) -> ApiResult<Vec<Booking>> {
    state
        .lifecycle
        .bookings_for_restaurant(restaurant_id)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn available_tables(
    State(state): State<AppState>,
    Path(restaurant_id): Path<i32>,
    Query(query): Query<AvailableTablesQuery>,
) -> ApiResult<Vec<RestaurantTable>> {
    state
        .lifecycle
        .available_tables(restaurant_id, query.booking_time, query.guest_count)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn validate_voucher(
    State(state): State<AppState>,
    Json(request): Json<ValidateVoucherRequest>,
) -> ApiResult<VoucherValidation> {
    state
        .lifecycle
        .validate_voucher(&request.code, request.restaurant_id, &request.order_amount)
        .await
        .map(Json)
        .map_err(error_reply)
}

async fn health_check() -> &'static str {
    "OK"
}

fn error_reply(err: BookingError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        BookingError::Validation(_)
        | BookingError::InvalidIdFormat(_) => StatusCode::BAD_REQUEST,
        BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        BookingError::Conflict { .. } => StatusCode::CONFLICT,
        BookingError::CapacityExceeded { .. }
        | BookingError::VoucherRejected(_)
        | BookingError::InvalidStatusTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
        BookingError::CorruptCatalogPrice(_)
        | BookingError::RefundFailed(_)
        | BookingError::Database(_)
        | BookingError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {err}");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
