use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::booking_controller::BookingController;
use crate::dto::booking_dto::{
    BookingActionsResponse, BookingListFilters, BookingResponse, CreateBookingRequest,
    StatusHistoryResponse, UpdateBookingStatusRequest,
};
use crate::dto::common_dto::{ApiResponse, PagedResponse};
use crate::middleware::principal::Principal;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_booking_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking).delete(delete_booking))
        .route("/:id/history", get(booking_history))
        .route("/:id/actions", get(booking_actions))
        .route("/:id/status", patch(update_booking_status))
}

fn controller(state: &AppState) -> BookingController {
    BookingController::new(state.pool.clone(), state.pricing.clone(), state.notifier.clone())
}

async fn create_booking(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let response = controller(&state).create(principal, request).await?;
    Ok(Json(response))
}

async fn list_bookings(
    State(state): State<AppState>,
    principal: Principal,
    Query(filters): Query<BookingListFilters>,
) -> Result<Json<ApiResponse<PagedResponse<BookingResponse>>>, AppError> {
    let response = controller(&state)
        .list(principal, filters, state.config.default_page_size)
        .await?;
    Ok(Json(response))
}

async fn get_booking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let response = controller(&state).get_by_id(principal, id).await?;
    Ok(Json(response))
}

async fn booking_history(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<StatusHistoryResponse>>>, AppError> {
    let response = controller(&state).history(principal, id).await?;
    Ok(Json(response))
}

async fn booking_actions(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingActionsResponse>>, AppError> {
    let response = controller(&state).actions(principal, id).await?;
    Ok(Json(response))
}

async fn update_booking_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<BookingResponse>>, AppError> {
    let response = controller(&state).update_status(principal, id, request).await?;
    Ok(Json(response))
}

async fn delete_booking(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let response = controller(&state).delete(principal, id).await?;
    Ok(Json(response))
}
