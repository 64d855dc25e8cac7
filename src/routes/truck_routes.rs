use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::truck_controller::TruckController;
use crate::dto::booking_dto::BookingResponse;
use crate::dto::common_dto::{ApiResponse, PagedResponse};
use crate::dto::truck_dto::{TruckDetailResponse, TruckSearchFilters, TruckSearchItem};
use crate::middleware::principal::Principal;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_truck_router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_trucks))
        .route("/:id", get(get_truck).delete(delete_truck))
        .route("/:id/bookings", get(truck_bookings))
}

async fn search_trucks(
    State(state): State<AppState>,
    principal: Principal,
    Query(filters): Query<TruckSearchFilters>,
) -> Result<Json<ApiResponse<PagedResponse<TruckSearchItem>>>, AppError> {
    let controller = TruckController::new(state.pool.clone(), state.notifier.clone());
    let response = controller
        .search(principal, filters, state.config.default_page_size)
        .await?;
    Ok(Json(response))
}

async fn get_truck(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TruckDetailResponse>>, AppError> {
    let controller = TruckController::new(state.pool.clone(), state.notifier.clone());
    let response = controller.get_by_id(principal, id).await?;
    Ok(Json(response))
}

async fn truck_bookings(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<BookingResponse>>>, AppError> {
    let controller = TruckController::new(state.pool.clone(), state.notifier.clone());
    let response = controller.truck_bookings(principal, id).await?;
    Ok(Json(response))
}

async fn delete_truck(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = TruckController::new(state.pool.clone(), state.notifier.clone());
    let response = controller.delete(principal, id).await?;
    Ok(Json(response))
}
