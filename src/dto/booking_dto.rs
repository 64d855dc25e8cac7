//! DTOs de bookings

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::BookingStatus;
use crate::models::truck::ServiceType;

/// Request para crear un booking. Los campos requeridos dependen del
/// service_type; el controller valida la parte condicional.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub truck_id: Uuid,
    pub service_type: ServiceType,

    // Transporte
    #[validate(length(min = 1, max = 255))]
    pub pickup_address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub pickup_city: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub destination_address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub destination_city: Option<String>,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<NaiveTime>,
    #[validate(length(max = 1000))]
    pub cargo_description: Option<String>,
    pub cargo_weight: Option<Decimal>,
    pub cargo_volume: Option<Decimal>,

    // Alquiler
    pub rental_start_datetime: Option<DateTime<Utc>>,
    pub rental_end_datetime: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 255))]
    pub work_address: Option<String>,
    #[validate(length(max = 1000))]
    pub purpose_description: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Request para transicionar el estado de un booking
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

/// Filtros de listado de bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingListFilters {
    pub status: Option<String>,
    pub search: Option<String>,
    pub service_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Response de booking para la API
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub service_type: ServiceType,
    pub status: BookingStatus,
    pub truck_id: Option<Uuid>,
    pub truck_license_plate: String,
    pub truck_type: Option<String>,
    pub truck_deleted: bool,
    pub customer_name: String,
    pub provider_company: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_city: Option<String>,
    pub destination_address: Option<String>,
    pub destination_city: Option<String>,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time: Option<NaiveTime>,
    pub cargo_description: Option<String>,
    pub cargo_weight: Option<Decimal>,
    pub cargo_volume: Option<Decimal>,
    pub estimated_distance: Option<Decimal>,
    pub rental_start_datetime: Option<DateTime<Utc>>,
    pub rental_end_datetime: Option<DateTime<Utc>>,
    pub work_address: Option<String>,
    pub purpose_description: Option<String>,
    pub rental_duration_hours: Option<i32>,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entrada del historial de estados para la API
#[derive(Debug, Serialize)]
pub struct StatusHistoryResponse {
    pub id: Uuid,
    pub status: BookingStatus,
    pub changed_by: Option<Uuid>,
    pub changed_by_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Acciones legales para el principal sobre un booking concreto.
/// Sale de la misma tabla pura que usa la máquina de estados.
#[derive(Debug, Serialize)]
pub struct BookingActionsResponse {
    pub booking_id: Uuid,
    pub current_status: BookingStatus,
    pub allowed_statuses: Vec<BookingStatus>,
}
