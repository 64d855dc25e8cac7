//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

/// Booking que bloquea la eliminación de un recurso.
/// Se devuelve al caller para que pueda explicar el rechazo al usuario.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BlockingBooking {
    pub id: Uuid,
    pub status: BookingStatus,
    pub counterpart: String,
    pub reference_date: Option<NaiveDate>,
}

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid filter value '{value}' for '{field}'")]
    InvalidFilter { field: String, value: String },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Illegal transition for booking {booking_id}: {from} -> {to}")]
    IllegalTransition {
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("{message}")]
    ActiveBookingConflict {
        message: String,
        blocking: Vec<BlockingBooking>,
    },

    #[error("Booking {booking_id} was modified concurrently")]
    ConcurrentModification { booking_id: Uuid },

    #[error("Pricing unavailable: {0}")]
    PricingUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Database(e) => {
                eprintln!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Database Error".to_string(),
                        message: "An error occurred while accessing the database".to_string(),
                        details: Some(json!({ "sql_error": e.to_string() })),
                        code: Some("DB_ERROR".to_string()),
                    },
                )
            }

            AppError::Validation(e) => {
                eprintln!("Validation error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Validation Error".to_string(),
                        message: "The provided data is invalid".to_string(),
                        details: Some(json!(e)),
                        code: Some("VALIDATION_ERROR".to_string()),
                    },
                )
            }

            AppError::Unauthorized(msg) => {
                eprintln!("Unauthorized access: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse {
                        error: "Unauthorized".to_string(),
                        message: msg,
                        details: None,
                        code: Some("UNAUTHORIZED".to_string()),
                    },
                )
            }

            AppError::Forbidden(msg) => {
                eprintln!("Forbidden access: {}", msg);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse {
                        error: "Forbidden".to_string(),
                        message: msg,
                        details: None,
                        code: Some("FORBIDDEN".to_string()),
                    },
                )
            }

            AppError::NotFound(msg) => {
                eprintln!("Resource not found: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: "Not Found".to_string(),
                        message: msg,
                        details: None,
                        code: Some("NOT_FOUND".to_string()),
                    },
                )
            }

            AppError::BadRequest(msg) => {
                eprintln!("Bad request: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Bad Request".to_string(),
                        message: msg,
                        details: None,
                        code: Some("BAD_REQUEST".to_string()),
                    },
                )
            }

            AppError::InvalidFilter { field, value } => {
                eprintln!("Invalid filter: {}='{}'", field, value);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Invalid Filter".to_string(),
                        message: format!("'{}' is not a valid value for '{}'", value, field),
                        details: Some(json!({ "field": field, "value": value })),
                        code: Some("INVALID_FILTER".to_string()),
                    },
                )
            }

            AppError::InvalidPagination(msg) => {
                eprintln!("Invalid pagination: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: "Invalid Pagination".to_string(),
                        message: msg,
                        details: None,
                        code: Some("INVALID_PAGINATION".to_string()),
                    },
                )
            }

            AppError::IllegalTransition { booking_id, from, to } => {
                eprintln!("Illegal transition: {} {} -> {}", booking_id, from, to);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Illegal Transition".to_string(),
                        message: format!(
                            "Booking cannot move from '{}' to '{}' for this role",
                            from, to
                        ),
                        details: Some(json!({
                            "booking_id": booking_id,
                            "current_status": from,
                            "attempted_status": to,
                        })),
                        code: Some("ILLEGAL_TRANSITION".to_string()),
                    },
                )
            }

            AppError::ActiveBookingConflict { message, blocking } => {
                eprintln!("Active booking conflict: {}", message);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Active Booking Conflict".to_string(),
                        message,
                        details: Some(json!({ "active_bookings": blocking })),
                        code: Some("ACTIVE_BOOKING_CONFLICT".to_string()),
                    },
                )
            }

            AppError::ConcurrentModification { booking_id } => {
                eprintln!("Concurrent modification on booking {}", booking_id);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse {
                        error: "Concurrent Modification".to_string(),
                        message: "The booking was modified by another request, please retry"
                            .to_string(),
                        details: Some(json!({ "booking_id": booking_id })),
                        code: Some("CONCURRENT_MODIFICATION".to_string()),
                    },
                )
            }

            AppError::PricingUnavailable(msg) => {
                eprintln!("Pricing unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "Pricing Unavailable".to_string(),
                        message: msg,
                        details: None,
                        code: Some("PRICING_UNAVAILABLE".to_string()),
                    },
                )
            }

            AppError::Internal(msg) => {
                eprintln!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &Uuid) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_maps_to_conflict() {
        let err = AppError::IllegalTransition {
            booking_id: Uuid::new_v4(),
            from: BookingStatus::Completed,
            to: BookingStatus::Approved,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn active_booking_conflict_maps_to_conflict() {
        let err = AppError::ActiveBookingConflict {
            message: "Cannot delete truck with active bookings".to_string(),
            blocking: vec![BlockingBooking {
                id: Uuid::new_v4(),
                status: BookingStatus::Approved,
                counterpart: "Jane Doe".to_string(),
                reference_date: None,
            }],
        };
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn pricing_unavailable_maps_to_service_unavailable() {
        let err = AppError::PricingUnavailable("no rate card".to_string());
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_filter_maps_to_bad_request() {
        let err = AppError::InvalidFilter {
            field: "service_type".to_string(),
            value: "boat".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
