//! Modelo de Booking y máquina de estados
//!
//! Este módulo contiene el struct Booking, el historial de estados y la
//! tabla de transiciones indexada por rol. La tabla es una función pura:
//! la consumen tanto la máquina de estados como el endpoint de acciones
//! disponibles, así nunca pueden discrepar.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::truck::ServiceType;
use crate::models::user::UserRole;

/// Estado del booking - mapea al ENUM booking_status.
/// `in_transit` solo aplica a transport, `active` solo a rental;
/// ambos son estados "en curso". `completed` y `cancelled` son terminales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingReview,
    Approved,
    InTransit,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::PendingReview,
        BookingStatus::Approved,
        BookingStatus::InTransit,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// Sin transiciones salientes para ningún rol.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Estado de cumplimiento en curso (in_transit o active).
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BookingStatus::InTransit | BookingStatus::Active)
    }

    /// El estado "en curso" que corresponde al tipo de servicio.
    pub fn in_progress_for(service_type: ServiceType) -> BookingStatus {
        match service_type {
            ServiceType::Transport => BookingStatus::InTransit,
            ServiceType::Rental => BookingStatus::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingReview => "pending_review",
            BookingStatus::Approved => "approved",
            BookingStatus::InTransit => "in_transit",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(BookingStatus::PendingReview),
            "approved" => Ok(BookingStatus::Approved),
            "in_transit" => Ok(BookingStatus::InTransit),
            "active" => Ok(BookingStatus::Active),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tabla de transiciones legal por (rol, estado actual, tipo de servicio).
///
/// - customer: cancela en pending_review; confirma entrega/devolución
///   (completed) desde el estado en curso.
/// - provider: aprueba o cancela en pending_review; arranca el servicio
///   desde approved; puede cancelar cualquier estado no terminal.
/// - admin: override total, cualquier no-terminal a cualquier otro estado.
///
/// Los estados terminales no tienen salidas y X -> X nunca es legal.
pub fn allowed_transitions(
    role: UserRole,
    from: BookingStatus,
    service_type: ServiceType,
) -> Vec<BookingStatus> {
    if from.is_terminal() {
        return Vec::new();
    }

    match role {
        UserRole::Admin => BookingStatus::ALL
            .into_iter()
            .filter(|to| *to != from)
            .collect(),

        UserRole::Customer => match from {
            BookingStatus::PendingReview => vec![BookingStatus::Cancelled],
            BookingStatus::InTransit | BookingStatus::Active => vec![BookingStatus::Completed],
            _ => Vec::new(),
        },

        UserRole::Provider => match from {
            BookingStatus::PendingReview => {
                vec![BookingStatus::Approved, BookingStatus::Cancelled]
            }
            BookingStatus::Approved => vec![
                BookingStatus::in_progress_for(service_type),
                BookingStatus::Cancelled,
            ],
            // Override del provider: cancelar un servicio ya en curso
            BookingStatus::InTransit | BookingStatus::Active => vec![BookingStatus::Cancelled],
            _ => Vec::new(),
        },
    }
}

/// True si la transición está en la tabla.
pub fn transition_allowed(
    role: UserRole,
    from: BookingStatus,
    to: BookingStatus,
    service_type: ServiceType,
) -> bool {
    allowed_transitions(role, from, service_type).contains(&to)
}

/// Booking principal - mapea exactamente a la tabla bookings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub truck_id: Option<Uuid>,
    pub service_type: ServiceType,
    pub status: BookingStatus,
    // Campos de transporte
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
    // Campos de alquiler
    pub rental_start_datetime: Option<DateTime<Utc>>,
    pub rental_end_datetime: Option<DateTime<Utc>>,
    pub work_address: Option<String>,
    pub purpose_description: Option<String>,
    pub rental_duration_hours: Option<i32>,
    // Precio estampado en la creación, inmutable después
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos para crear un booking nuevo (el status inicial siempre es
/// pending_review y lo fija el repositorio).
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub truck_id: Uuid,
    pub service_type: ServiceType,
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
}

/// Entrada del historial de estados - append-only, una fila por transición.
/// El status actual del booking siempre coincide con la entrada más reciente.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [UserRole; 3] = [UserRole::Customer, UserRole::Provider, UserRole::Admin];
    const SERVICES: [ServiceType; 2] = [ServiceType::Transport, ServiceType::Rental];

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for role in ROLES {
            for service in SERVICES {
                assert!(allowed_transitions(role, BookingStatus::Completed, service).is_empty());
                assert!(allowed_transitions(role, BookingStatus::Cancelled, service).is_empty());
            }
        }
    }

    #[test]
    fn self_transition_is_never_legal() {
        for role in ROLES {
            for service in SERVICES {
                for status in BookingStatus::ALL {
                    assert!(
                        !transition_allowed(role, status, status, service),
                        "{role} {status} -> {status} must be rejected"
                    );
                }
            }
        }
    }

    #[test]
    fn customer_table_is_exactly_cancel_and_complete() {
        for service in SERVICES {
            assert_eq!(
                allowed_transitions(UserRole::Customer, BookingStatus::PendingReview, service),
                vec![BookingStatus::Cancelled]
            );
            assert_eq!(
                allowed_transitions(UserRole::Customer, BookingStatus::InTransit, service),
                vec![BookingStatus::Completed]
            );
            assert_eq!(
                allowed_transitions(UserRole::Customer, BookingStatus::Active, service),
                vec![BookingStatus::Completed]
            );
            assert!(
                allowed_transitions(UserRole::Customer, BookingStatus::Approved, service)
                    .is_empty()
            );
        }
    }

    #[test]
    fn provider_starts_the_in_progress_state_matching_the_service() {
        let transport =
            allowed_transitions(UserRole::Provider, BookingStatus::Approved, ServiceType::Transport);
        assert!(transport.contains(&BookingStatus::InTransit));
        assert!(!transport.contains(&BookingStatus::Active));

        let rental =
            allowed_transitions(UserRole::Provider, BookingStatus::Approved, ServiceType::Rental);
        assert!(rental.contains(&BookingStatus::Active));
        assert!(!rental.contains(&BookingStatus::InTransit));
    }

    #[test]
    fn provider_cannot_complete_a_booking() {
        for service in SERVICES {
            for from in BookingStatus::ALL {
                assert!(
                    !transition_allowed(UserRole::Provider, from, BookingStatus::Completed, service),
                    "provider must never complete from {from}"
                );
            }
        }
    }

    #[test]
    fn admin_override_reaches_any_other_status_from_non_terminal() {
        for service in SERVICES {
            for from in BookingStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
                for to in BookingStatus::ALL.into_iter().filter(|to| *to != from) {
                    assert!(transition_allowed(UserRole::Admin, from, to, service));
                }
            }
        }
    }

    // Escenario completo de un booking de transporte: creación, aprobación
    // del provider, inicio del viaje y confirmación de entrega del customer.
    #[test]
    fn transport_booking_lifecycle_scenario() {
        let service = ServiceType::Transport;
        let mut status = BookingStatus::PendingReview;

        // El provider aprueba
        assert!(transition_allowed(UserRole::Provider, status, BookingStatus::Approved, service));
        status = BookingStatus::Approved;

        // El customer no puede arrancar el viaje
        assert!(!transition_allowed(UserRole::Customer, status, BookingStatus::InTransit, service));

        // El provider sí
        assert!(transition_allowed(UserRole::Provider, status, BookingStatus::InTransit, service));
        status = BookingStatus::InTransit;

        // El customer confirma la entrega
        assert!(transition_allowed(UserRole::Customer, status, BookingStatus::Completed, service));
        status = BookingStatus::Completed;

        // Terminal: nadie puede moverlo
        for role in ROLES {
            assert!(allowed_transitions(role, status, service).is_empty());
        }
    }

    #[test]
    fn provider_can_cancel_any_non_terminal_state() {
        for service in SERVICES {
            for from in BookingStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
                assert!(transition_allowed(UserRole::Provider, from, BookingStatus::Cancelled, service));
            }
        }
    }

    #[test]
    fn in_progress_helpers_match_service_type() {
        assert_eq!(
            BookingStatus::in_progress_for(ServiceType::Transport),
            BookingStatus::InTransit
        );
        assert_eq!(
            BookingStatus::in_progress_for(ServiceType::Rental),
            BookingStatus::Active
        );
        assert!(BookingStatus::InTransit.is_in_progress());
        assert!(BookingStatus::Active.is_in_progress());
        assert!(!BookingStatus::Approved.is_in_progress());
    }
}
