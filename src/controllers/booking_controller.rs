//! Controller de bookings
//!
//! Toda la autorización del ciclo de vida pasa por la tabla pura de
//! transiciones: este controller solo resuelve quién es el principal
//! respecto del booking, consulta la tabla y delega el compare-and-set
//! al repositorio. Los efectos sobre el truck (rented/active, revenue)
//! son best-effort y nunca revierten una transición ya confirmada.

use chrono::Utc;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::dto::booking_dto::{
    BookingActionsResponse, BookingListFilters, BookingResponse, CreateBookingRequest,
    StatusHistoryResponse, UpdateBookingStatusRequest,
};
use crate::dto::common_dto::{ApiResponse, PagedResponse, PaginationMeta};
use crate::middleware::principal::Principal;
use crate::models::booking::{
    allowed_transitions, transition_allowed, BookingStatus, NewBooking,
};
use crate::models::truck::{ServiceType, TruckStatus};
use crate::models::user::UserRole;
use crate::repositories::booking_repository::{
    BookingRecord, BookingRepository, BookingScope,
};
use crate::repositories::truck_repository::TruckRepository;
use crate::services::notification_service::NotificationSink;
use crate::services::pricing_service::{rental_duration_hours, PricingOracle, QuoteRequest};
use crate::utils::errors::{forbidden_error, not_found_error, AppError, BlockingBooking};
use crate::utils::validation::validate_pagination;

use super::truck_controller::{document_stats, passes_customer_gate};

pub struct BookingController {
    repository: BookingRepository,
    trucks: TruckRepository,
    pricing: Arc<dyn PricingOracle>,
    notifier: Arc<dyn NotificationSink>,
}

/// Relación del principal con un booking concreto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Customer,
    Provider,
    Admin,
}

fn party_for(principal: Principal, record: &BookingRecord) -> Option<Party> {
    match principal.role {
        UserRole::Admin => Some(Party::Admin),
        UserRole::Customer if record.booking.customer_id == principal.user_id => {
            Some(Party::Customer)
        }
        UserRole::Provider if record.provider_user_id == Some(principal.user_id) => {
            Some(Party::Provider)
        }
        _ => None,
    }
}

fn party_role(party: Party) -> UserRole {
    match party {
        Party::Customer => UserRole::Customer,
        Party::Provider => UserRole::Provider,
        Party::Admin => UserRole::Admin,
    }
}

/// Veredicto de borrado de un booking según su estado y quién lo pide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteVerdict {
    Allowed,
    /// Solo el customer dueño puede borrar un booking pendiente
    Forbidden,
    /// En vuelo: hay que cancelarlo antes de borrarlo, sin importar el rol
    InFlight,
}

fn delete_verdict(party: Party, status: BookingStatus) -> DeleteVerdict {
    if status.is_terminal() {
        DeleteVerdict::Allowed
    } else if status == BookingStatus::PendingReview {
        if party == Party::Customer {
            DeleteVerdict::Allowed
        } else {
            DeleteVerdict::Forbidden
        }
    } else {
        DeleteVerdict::InFlight
    }
}

/// Mapea un registro completo a la respuesta de la API. Un truck borrado
/// se presenta con un placeholder, el booking terminal sigue legible.
pub(crate) fn booking_response(record: BookingRecord) -> BookingResponse {
    let b = record.booking;
    BookingResponse {
        id: b.id,
        service_type: b.service_type,
        status: b.status,
        truck_id: b.truck_id,
        truck_deleted: b.truck_id.is_none(),
        truck_license_plate: record
            .truck_license_plate
            .unwrap_or_else(|| "Deleted Truck".to_string()),
        truck_type: record.truck_type,
        customer_name: format!("{} {}", record.customer_first_name, record.customer_last_name),
        provider_company: record.provider_company,
        pickup_address: b.pickup_address,
        pickup_city: b.pickup_city,
        destination_address: b.destination_address,
        destination_city: b.destination_city,
        pickup_date: b.pickup_date,
        pickup_time: b.pickup_time,
        cargo_description: b.cargo_description,
        cargo_weight: b.cargo_weight,
        cargo_volume: b.cargo_volume,
        estimated_distance: b.estimated_distance,
        rental_start_datetime: b.rental_start_datetime,
        rental_end_datetime: b.rental_end_datetime,
        work_address: b.work_address,
        purpose_description: b.purpose_description,
        rental_duration_hours: b.rental_duration_hours,
        total_price: b.total_price,
        notes: b.notes,
        created_at: b.created_at,
        updated_at: b.updated_at,
    }
}

impl BookingController {
    pub fn new(
        pool: PgPool,
        pricing: Arc<dyn PricingOracle>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repository: BookingRepository::new(pool.clone()),
            trucks: TruckRepository::new(pool),
            pricing,
            notifier,
        }
    }

    /// Crea un booking en pending_review con el precio estampado.
    /// Solo customers; el truck debe ser visible para ellos (mismo gate
    /// que la búsqueda).
    pub async fn create(
        &self,
        principal: Principal,
        request: CreateBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        if principal.role != UserRole::Customer {
            return Err(forbidden_error(
                "create booking",
                "only customers can book trucks",
            ));
        }

        request.validate()?;

        let truck_id = request.truck_id;
        let owner = self
            .trucks
            .find_by_id(truck_id)
            .await?
            .ok_or_else(|| not_found_error("Truck", &truck_id))?;

        // Un truck invisible para el customer no se puede reservar
        let documents = self.trucks.documents(truck_id).await?;
        let stats = document_stats(&documents);
        if !passes_customer_gate(&owner, &stats) {
            return Err(not_found_error("Truck", &truck_id));
        }

        if request.service_type != owner.truck.service_type {
            return Err(AppError::BadRequest(format!(
                "Truck offers '{}' service, not '{}'",
                owner.truck.service_type, request.service_type
            )));
        }

        let (quote_request, rental_hours) = match request.service_type {
            ServiceType::Transport => {
                let pickup_city = required(&request.pickup_city, "pickup_city")?;
                let destination_city = required(&request.destination_city, "destination_city")?;
                required(&request.pickup_address, "pickup_address")?;
                required(&request.destination_address, "destination_address")?;

                let pickup_date = request
                    .pickup_date
                    .ok_or_else(|| AppError::BadRequest("pickup_date is required".to_string()))?;
                if pickup_date < Utc::now().date_naive() {
                    return Err(AppError::BadRequest(
                        "pickup_date cannot be in the past".to_string(),
                    ));
                }

                (
                    QuoteRequest::Transport {
                        pickup_city: pickup_city.clone(),
                        destination_city: destination_city.clone(),
                    },
                    None,
                )
            }
            ServiceType::Rental => {
                let start = request.rental_start_datetime.ok_or_else(|| {
                    AppError::BadRequest("rental_start_datetime is required".to_string())
                })?;
                let end = request.rental_end_datetime.ok_or_else(|| {
                    AppError::BadRequest("rental_end_datetime is required".to_string())
                })?;

                if start >= end {
                    return Err(AppError::BadRequest(
                        "rental_start_datetime must be before rental_end_datetime".to_string(),
                    ));
                }
                if start < Utc::now() {
                    return Err(AppError::BadRequest(
                        "rental_start_datetime cannot be in the past".to_string(),
                    ));
                }

                if self
                    .repository
                    .rental_overlap_exists(truck_id, start, end)
                    .await?
                {
                    return Err(AppError::BadRequest(
                        "Truck is already booked for the requested period".to_string(),
                    ));
                }

                (
                    QuoteRequest::Rental { start, end },
                    Some(rental_duration_hours(start, end)),
                )
            }
        };

        // Sin precio no hay booking: un fallo del oráculo aborta con 503
        let quote = self.pricing.quote(&owner.truck, &quote_request).await?;

        let booking = self
            .repository
            .create(NewBooking {
                customer_id: principal.user_id,
                truck_id,
                service_type: request.service_type,
                pickup_address: request.pickup_address,
                pickup_city: request.pickup_city,
                destination_address: request.destination_address,
                destination_city: request.destination_city,
                pickup_date: request.pickup_date,
                pickup_time: request.pickup_time,
                cargo_description: request.cargo_description,
                cargo_weight: request.cargo_weight,
                cargo_volume: request.cargo_volume,
                estimated_distance: quote.estimated_distance,
                rental_start_datetime: request.rental_start_datetime,
                rental_end_datetime: request.rental_end_datetime,
                work_address: request.work_address,
                purpose_description: request.purpose_description,
                rental_duration_hours: rental_hours,
                total_price: quote.total_price,
                notes: request.notes,
            })
            .await?;

        self.notifier
            .booking_created(booking.id, principal.user_id, truck_id)
            .await;

        let record = self
            .repository
            .find_record(booking.id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &booking.id))?;

        Ok(ApiResponse::success_with_message(
            booking_response(record),
            "Booking created successfully".to_string(),
        ))
    }

    /// Listado paginado con el alcance del rol: el customer ve lo suyo,
    /// el provider lo que cae sobre sus trucks, el admin todo.
    pub async fn list(
        &self,
        principal: Principal,
        filters: BookingListFilters,
        default_page_size: i64,
    ) -> Result<ApiResponse<PagedResponse<BookingResponse>>, AppError> {
        let (page, limit) = validate_pagination(filters.page, filters.limit, default_page_size)?;

        let status = filters
            .status
            .as_deref()
            .map(|s| {
                BookingStatus::from_str(s).map_err(|_| AppError::InvalidFilter {
                    field: "status".to_string(),
                    value: s.to_string(),
                })
            })
            .transpose()?;

        let service_type = filters
            .service_type
            .as_deref()
            .map(|s| {
                ServiceType::from_str(s).map_err(|_| AppError::InvalidFilter {
                    field: "service_type".to_string(),
                    value: s.to_string(),
                })
            })
            .transpose()?;

        let scope = match principal.role {
            UserRole::Customer => BookingScope::Customer(principal.user_id),
            UserRole::Provider => BookingScope::Provider(principal.user_id),
            UserRole::Admin => BookingScope::All,
        };

        let rows = self
            .repository
            .list(scope, &filters, status, service_type, limit, (page - 1) * limit)
            .await?;

        let total_count = rows.first().map(|r| r.total_count).unwrap_or(0);
        let items = rows
            .into_iter()
            .map(|r| booking_response(r.record))
            .collect();

        Ok(ApiResponse::success(PagedResponse {
            items,
            pagination: PaginationMeta::new(page, limit, total_count),
        }))
    }

    pub async fn get_by_id(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let record = self.authorized_record(principal, id).await?;
        Ok(ApiResponse::success(booking_response(record)))
    }

    /// Historial completo de transiciones, más reciente primero
    pub async fn history(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<Vec<StatusHistoryResponse>>, AppError> {
        self.authorized_record(principal, id).await?;

        let rows = self.repository.history(id).await?;
        let entries = rows
            .into_iter()
            .map(|row| StatusHistoryResponse {
                id: row.entry.id,
                status: row.entry.status,
                changed_by: row.entry.changed_by,
                changed_by_name: row.changed_by_name,
                notes: row.entry.notes,
                created_at: row.entry.created_at,
            })
            .collect();

        Ok(ApiResponse::success(entries))
    }

    /// Transiciones legales para el principal, derivadas de la misma
    /// tabla que aplica update_status. Lo que se lista aquí no puede
    /// fallar allá por ilegal.
    pub async fn actions(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<BookingActionsResponse>, AppError> {
        let record = self.authorized_record(principal, id).await?;
        let party = party_for(principal, &record).unwrap_or(Party::Admin);

        let allowed = allowed_transitions(
            party_role(party),
            record.booking.status,
            record.booking.service_type,
        );

        Ok(ApiResponse::success(BookingActionsResponse {
            booking_id: id,
            current_status: record.booking.status,
            allowed_statuses: allowed,
        }))
    }

    /// Aplica una transición de estado con compare-and-set
    pub async fn update_status(
        &self,
        principal: Principal,
        id: Uuid,
        request: UpdateBookingStatusRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let record = self.authorized_record(principal, id).await?;
        let party = party_for(principal, &record).unwrap_or(Party::Admin);

        let to = BookingStatus::from_str(&request.status).map_err(|_| AppError::InvalidFilter {
            field: "status".to_string(),
            value: request.status.clone(),
        })?;

        let from = record.booking.status;
        let service_type = record.booking.service_type;

        if !transition_allowed(party_role(party), from, to, service_type) {
            return Err(AppError::IllegalTransition {
                booking_id: id,
                from,
                to,
            });
        }

        let booking = self
            .repository
            .transition(id, from, to, principal.user_id, request.notes.as_deref())
            .await?;

        // Efectos sobre el truck: se intentan después de confirmar la
        // transición y un fallo solo se loguea.
        if let Some(truck_id) = booking.truck_id {
            let effect = match to {
                BookingStatus::Approved | BookingStatus::InTransit | BookingStatus::Active => {
                    self.trucks.set_status(truck_id, TruckStatus::Rented).await
                }
                BookingStatus::Completed => {
                    match self.trucks.set_status(truck_id, TruckStatus::Active).await {
                        Ok(()) => self.trucks.add_revenue(truck_id, booking.total_price).await,
                        Err(e) => Err(e),
                    }
                }
                BookingStatus::Cancelled if from == BookingStatus::Approved || from.is_in_progress() => {
                    self.trucks.set_status(truck_id, TruckStatus::Active).await
                }
                _ => Ok(()),
            };

            if let Err(e) = effect {
                warn!(%truck_id, booking_id = %id, "⚠️ Truck side effect failed: {}", e);
            }
        }

        self.notifier
            .booking_status_changed(id, from, to, principal.user_id)
            .await;

        let record = self
            .repository
            .find_record(id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &id))?;

        Ok(ApiResponse::success_with_message(
            booking_response(record),
            format!("Booking moved to '{}'", to),
        ))
    }

    /// Borra un booking según su estado: terminal lo borra cualquiera de
    /// las partes o el admin; pending_review solo el customer dueño; un
    /// booking en vuelo no se borra, se cancela primero.
    pub async fn delete(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<()>, AppError> {
        let record = self.authorized_record(principal, id).await?;
        let party = party_for(principal, &record).unwrap_or(Party::Admin);
        let status = record.booking.status;

        match delete_verdict(party, status) {
            DeleteVerdict::Allowed => {}
            DeleteVerdict::Forbidden => {
                return Err(forbidden_error(
                    "delete booking",
                    "only the booking customer can delete a pending booking",
                ));
            }
            DeleteVerdict::InFlight => {
                let reference_date = record
                    .booking
                    .pickup_date
                    .or_else(|| record.booking.rental_start_datetime.map(|d| d.date_naive()));
                return Err(AppError::ActiveBookingConflict {
                    message: "Booking is in flight, cancel it before deleting".to_string(),
                    blocking: vec![BlockingBooking {
                        id,
                        status,
                        counterpart: format!(
                            "{} {}",
                            record.customer_first_name, record.customer_last_name
                        ),
                        reference_date,
                    }],
                });
            }
        }

        self.repository.delete(id).await?;

        Ok(ApiResponse::success_with_message(
            (),
            "Booking deleted successfully".to_string(),
        ))
    }

    /// Carga el booking y verifica que el principal sea parte o admin
    async fn authorized_record(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<BookingRecord, AppError> {
        let record = self
            .repository
            .find_record(id)
            .await?
            .ok_or_else(|| not_found_error("Booking", &id))?;

        if party_for(principal, &record).is_none() {
            return Err(forbidden_error(
                "access booking",
                "booking belongs to another customer or provider",
            ));
        }

        Ok(record)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a String, AppError> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_bookings_can_be_deleted_by_any_party() {
        for party in [Party::Customer, Party::Provider, Party::Admin] {
            assert_eq!(
                delete_verdict(party, BookingStatus::Completed),
                DeleteVerdict::Allowed
            );
            assert_eq!(
                delete_verdict(party, BookingStatus::Cancelled),
                DeleteVerdict::Allowed
            );
        }
    }

    #[test]
    fn pending_booking_is_deletable_only_by_its_customer() {
        assert_eq!(
            delete_verdict(Party::Customer, BookingStatus::PendingReview),
            DeleteVerdict::Allowed
        );
        assert_eq!(
            delete_verdict(Party::Provider, BookingStatus::PendingReview),
            DeleteVerdict::Forbidden
        );
        assert_eq!(
            delete_verdict(Party::Admin, BookingStatus::PendingReview),
            DeleteVerdict::Forbidden
        );
    }

    #[test]
    fn in_flight_bookings_are_never_deletable() {
        for party in [Party::Customer, Party::Provider, Party::Admin] {
            for status in [
                BookingStatus::Approved,
                BookingStatus::InTransit,
                BookingStatus::Active,
            ] {
                assert_eq!(delete_verdict(party, status), DeleteVerdict::InFlight);
            }
        }
    }

    #[test]
    fn required_rejects_missing_and_blank_values() {
        assert!(required(&None, "pickup_city").is_err());
        assert!(required(&Some("  ".to_string()), "pickup_city").is_err());
        assert!(required(&Some("Madrid".to_string()), "pickup_city").is_ok());
    }
}
