//! Controller de trucks
//!
//! El marketplace tiene dos vistas sobre el mismo inventario: el customer
//! solo ve trucks activos que pasan el gate de elegibilidad; el provider
//! ve sus propios trucks con el diagnóstico de por qué pasan o no, y el
//! admin ve todo con el mismo diagnóstico.

use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::booking_dto::BookingResponse;
use crate::dto::common_dto::{ApiResponse, PagedResponse, PaginationMeta};
use crate::dto::truck_dto::{
    AvailabilityBucket, TruckDetailResponse, TruckEligibility, TruckSearchFilters,
    TruckSearchItem, TruckSearchParams,
};
use crate::middleware::principal::Principal;
use crate::models::document::{Document, VerificationStatus};
use crate::models::truck::{DocumentStats, PricingType, ServiceType, TruckStatus};
use crate::models::user::UserRole;
use crate::repositories::booking_repository::BookingRepository;
use crate::repositories::truck_repository::{TruckRepository, TruckSearchRow, TruckWithOwner};
use crate::services::notification_service::NotificationSink;
use crate::utils::errors::{forbidden_error, not_found_error, AppError};
use crate::utils::validation::validate_pagination;

use super::booking_controller::booking_response;

pub struct TruckController {
    repository: TruckRepository,
    bookings: BookingRepository,
    notifier: Arc<dyn NotificationSink>,
}

fn parse_filter<T: FromStr>(field: &str, value: &str) -> Result<T, AppError> {
    value.parse::<T>().map_err(|_| AppError::InvalidFilter {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn document_stats(documents: &[Document]) -> DocumentStats {
    let mut stats = DocumentStats { total: 0, approved: 0, pending: 0, rejected: 0 };
    for doc in documents {
        stats.total += 1;
        match doc.verification_status {
            VerificationStatus::Approved => stats.approved += 1,
            VerificationStatus::Pending => stats.pending += 1,
            VerificationStatus::Rejected => stats.rejected += 1,
        }
    }
    stats
}

/// Gate de elegibilidad completo para la vista de customer
pub(crate) fn passes_customer_gate(owner: &TruckWithOwner, stats: &DocumentStats) -> bool {
    owner.truck.status == TruckStatus::Active
        && owner.provider_verified
        && owner.user_active
        && stats.all_approved()
}

impl TruckController {
    pub fn new(pool: PgPool, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository: TruckRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool),
            notifier,
        }
    }

    /// Búsqueda del marketplace con vista según rol
    pub async fn search(
        &self,
        principal: Principal,
        filters: TruckSearchFilters,
        default_page_size: i64,
    ) -> Result<ApiResponse<PagedResponse<TruckSearchItem>>, AppError> {
        let (page, limit) = validate_pagination(filters.page, filters.limit, default_page_size)?;

        let service_type = filters
            .service_type
            .as_deref()
            .map(|s| parse_filter::<ServiceType>("service_type", s))
            .transpose()?;

        let pricing_type = filters
            .pricing_type
            .as_deref()
            .map(|s| parse_filter::<PricingType>("pricing_type", s))
            .transpose()?;

        let availability = filters
            .availability
            .as_deref()
            .map(|s| parse_filter::<AvailabilityBucket>("availability", s))
            .transpose()?
            .unwrap_or(AvailabilityBucket::All);

        // La vista de customer solo considera trucks activos y aplica el
        // gate; provider y admin ven también los inactivos, con diagnóstico.
        let (base_statuses, customer_gate, owner_user_id) = match principal.role {
            UserRole::Customer => (vec![TruckStatus::Active], true, None),
            UserRole::Provider => (
                vec![TruckStatus::Active, TruckStatus::Inactive],
                false,
                Some(principal.user_id),
            ),
            UserRole::Admin => (
                vec![TruckStatus::Active, TruckStatus::Inactive],
                false,
                None,
            ),
        };

        let include_eligibility = principal.role != UserRole::Customer;

        let params = TruckSearchParams {
            base_statuses,
            customer_gate,
            owner_user_id,
            search: filters.search,
            service_type,
            truck_type: filters.truck_type,
            pricing_type,
            min_capacity: filters.min_capacity,
            max_price: filters.max_price,
            work_location: filters.work_location,
            provider: filters.provider,
            availability,
            limit,
            offset: (page - 1) * limit,
        };

        let rows = self.repository.search(&params).await?;
        let total_count = rows.first().map(|r| r.total_count).unwrap_or(0);

        let items = rows
            .into_iter()
            .map(|row| search_item(row, include_eligibility))
            .collect();

        Ok(ApiResponse::success(PagedResponse {
            items,
            pagination: PaginationMeta::new(page, limit, total_count),
        }))
    }

    /// Detalle de un truck. Para el customer un truck que no pasa el gate
    /// simplemente no existe.
    pub async fn get_by_id(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<TruckDetailResponse>, AppError> {
        let owner = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Truck", &id))?;

        let documents = self.repository.documents(id).await?;
        let stats = document_stats(&documents);

        let is_owner = owner.provider_user_id == principal.user_id;
        let privileged = principal.is_admin() || is_owner;

        if !privileged && !passes_customer_gate(&owner, &stats) {
            return Err(not_found_error("Truck", &id));
        }

        let eligibility = privileged.then(|| eligibility_from(&owner, &stats));
        let provider_name = format!("{} {}", owner.first_name, owner.last_name);

        Ok(ApiResponse::success(TruckDetailResponse {
            truck: owner.truck,
            company_name: owner.company_name,
            provider_name,
            // Los archivos de documentos son del dueño y del admin
            documents: if privileged { documents } else { Vec::new() },
            eligibility,
        }))
    }

    /// Bookings de un truck, solo para el dueño o el admin
    pub async fn truck_bookings(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<Vec<BookingResponse>>, AppError> {
        let owner = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Truck", &id))?;

        if !principal.is_admin() && owner.provider_user_id != principal.user_id {
            return Err(forbidden_error(
                "list truck bookings",
                "truck belongs to another provider",
            ));
        }

        let records = self.bookings.list_for_truck(id).await?;
        let responses = records.into_iter().map(booking_response).collect();

        Ok(ApiResponse::success(responses))
    }

    /// Borra un truck si no tiene bookings en vuelo. Los bookings
    /// terminales sobreviven con el truck en NULL.
    pub async fn delete(
        &self,
        principal: Principal,
        id: Uuid,
    ) -> Result<ApiResponse<()>, AppError> {
        let owner = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Truck", &id))?;

        if !principal.is_admin() && owner.provider_user_id != principal.user_id {
            return Err(forbidden_error(
                "delete truck",
                "truck belongs to another provider",
            ));
        }

        let blocking = self.bookings.active_for_truck(id).await?;
        if !blocking.is_empty() {
            return Err(AppError::ActiveBookingConflict {
                message: format!(
                    "Cannot delete truck with {} booking(s) in flight",
                    blocking.len()
                ),
                blocking,
            });
        }

        self.repository.delete(id).await?;

        self.notifier
            .truck_deleted(id, &owner.truck.license_plate, principal.user_id)
            .await;

        Ok(ApiResponse::success_with_message(
            (),
            "Truck deleted successfully".to_string(),
        ))
    }
}

fn eligibility_from(owner: &TruckWithOwner, stats: &DocumentStats) -> TruckEligibility {
    TruckEligibility {
        total_documents: stats.total,
        approved_documents: stats.approved,
        pending_documents: stats.pending,
        rejected_documents: stats.rejected,
        provider_verified: owner.provider_verified,
        user_active: owner.user_active,
        documents_verified: stats.all_approved(),
    }
}

fn search_item(row: TruckSearchRow, include_eligibility: bool) -> TruckSearchItem {
    let eligibility = include_eligibility.then(|| TruckEligibility {
        total_documents: row.total_documents,
        approved_documents: row.approved_documents,
        pending_documents: row.pending_documents,
        rejected_documents: row.rejected_documents,
        provider_verified: row.provider_verified,
        user_active: row.user_active,
        documents_verified: row.total_documents > 0
            && row.total_documents == row.approved_documents,
    });

    let truck = row.truck;
    TruckSearchItem {
        id: truck.id,
        service_type: truck.service_type,
        truck_type: truck.truck_type,
        license_plate: truck.license_plate,
        make: truck.make,
        model: truck.model,
        year: truck.year,
        capacity_weight: truck.capacity_weight,
        capacity_volume: truck.capacity_volume,
        pricing_type: truck.pricing_type,
        price_per_km: truck.price_per_km,
        fixed_price: truck.fixed_price,
        monthly_rate: truck.monthly_rate,
        work_location: truck.work_location,
        status: truck.status,
        company_name: row.company_name,
        provider_name: format!("{} {}", row.first_name, row.last_name),
        is_rented: row.is_rented,
        created_at: truck.created_at,
        eligibility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(status: VerificationStatus) -> Document {
        Document {
            id: Uuid::new_v4(),
            entity_type: "truck".to_string(),
            entity_id: Uuid::new_v4(),
            document_type: "insurance".to_string(),
            file_name: "insurance.pdf".to_string(),
            verification_status: status,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn document_stats_counts_by_status() {
        let docs = vec![
            doc(VerificationStatus::Approved),
            doc(VerificationStatus::Approved),
            doc(VerificationStatus::Pending),
            doc(VerificationStatus::Rejected),
        ];
        let stats = document_stats(&docs);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
        assert!(!stats.all_approved());
    }

    #[test]
    fn empty_documents_fail_the_gate() {
        let stats = document_stats(&[]);
        assert!(!stats.all_approved());
    }

    fn sample_row() -> TruckSearchRow {
        use crate::models::truck::Truck;
        use rust_decimal::Decimal;

        TruckSearchRow {
            truck: Truck {
                id: Uuid::new_v4(),
                provider_id: Uuid::new_v4(),
                service_type: ServiceType::Transport,
                truck_type: "flatbed".to_string(),
                license_plate: "AB-123-CD".to_string(),
                make: Some("Volvo".to_string()),
                model: Some("FH16".to_string()),
                year: Some(2021),
                capacity_weight: Decimal::from(24000),
                capacity_volume: None,
                pricing_type: PricingType::PerKm,
                price_per_km: Some(Decimal::from(3)),
                fixed_price: None,
                monthly_rate: None,
                work_location: None,
                status: TruckStatus::Active,
                total_revenue: Decimal::ZERO,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            company_name: "Transportes Norte".to_string(),
            first_name: "Ana".to_string(),
            last_name: "García".to_string(),
            provider_verified: true,
            user_active: true,
            total_documents: 3,
            approved_documents: 2,
            pending_documents: 1,
            rejected_documents: 0,
            is_rented: false,
            total_count: 1,
        }
    }

    // La vista de admin recibe los conteos por estado para diagnosticar
    // por qué un truck no aparece en el marketplace
    #[test]
    fn admin_view_carries_eligibility_counts() {
        let item = search_item(sample_row(), true);
        let eligibility = item.eligibility.expect("admin view includes eligibility");
        assert_eq!(eligibility.total_documents, 3);
        assert_eq!(eligibility.approved_documents, 2);
        assert_eq!(eligibility.pending_documents, 1);
        assert_eq!(eligibility.rejected_documents, 0);
        assert!(!eligibility.documents_verified);
        assert!(eligibility.provider_verified);
        assert!(eligibility.user_active);
    }

    #[test]
    fn customer_view_omits_eligibility() {
        let item = search_item(sample_row(), false);
        assert!(item.eligibility.is_none());
        assert_eq!(item.provider_name, "Ana García");
    }
}
