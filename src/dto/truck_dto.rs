//! DTOs de búsqueda de trucks
//!
//! Los filtros llegan como strings y se parsean contra los enums del
//! dominio en el controller; un valor desconocido es InvalidFilter, no
//! un error de deserialización.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::document::Document;
use crate::models::truck::{PricingType, ServiceType, Truck, TruckStatus};

/// Bucket de disponibilidad: metadato informativo, no es parte del gate
/// de visibilidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityBucket {
    All,
    Available,
    Rented,
}

impl FromStr for AvailabilityBucket {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AvailabilityBucket::All),
            "available" => Ok(AvailabilityBucket::Available),
            "rented" => Ok(AvailabilityBucket::Rented),
            _ => Err(()),
        }
    }
}

/// Filtros de búsqueda tal como llegan por query string
#[derive(Debug, Default, Deserialize)]
pub struct TruckSearchFilters {
    pub search: Option<String>,
    pub service_type: Option<String>,
    pub truck_type: Option<String>,
    pub pricing_type: Option<String>,
    pub min_capacity: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub work_location: Option<String>,
    pub provider: Option<String>,
    pub availability: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Filtros ya validados contra el dominio
#[derive(Debug, Clone)]
pub struct TruckSearchParams {
    pub base_statuses: Vec<TruckStatus>,
    pub customer_gate: bool,
    /// Restringe el listado a los trucks de este provider (vista "mis trucks")
    pub owner_user_id: Option<Uuid>,
    pub search: Option<String>,
    pub service_type: Option<ServiceType>,
    pub truck_type: Option<String>,
    pub pricing_type: Option<PricingType>,
    pub min_capacity: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub work_location: Option<String>,
    pub provider: Option<String>,
    pub availability: AvailabilityBucket,
    pub limit: i64,
    pub offset: i64,
}

/// Diagnóstico de elegibilidad por truck para vistas de provider/admin:
/// explica por qué un truck pasa o no el gate de visibilidad.
#[derive(Debug, Serialize)]
pub struct TruckEligibility {
    pub total_documents: i64,
    pub approved_documents: i64,
    pub pending_documents: i64,
    pub rejected_documents: i64,
    pub provider_verified: bool,
    pub user_active: bool,
    pub documents_verified: bool,
}

/// Item del listado de búsqueda
#[derive(Debug, Serialize)]
pub struct TruckSearchItem {
    pub id: Uuid,
    pub service_type: ServiceType,
    pub truck_type: String,
    pub license_plate: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub capacity_weight: Decimal,
    pub capacity_volume: Option<Decimal>,
    pub pricing_type: PricingType,
    pub price_per_km: Option<Decimal>,
    pub fixed_price: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub work_location: Option<String>,
    pub status: TruckStatus,
    pub company_name: String,
    pub provider_name: String,
    pub is_rented: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<TruckEligibility>,
}

/// Detalle de un truck con sus documentos
#[derive(Debug, Serialize)]
pub struct TruckDetailResponse {
    pub truck: Truck,
    pub company_name: String,
    pub provider_name: String,
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<TruckEligibility>,
}
