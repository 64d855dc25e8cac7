//! Modelo de Truck
//!
//! Un Truck cubre tanto camiones de transporte como equipos de alquiler
//! (service_type decide cuál). Mapea a la tabla trucks del schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use uuid::Uuid;

/// Estado del truck - mapea al ENUM truck_status.
/// Solo 'active' es elegible para el marketplace público.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "truck_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TruckStatus {
    Active,
    Inactive,
    Rented,
    Maintenance,
}

impl sqlx::postgres::PgHasArrayType for TruckStatus {
    fn array_type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("_truck_status")
    }
}

/// Tipo de servicio - mapea al ENUM service_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Transport,
    Rental,
}

/// Modelo de precio - mapea al ENUM pricing_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "pricing_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    PerKm,
    Fixed,
    Monthly,
}

/// Truck principal - mapea exactamente a la tabla trucks
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Truck {
    pub id: Uuid,
    pub provider_id: Uuid,
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
    pub total_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agregado de elegibilidad por truck: conteos de documentos por estado
/// de verificación. Se deriva siempre, nunca se almacena.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DocumentStats {
    pub total: i64,
    pub approved: i64,
    pub pending: i64,
    pub rejected: i64,
}

impl DocumentStats {
    /// Regla del gate de visibilidad: al menos un documento y todos
    /// aprobados. Cero documentos nunca pasa.
    pub fn all_approved(&self) -> bool {
        self.total > 0 && self.total == self.approved
    }
}

impl FromStr for TruckStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TruckStatus::Active),
            "inactive" => Ok(TruckStatus::Inactive),
            "rented" => Ok(TruckStatus::Rented),
            "maintenance" => Ok(TruckStatus::Maintenance),
            _ => Err(()),
        }
    }
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Transport => "transport",
            ServiceType::Rental => "rental",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transport" => Ok(ServiceType::Transport),
            "rental" => Ok(ServiceType::Rental),
            _ => Err(()),
        }
    }
}

impl FromStr for PricingType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_km" => Ok(PricingType::PerKm),
            "fixed" => Ok(PricingType::Fixed),
            "monthly" => Ok(PricingType::Monthly),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_documents_never_pass_the_gate() {
        let stats = DocumentStats { total: 0, approved: 0, pending: 0, rejected: 0 };
        assert!(!stats.all_approved());
    }

    #[test]
    fn pending_document_fails_the_gate() {
        let stats = DocumentStats { total: 3, approved: 2, pending: 1, rejected: 0 };
        assert!(!stats.all_approved());
    }

    #[test]
    fn rejected_document_fails_the_gate() {
        let stats = DocumentStats { total: 2, approved: 1, pending: 0, rejected: 1 };
        assert!(!stats.all_approved());
    }

    #[test]
    fn all_approved_passes_the_gate() {
        let stats = DocumentStats { total: 3, approved: 3, pending: 0, rejected: 0 };
        assert!(stats.all_approved());
    }

    #[test]
    fn pricing_type_parses_snake_case() {
        assert_eq!("per_km".parse::<PricingType>(), Ok(PricingType::PerKm));
        assert!("per-km".parse::<PricingType>().is_err());
    }
}
