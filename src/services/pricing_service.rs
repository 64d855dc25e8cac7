//! Servicio de pricing
//!
//! El precio de un booking se calcula una sola vez en la creación y queda
//! estampado; después es inmutable. La tarifa sale del rate card del truck
//! y, para transporte por kilómetro, de una estimación de distancia que
//! puede venir de Google Distance Matrix o de un fallback fijo.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::truck::{PricingType, Truck};
use crate::utils::errors::AppError;

/// Distancia asumida cuando no hay estimación real disponible
pub const FALLBACK_DISTANCE_KM: i64 = 200;

/// Resultado de una cotización
#[derive(Debug, Clone)]
pub struct PriceQuote {
    pub total_price: Decimal,
    pub estimated_distance: Option<Decimal>,
}

/// Datos del servicio pedido, ya validados por el controller
#[derive(Debug, Clone)]
pub enum QuoteRequest {
    Transport {
        pickup_city: String,
        destination_city: String,
    },
    Rental {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Oráculo de precios. Un fallo aquí aborta la creación del booking con
/// 503, nunca se crea un booking sin precio.
#[async_trait]
pub trait PricingOracle: Send + Sync {
    async fn quote(&self, truck: &Truck, request: &QuoteRequest) -> Result<PriceQuote, AppError>;
}

/// Precio de alquiler prorrateado desde la tarifa mensual.
/// Menos de 30 días paga la proporción diaria (tarifa/30 por día,
/// redondeada a 2 decimales); 30 días o más paga meses completos
/// redondeando hacia arriba. Siempre se cobra al menos un día.
pub fn rental_price(start: DateTime<Utc>, end: DateTime<Utc>, monthly_rate: Decimal) -> Decimal {
    let seconds = (end - start).num_seconds().max(0);
    let days = ((seconds + 86_399) / 86_400).max(1);

    if days >= 30 {
        let months = (days + 29) / 30;
        monthly_rate * Decimal::from(months)
    } else {
        (monthly_rate / Decimal::from(30) * Decimal::from(days)).round_dp(2)
    }
}

/// Duración en horas enteras, redondeando hacia arriba
pub fn rental_duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let minutes = (end - start).num_minutes().max(0);
    ((minutes + 59) / 60) as i32
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<DistanceValue>,
}

#[derive(Debug, Deserialize)]
struct DistanceValue {
    // metros
    value: i64,
}

/// Cliente de distancias entre ciudades. Sin API key, o ante cualquier
/// fallo de la API, degrada al fallback fijo en vez de tumbar la creación.
pub struct DistanceClient {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DistanceClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }

    pub async fn distance_km(&self, origin: &str, destination: &str) -> Decimal {
        let Some(api_key) = &self.api_key else {
            warn!(
                "🗺️ Sin API key de distancias, usando fallback de {} km para {} -> {}",
                FALLBACK_DISTANCE_KM, origin, destination
            );
            return Decimal::from(FALLBACK_DISTANCE_KM);
        };

        match self.fetch_distance(api_key, origin, destination).await {
            Ok(km) => {
                info!("🗺️ Distancia estimada {} -> {}: {} km", origin, destination, km);
                km
            }
            Err(e) => {
                warn!(
                    "⚠️ Estimación de distancia falló ({}), usando fallback de {} km",
                    e, FALLBACK_DISTANCE_KM
                );
                Decimal::from(FALLBACK_DISTANCE_KM)
            }
        }
    }

    async fn fetch_distance(
        &self,
        api_key: &str,
        origin: &str,
        destination: &str,
    ) -> Result<Decimal, anyhow::Error> {
        let url = "https://maps.googleapis.com/maps/api/distancematrix/json";
        let response = self
            .client
            .get(url)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DistanceMatrixResponse>()
            .await?;

        let element = response
            .rows
            .first()
            .and_then(|r| r.elements.first())
            .ok_or_else(|| anyhow::anyhow!("empty distance matrix response"))?;

        if element.status != "OK" {
            anyhow::bail!("distance matrix element status: {}", element.status);
        }

        let meters = element
            .distance
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("distance missing in response"))?
            .value;

        Ok((Decimal::from(meters) / Decimal::from(1000)).round_dp(1))
    }
}

/// Implementación de producción: rate card del truck + cliente de distancias
pub struct RateCardPricing {
    distance: DistanceClient,
}

impl RateCardPricing {
    pub fn new(distance: DistanceClient) -> Self {
        Self { distance }
    }
}

#[async_trait]
impl PricingOracle for RateCardPricing {
    async fn quote(&self, truck: &Truck, request: &QuoteRequest) -> Result<PriceQuote, AppError> {
        match request {
            QuoteRequest::Transport {
                pickup_city,
                destination_city,
            } => match truck.pricing_type {
                PricingType::Fixed => {
                    let fixed = truck.fixed_price.ok_or_else(|| {
                        AppError::PricingUnavailable(
                            "Truck has fixed pricing but no fixed price set".to_string(),
                        )
                    })?;
                    Ok(PriceQuote {
                        total_price: fixed,
                        estimated_distance: None,
                    })
                }
                PricingType::PerKm => {
                    let rate = truck.price_per_km.ok_or_else(|| {
                        AppError::PricingUnavailable(
                            "Truck has per-km pricing but no rate set".to_string(),
                        )
                    })?;
                    let km = self.distance.distance_km(pickup_city, destination_city).await;
                    Ok(PriceQuote {
                        total_price: (rate * km).round_dp(2),
                        estimated_distance: Some(km),
                    })
                }
                PricingType::Monthly => Err(AppError::PricingUnavailable(
                    "Monthly pricing does not apply to transport bookings".to_string(),
                )),
            },

            QuoteRequest::Rental { start, end } => {
                let monthly_rate = truck.monthly_rate.ok_or_else(|| {
                    AppError::PricingUnavailable(
                        "Truck has no monthly rate set for rental".to_string(),
                    )
                })?;
                Ok(PriceQuote {
                    total_price: rental_price(*start, *end, monthly_rate),
                    estimated_distance: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn rental_under_a_month_is_prorated_per_day() {
        // 10 días a 3000/mes -> 100/día
        let price = rental_price(at(2025, 6, 1, 8), at(2025, 6, 11, 8), Decimal::from(3000));
        assert_eq!(price, Decimal::from(1000));
    }

    #[test]
    fn rental_partial_day_counts_as_full_day() {
        // 2 días y 1 hora -> 3 días
        let price = rental_price(at(2025, 6, 1, 8), at(2025, 6, 3, 9), Decimal::from(3000));
        assert_eq!(price, Decimal::from(300));
    }

    #[test]
    fn rental_of_exactly_thirty_days_pays_one_month() {
        let price = rental_price(at(2025, 6, 1, 0), at(2025, 7, 1, 0), Decimal::from(3000));
        assert_eq!(price, Decimal::from(3000));
    }

    #[test]
    fn rental_over_a_month_rounds_months_up() {
        // 45 días -> 2 meses
        let price = rental_price(at(2025, 6, 1, 0), at(2025, 7, 16, 0), Decimal::from(3000));
        assert_eq!(price, Decimal::from(6000));
    }

    #[test]
    fn rental_minimum_charge_is_one_day() {
        // 2 horas -> 1 día
        let price = rental_price(at(2025, 6, 1, 8), at(2025, 6, 1, 10), Decimal::from(3000));
        assert_eq!(price, Decimal::from(100));
    }

    #[test]
    fn daily_proration_rounds_to_two_decimals() {
        // 1000/30 = 33.333... -> 33.33
        let price = rental_price(at(2025, 6, 1, 0), at(2025, 6, 2, 0), Decimal::from(1000));
        assert_eq!(price, Decimal::new(3333, 2));
    }

    #[test]
    fn duration_hours_rounds_up() {
        assert_eq!(rental_duration_hours(at(2025, 6, 1, 8), at(2025, 6, 1, 10)), 2);
        let end = at(2025, 6, 1, 10) + chrono::Duration::minutes(30);
        assert_eq!(rental_duration_hours(at(2025, 6, 1, 8), end), 3);
    }
}
