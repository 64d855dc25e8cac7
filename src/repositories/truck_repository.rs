//! Repositorio de trucks
//!
//! La búsqueda del marketplace vive aquí: un solo query construido con
//! QueryBuilder sirve la vista de customer (gate de elegibilidad aplicado
//! en SQL) y la de provider/admin (sin gate, con diagnóstico). El estado
//! de verificación nunca se lee de una columna, siempre se agrega desde
//! documents en el mismo query.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::truck_dto::{AvailabilityBucket, TruckSearchParams};
use crate::models::document::Document;
use crate::models::truck::{PricingType, ServiceType, Truck, TruckStatus};
use crate::utils::errors::AppError;

/// Fila del listado de búsqueda: truck + datos del dueño + agregados
/// de documentos + total de la ventana de paginación.
#[derive(Debug, sqlx::FromRow)]
pub struct TruckSearchRow {
    #[sqlx(flatten)]
    pub truck: Truck,
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub provider_verified: bool,
    pub user_active: bool,
    pub total_documents: i64,
    pub approved_documents: i64,
    pub pending_documents: i64,
    pub rejected_documents: i64,
    pub is_rented: bool,
    pub total_count: i64,
}

/// Truck individual con los datos del provider que lo publica
#[derive(Debug, sqlx::FromRow)]
pub struct TruckWithOwner {
    #[sqlx(flatten)]
    pub truck: Truck,
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub provider_user_id: Uuid,
    pub provider_verified: bool,
    pub user_active: bool,
}

/// Construye el query de búsqueda completo a partir de los filtros ya
/// validados. Separado de la ejecución para poder verificar el SQL
/// generado sin base de datos.
fn build_search_query(params: &TruckSearchParams) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT t.*,
               pp.company_name,
               u.first_name,
               u.last_name,
               pp.is_verified AS provider_verified,
               u.is_active AS user_active,
               COUNT(d.id) AS total_documents,
               COUNT(CASE WHEN d.verification_status = 'approved' THEN 1 END) AS approved_documents,
               COUNT(CASE WHEN d.verification_status = 'pending' THEN 1 END) AS pending_documents,
               COUNT(CASE WHEN d.verification_status = 'rejected' THEN 1 END) AS rejected_documents,
               EXISTS(
                   SELECT 1 FROM bookings b
                   WHERE b.truck_id = t.id AND b.status IN ('in_transit', 'active')
               ) AS is_rented,
               COUNT(*) OVER() AS total_count
        FROM trucks t
        JOIN provider_profiles pp ON pp.id = t.provider_id
        JOIN users u ON u.id = pp.user_id
        LEFT JOIN documents d ON d.entity_type = 'truck' AND d.entity_id = t.id
        WHERE t.status = ANY(
        "#,
    );
    qb.push_bind(params.base_statuses.clone());
    qb.push(")");

    if params.customer_gate {
        qb.push(" AND pp.is_verified = TRUE AND u.is_active = TRUE");
    }

    if let Some(owner_user_id) = params.owner_user_id {
        qb.push(" AND pp.user_id = ");
        qb.push_bind(owner_user_id);
    }

    if let Some(service_type) = params.service_type {
        qb.push(" AND t.service_type = ");
        qb.push_bind(service_type);
    }

    if let Some(truck_type) = &params.truck_type {
        qb.push(" AND t.truck_type = ");
        qb.push_bind(truck_type.clone());
    }

    if let Some(pricing_type) = params.pricing_type {
        qb.push(" AND t.pricing_type = ");
        qb.push_bind(pricing_type);
    }

    if let Some(min_capacity) = params.min_capacity {
        qb.push(" AND t.capacity_weight >= ");
        qb.push_bind(min_capacity);
    }

    // Techo de precio: los alquileres solo cotizan por tarifa mensual;
    // para transporte se compara la tarifa indicada por el filtro de
    // pricing_type, o cualquiera de las dos tarifas si no se indicó.
    if let Some(max_price) = params.max_price {
        match (params.service_type, params.pricing_type) {
            (Some(ServiceType::Rental), _) => {
                qb.push(" AND t.monthly_rate IS NOT NULL AND t.monthly_rate <= ");
                qb.push_bind(max_price);
            }
            (_, Some(PricingType::PerKm)) => {
                qb.push(" AND t.price_per_km <= ");
                qb.push_bind(max_price);
            }
            (_, Some(PricingType::Fixed)) => {
                qb.push(" AND t.fixed_price <= ");
                qb.push_bind(max_price);
            }
            _ => {
                qb.push(" AND (t.price_per_km <= ");
                qb.push_bind(max_price);
                qb.push(" OR t.fixed_price <= ");
                qb.push_bind(max_price);
                qb.push(")");
            }
        }
    }

    // El filtro de ubicación solo aplica a alquileres: los trucks de
    // transporte no tienen work_location
    if params.service_type == Some(ServiceType::Rental) {
        if let Some(work_location) = &params.work_location {
            qb.push(" AND t.work_location ILIKE ");
            qb.push_bind(format!("%{}%", work_location));
        }
    }

    if let Some(provider) = &params.provider {
        qb.push(" AND pp.company_name = ");
        qb.push_bind(provider.clone());
    }

    if let Some(search) = &params.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (t.license_plate ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR t.make ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR t.model ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR t.work_location ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    // El bucket de disponibilidad reusa el mismo EXISTS que la columna
    match params.availability {
        AvailabilityBucket::All => {}
        AvailabilityBucket::Available => {
            qb.push(
                " AND NOT EXISTS(SELECT 1 FROM bookings b WHERE b.truck_id = t.id \
                 AND b.status IN ('in_transit', 'active'))",
            );
        }
        AvailabilityBucket::Rented => {
            qb.push(
                " AND EXISTS(SELECT 1 FROM bookings b WHERE b.truck_id = t.id \
                 AND b.status IN ('in_transit', 'active'))",
            );
        }
    }

    qb.push(" GROUP BY t.id, pp.id, u.id");

    if params.customer_gate {
        qb.push(
            " HAVING COUNT(d.id) > 0 AND COUNT(d.id) = \
             COUNT(CASE WHEN d.verification_status = 'approved' THEN 1 END)",
        );
    }

    qb.push(" ORDER BY t.created_at DESC LIMIT ");
    qb.push_bind(params.limit);
    qb.push(" OFFSET ");
    qb.push_bind(params.offset);

    qb
}

pub struct TruckRepository {
    pool: PgPool,
}

impl TruckRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Búsqueda paginada del marketplace. `params.customer_gate` decide si
    /// se aplica el filtro de elegibilidad (provider verificado, cuenta
    /// activa, todos los documentos aprobados y al menos uno).
    pub async fn search(&self, params: &TruckSearchParams) -> Result<Vec<TruckSearchRow>, AppError> {
        let rows = build_search_query(params)
            .build_query_as::<TruckSearchRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TruckWithOwner>, AppError> {
        let row = sqlx::query_as::<_, TruckWithOwner>(
            r#"
            SELECT t.*,
                   pp.company_name,
                   u.first_name,
                   u.last_name,
                   pp.user_id AS provider_user_id,
                   pp.is_verified AS provider_verified,
                   u.is_active AS user_active
            FROM trucks t
            JOIN provider_profiles pp ON pp.id = t.provider_id
            JOIN users u ON u.id = pp.user_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn documents(&self, truck_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, entity_type, entity_id, document_type, file_name,
                   verification_status, uploaded_at
            FROM documents
            WHERE entity_type = 'truck' AND entity_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(truck_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    pub async fn set_status(&self, id: Uuid, status: TruckStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE trucks SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Acumula el precio de un booking completado en el total del truck
    pub async fn add_revenue(&self, id: Uuid, amount: rust_decimal::Decimal) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE trucks SET total_revenue = total_revenue + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Borrado físico. Los bookings terminales sobreviven con truck_id NULL
    /// por el ON DELETE SET NULL de la FK.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM trucks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn base_params() -> TruckSearchParams {
        TruckSearchParams {
            base_statuses: vec![TruckStatus::Active],
            customer_gate: true,
            owner_user_id: None,
            search: None,
            service_type: None,
            truck_type: None,
            pricing_type: None,
            min_capacity: None,
            max_price: None,
            work_location: None,
            provider: None,
            availability: AvailabilityBucket::All,
            limit: 10,
            offset: 0,
        }
    }

    #[test]
    fn customer_gate_adds_verification_where_and_having() {
        let sql = build_search_query(&base_params()).into_sql();
        assert!(sql.contains("pp.is_verified = TRUE AND u.is_active = TRUE"));
        assert!(sql.contains("HAVING COUNT(d.id) > 0"));
    }

    #[test]
    fn provider_view_skips_the_gate() {
        let mut params = base_params();
        params.customer_gate = false;
        let sql = build_search_query(&params).into_sql();
        assert!(!sql.contains("pp.is_verified = TRUE"));
        assert!(!sql.contains("HAVING"));
    }

    #[test]
    fn truck_type_filter_is_exact_match() {
        let mut params = base_params();
        params.truck_type = Some("flatbed".to_string());
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("t.truck_type = "));
        assert!(!sql.contains("t.truck_type ILIKE"));
    }

    // Sin filtro de pricing_type, un truck de transporte califica si
    // cualquiera de sus dos tarifas queda bajo el techo
    #[test]
    fn max_price_without_pricing_type_checks_both_transport_rates() {
        let mut params = base_params();
        params.max_price = Some(Decimal::from(4));
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("(t.price_per_km <= "));
        assert!(sql.contains(" OR t.fixed_price <= "));
        assert!(!sql.contains("t.pricing_type = 'per_km'"));
    }

    #[test]
    fn max_price_with_pricing_type_checks_only_that_rate() {
        let mut params = base_params();
        params.max_price = Some(Decimal::from(4));
        params.pricing_type = Some(PricingType::PerKm);
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("t.price_per_km <= "));
        assert!(!sql.contains("t.fixed_price <= "));
    }

    #[test]
    fn max_price_on_rentals_checks_monthly_rate() {
        let mut params = base_params();
        params.max_price = Some(Decimal::from(3000));
        params.service_type = Some(ServiceType::Rental);
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("t.monthly_rate IS NOT NULL AND t.monthly_rate <= "));
        assert!(!sql.contains("t.price_per_km <= "));
    }

    // work_location solo filtra alquileres: aplicado a transporte
    // excluiría todos los trucks con work_location NULL
    #[test]
    fn work_location_filter_applies_only_to_rentals() {
        let mut params = base_params();
        params.work_location = Some("Madrid".to_string());
        let sql = build_search_query(&params).into_sql();
        assert!(!sql.contains("t.work_location ILIKE"));

        params.service_type = Some(ServiceType::Rental);
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("t.work_location ILIKE"));
    }

    #[test]
    fn availability_buckets_toggle_the_exists_clause() {
        let mut params = base_params();
        params.availability = AvailabilityBucket::Available;
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("AND NOT EXISTS(SELECT 1 FROM bookings"));

        params.availability = AvailabilityBucket::Rented;
        let sql = build_search_query(&params).into_sql();
        assert!(sql.contains("AND EXISTS(SELECT 1 FROM bookings"));
    }
}
