//! Repositorio de bookings
//!
//! Las transiciones de estado usan compare-and-set: el UPDATE exige el
//! estado de partida que el caller validó, y cero filas afectadas
//! significa que otro request ganó la carrera. Transición e historial
//! van siempre en la misma transacción.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::booking_dto::BookingListFilters;
use crate::models::booking::{Booking, BookingStatus, NewBooking, StatusHistoryEntry};
use crate::models::truck::ServiceType;
use crate::utils::errors::{AppError, BlockingBooking};

/// Booking con el contexto de ambas partes. Los campos del truck y del
/// provider son Option porque el truck puede haber sido borrado
/// (truck_id queda NULL por la FK).
#[derive(Debug, sqlx::FromRow)]
pub struct BookingRecord {
    #[sqlx(flatten)]
    pub booking: Booking,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
    pub provider_user_id: Option<Uuid>,
    pub provider_company: Option<String>,
    pub truck_license_plate: Option<String>,
    pub truck_type: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct BookingListRow {
    #[sqlx(flatten)]
    pub record: BookingRecord,
    pub total_count: i64,
}

/// Entrada de historial con el nombre de quien hizo el cambio
#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
    #[sqlx(flatten)]
    pub entry: StatusHistoryEntry,
    pub changed_by_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct BlockingRow {
    id: Uuid,
    status: BookingStatus,
    counterpart: String,
    reference_date: Option<NaiveDate>,
}

/// Alcance del listado según el rol del principal
#[derive(Debug, Clone, Copy)]
pub enum BookingScope {
    Customer(Uuid),
    Provider(Uuid),
    All,
}

const RECORD_SELECT: &str = r#"
    SELECT b.*,
           cu.first_name AS customer_first_name,
           cu.last_name AS customer_last_name,
           cu.email AS customer_email,
           pp.user_id AS provider_user_id,
           pp.company_name AS provider_company,
           t.license_plate AS truck_license_plate,
           t.truck_type AS truck_type
    FROM bookings b
    JOIN users cu ON cu.id = b.customer_id
    LEFT JOIN trucks t ON t.id = b.truck_id
    LEFT JOIN provider_profiles pp ON pp.id = t.provider_id
"#;

pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crea el booking en pending_review y la primera entrada del historial,
    /// ambos en una transacción.
    pub async fn create(&self, new: NewBooking) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, customer_id, truck_id, service_type, status,
                pickup_address, pickup_city, destination_address, destination_city,
                pickup_date, pickup_time, cargo_description, cargo_weight, cargo_volume,
                estimated_distance,
                rental_start_datetime, rental_end_datetime, work_address,
                purpose_description, rental_duration_hours,
                total_price, notes, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, 'pending_review',
                $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                $14,
                $15, $16, $17,
                $18, $19,
                $20, $21, NOW(), NOW()
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.customer_id)
        .bind(new.truck_id)
        .bind(new.service_type)
        .bind(&new.pickup_address)
        .bind(&new.pickup_city)
        .bind(&new.destination_address)
        .bind(&new.destination_city)
        .bind(new.pickup_date)
        .bind(new.pickup_time)
        .bind(&new.cargo_description)
        .bind(new.cargo_weight)
        .bind(new.cargo_volume)
        .bind(new.estimated_distance)
        .bind(new.rental_start_datetime)
        .bind(new.rental_end_datetime)
        .bind(&new.work_address)
        .bind(&new.purpose_description)
        .bind(new.rental_duration_hours)
        .bind(new.total_price)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO booking_status_history (id, booking_id, status, changed_by, notes, created_at)
            VALUES ($1, $2, 'pending_review', $3, 'Booking created', NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.id)
        .bind(new.customer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(booking)
    }

    pub async fn find_record(&self, id: Uuid) -> Result<Option<BookingRecord>, AppError> {
        let record = sqlx::query_as::<_, BookingRecord>(
            &format!("{} WHERE b.id = $1", RECORD_SELECT),
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Listado paginado con alcance por rol y filtros opcionales
    pub async fn list(
        &self,
        scope: BookingScope,
        filters: &BookingListFilters,
        status: Option<BookingStatus>,
        service_type: Option<ServiceType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookingListRow>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT b.*,
                   cu.first_name AS customer_first_name,
                   cu.last_name AS customer_last_name,
                   cu.email AS customer_email,
                   pp.user_id AS provider_user_id,
                   pp.company_name AS provider_company,
                   t.license_plate AS truck_license_plate,
                   t.truck_type AS truck_type,
                   COUNT(*) OVER() AS total_count
            FROM bookings b
            JOIN users cu ON cu.id = b.customer_id
            LEFT JOIN trucks t ON t.id = b.truck_id
            LEFT JOIN provider_profiles pp ON pp.id = t.provider_id
            WHERE 1 = 1
            "#,
        );

        match scope {
            BookingScope::Customer(user_id) => {
                qb.push(" AND b.customer_id = ");
                qb.push_bind(user_id);
            }
            // El alcance del provider se resuelve a través del truck:
            // si el truck fue borrado (truck_id NULL) sus bookings
            // terminales salen del listado del provider, aunque el
            // customer y el admin los siguen viendo.
            BookingScope::Provider(user_id) => {
                qb.push(" AND pp.user_id = ");
                qb.push_bind(user_id);
            }
            BookingScope::All => {}
        }

        if let Some(status) = status {
            qb.push(" AND b.status = ");
            qb.push_bind(status);
        }

        if let Some(service_type) = service_type {
            qb.push(" AND b.service_type = ");
            qb.push_bind(service_type);
        }

        if let Some(date_from) = filters.date_from {
            qb.push(" AND b.created_at::date >= ");
            qb.push_bind(date_from);
        }

        if let Some(date_to) = filters.date_to {
            qb.push(" AND b.created_at::date <= ");
            qb.push_bind(date_to);
        }

        if let Some(search) = &filters.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (t.license_plate ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR b.pickup_city ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR b.destination_city ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR cu.first_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR cu.last_name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR pp.company_name ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        qb.push(" ORDER BY b.created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<BookingListRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Bookings de un truck concreto, más recientes primero
    pub async fn list_for_truck(&self, truck_id: Uuid) -> Result<Vec<BookingRecord>, AppError> {
        let records = sqlx::query_as::<_, BookingRecord>(
            &format!("{} WHERE b.truck_id = $1 ORDER BY b.created_at DESC", RECORD_SELECT),
        )
        .bind(truck_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Transición compare-and-set. Cero filas afectadas con el estado de
    /// partida exigido significa modificación concurrente, no not-found:
    /// el caller ya comprobó que el booking existe.
    pub async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        changed_by: Uuid,
        notes: Option<&str>,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::ConcurrentModification { booking_id: id })?;

        sqlx::query(
            r#"
            INSERT INTO booking_status_history (id, booking_id, status, changed_by, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(to)
        .bind(changed_by)
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(booking)
    }

    /// Historial completo, más reciente primero
    pub async fn history(&self, booking_id: Uuid) -> Result<Vec<HistoryRow>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT h.*,
                   CASE WHEN u.id IS NULL THEN NULL
                        ELSE u.first_name || ' ' || u.last_name
                   END AS changed_by_name
            FROM booking_status_history h
            LEFT JOIN users u ON u.id = h.changed_by
            WHERE h.booking_id = $1
            ORDER BY h.created_at DESC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// True si el rango pedido pisa un booking de alquiler no terminal
    /// del mismo truck.
    pub async fn rental_overlap_exists(
        &self,
        truck_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE truck_id = $1
                  AND service_type = 'rental'
                  AND status NOT IN ('completed', 'cancelled')
                  AND rental_start_datetime < $3
                  AND rental_end_datetime > $2
            )
            "#,
        )
        .bind(truck_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Bookings no terminales que bloquean el borrado de un truck
    pub async fn active_for_truck(&self, truck_id: Uuid) -> Result<Vec<BlockingBooking>, AppError> {
        let rows = sqlx::query_as::<_, BlockingRow>(
            r#"
            SELECT b.id,
                   b.status,
                   cu.first_name || ' ' || cu.last_name AS counterpart,
                   COALESCE(b.pickup_date, b.rental_start_datetime::date) AS reference_date
            FROM bookings b
            JOIN users cu ON cu.id = b.customer_id
            WHERE b.truck_id = $1
              AND b.status NOT IN ('completed', 'cancelled')
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(truck_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BlockingBooking {
                id: r.id,
                status: r.status,
                counterpart: r.counterpart,
                reference_date: r.reference_date,
            })
            .collect())
    }

    /// Borrado físico; el historial cae en cascada por la FK.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
