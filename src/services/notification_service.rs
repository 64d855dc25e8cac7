//! Servicio de notificaciones
//!
//! Las notificaciones son fire-and-forget: un fallo aquí se loguea y la
//! operación que lo disparó sigue adelante. Por eso los métodos no
//! devuelven Result.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

/// Sumidero de eventos del ciclo de vida. La implementación de producción
/// publica a los canales que correspondan; la de referencia solo loguea.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn booking_created(&self, booking_id: Uuid, customer_id: Uuid, truck_id: Uuid);

    async fn booking_status_changed(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        changed_by: Uuid,
    );

    async fn truck_deleted(&self, truck_id: Uuid, license_plate: &str, deleted_by: Uuid);
}

/// Implementación por defecto: log estructurado y nada más
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn booking_created(&self, booking_id: Uuid, customer_id: Uuid, truck_id: Uuid) {
        info!(
            %booking_id, %customer_id, %truck_id,
            "📦 Booking creado, pendiente de revisión del provider"
        );
    }

    async fn booking_status_changed(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        changed_by: Uuid,
    ) {
        info!(
            %booking_id, %changed_by,
            "🔄 Booking {} -> {}",
            from, to
        );
    }

    async fn truck_deleted(&self, truck_id: Uuid, license_plate: &str, deleted_by: Uuid) {
        info!(
            %truck_id, %deleted_by,
            "🗑️ Truck {} eliminado del marketplace",
            license_plate
        );
    }
}
