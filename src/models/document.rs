//! Modelo de Document
//!
//! Documentos de cumplimiento adjuntos a un truck. El estado agregado de
//! verificación de un truck se deriva de sus documentos, nunca se almacena.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de verificación - mapea al ENUM verification_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Document principal - mapea exactamente a la tabla documents
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub document_type: String,
    pub file_name: String,
    pub verification_status: VerificationStatus,
    pub uploaded_at: DateTime<Utc>,
}
