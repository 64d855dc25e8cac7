//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL, más la lógica pura del dominio (tabla de
//! transiciones y agregado de elegibilidad).

pub mod booking;
pub mod document;
pub mod truck;
pub mod user;
