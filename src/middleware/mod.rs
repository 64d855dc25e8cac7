//! Middleware del sistema
//!
//! Este módulo contiene el middleware para extracción del principal
//! autenticado y CORS.

pub mod cors;
pub mod principal;

pub use cors::*;
pub use principal::*;
