//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! de búsqueda y paginación.

use crate::utils::errors::AppError;

/// Límite máximo de resultados por página
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validar y normalizar parámetros de paginación.
/// page y limit deben ser >= 1; limit se recorta a MAX_PAGE_SIZE.
pub fn validate_pagination(
    page: Option<i64>,
    limit: Option<i64>,
    default_limit: i64,
) -> Result<(i64, i64), AppError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(default_limit);

    if page < 1 {
        return Err(AppError::InvalidPagination(format!(
            "page must be >= 1, got {}",
            page
        )));
    }
    if limit < 1 {
        return Err(AppError::InvalidPagination(format!(
            "limit must be >= 1, got {}",
            limit
        )));
    }

    Ok((page, limit.min(MAX_PAGE_SIZE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_apply() {
        let (page, limit) = validate_pagination(None, None, 10).unwrap();
        assert_eq!(page, 1);
        assert_eq!(limit, 10);
    }

    #[test]
    fn pagination_rejects_zero_page() {
        assert!(matches!(
            validate_pagination(Some(0), Some(10), 10),
            Err(AppError::InvalidPagination(_))
        ));
    }

    #[test]
    fn pagination_rejects_negative_limit() {
        assert!(matches!(
            validate_pagination(Some(1), Some(-5), 10),
            Err(AppError::InvalidPagination(_))
        ));
    }

    #[test]
    fn pagination_caps_limit() {
        let (_, limit) = validate_pagination(Some(1), Some(5000), 10).unwrap();
        assert_eq!(limit, MAX_PAGE_SIZE);
    }
}
