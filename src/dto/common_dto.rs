use serde::Serialize;

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

// Metadatos de paginación para listados
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub limit: i64,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + limit - 1) / limit
        };
        Self {
            current_page: page,
            total_pages,
            total_count,
            limit,
        }
    }
}

// Resultado paginado, orden estable por fecha de creación descendente
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_total_pages_up() {
        let meta = PaginationMeta::new(1, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.total_count, 25);
    }

    #[test]
    fn pagination_meta_empty_result() {
        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
    }
}
