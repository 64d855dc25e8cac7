//! Extracción del principal autenticado
//!
//! La autenticación real vive en el edge; este servicio recibe el
//! principal ya resuelto en los headers x-user-id y x-user-role y solo
//! los valida. Sin principal no hay request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::models::user::UserRole;
use crate::utils::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Principal autenticado que se inyecta en los handlers
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".to_string()))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Unauthorized("x-user-id is not a valid UUID".to_string()))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-role header".to_string()))?;

        let role = role
            .parse::<UserRole>()
            .map_err(|_| AppError::Unauthorized(format!("Unknown role '{}'", role)))?;

        Ok(Principal { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<Principal, AppError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        Principal::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_valid_principal() {
        let id = Uuid::new_v4();
        let principal = extract(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_ROLE_HEADER, "provider"),
        ])
        .await
        .unwrap();
        assert_eq!(principal.user_id, id);
        assert_eq!(principal.role, UserRole::Provider);
    }

    #[tokio::test]
    async fn missing_headers_are_unauthorized() {
        assert!(matches!(extract(&[]).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            extract(&[(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "admin")]).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn unknown_role_is_unauthorized() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            extract(&[(USER_ID_HEADER, &id), (USER_ROLE_HEADER, "superuser")]).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
