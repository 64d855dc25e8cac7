//! Modelo de User
//!
//! Roles del marketplace. El principal autenticado llega desde el edge
//! con un user id y uno de estos roles ya resueltos.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::str::FromStr;

/// Rol del usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Provider,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Provider => "provider",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "provider" => Ok(UserRole::Provider),
            "admin" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("customer".parse::<UserRole>(), Ok(UserRole::Customer));
        assert_eq!("provider".parse::<UserRole>(), Ok(UserRole::Provider));
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("superuser".parse::<UserRole>().is_err());
        assert!("Customer".parse::<UserRole>().is_err());
    }
}
