//! Caller identity, as forwarded by the gateway in front of this service.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use placement_core::model::UserId;
use services::Viewer;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Verified `{user, role}` pair. The headers are trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless the caller is privileged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admin callers.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    #[must_use]
    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.user_id,
            privileged: self.is_privileged(),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)
            .and_then(|raw| raw.parse::<UserId>().ok())
            .ok_or(AppError::Unauthorized)?;
        let role = match header(parts, USER_ROLE_HEADER) {
            None => Role::User,
            Some(raw) => Role::parse(raw).ok_or(AppError::Unauthorized)?,
        };

        Ok(Self { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" user "), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn only_admins_are_privileged() {
        let user = Identity {
            user_id: UserId::new(1),
            role: Role::User,
        };
        assert!(matches!(user.require_admin(), Err(AppError::Forbidden)));
        assert!(!user.viewer().privileged);
    }
}
