//! Identity Extractor
//!
//! Custom extractor pulling the gateway-validated identity headers
//! into a [`CurrentUser`].

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::utils::AppError;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let header = |name: &str| -> Option<String> {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        };

        let id = header("x-user-id")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Missing x-user-id header".to_string()))?;
        let name = header("x-user-name").unwrap_or_else(|| id.clone());
        let role = header("x-user-role")
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::Student);

        let user = CurrentUser { id, name, role };

        // Store in extensions for potential reuse
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}
