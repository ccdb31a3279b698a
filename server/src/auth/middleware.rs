//! Bearer token extraction.
//!
//! The token names the user. When `AUTH_SECRET` is configured the token must
//! be `userId:secret`; otherwise the whole token is taken as the user id.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use tote_engine::{CollectionPath, UserId};

use crate::AppState;

/// Authenticated user extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl AuthUser {
    /// Resolve a bearer token against the configured secret.
    pub fn from_token(token: &str, secret: Option<&str>) -> Result<Self, &'static str> {
        let user_id = match secret {
            Some(secret) => match token.rsplit_once(':') {
                Some((user_id, given)) if given == secret => user_id,
                Some(_) => return Err("Invalid bearer token"),
                None => return Err("Bearer token must be userId:secret"),
            },
            None => token,
        };

        if user_id.is_empty() {
            return Err("Empty bearer token");
        }

        Ok(AuthUser {
            user_id: user_id.to_string(),
        })
    }

    /// Users may only touch collections under their own id.
    pub fn can_access(&self, path: &CollectionPath) -> bool {
        self.user_id == path.user_id
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").trim();
                AuthUser::from_token(token, state.config.auth_secret.as_deref())
                    .map_err(|reason| (StatusCode::UNAUTHORIZED, reason))
            }
            Some(_) => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
            None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}
