use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Claims issued by the identity provider. `sub` is the external user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Resolve the user a request acts on. An explicit id must match the
    /// token subject; an absent one defaults to it.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&str, AppError> {
        match requested.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) if id != self.user_id => Err(AppError::Forbidden),
            _ => Ok(&self.user_id),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::Unauthorized)?;
        decode_token(token, &state.config.jwt_secret)
    }
}

/// Anonymous requests yield `None`; a malformed or expired token is still
/// rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => decode_token(token, &state.config.jwt_secret).map(Some),
            None => Ok(None),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;
    Ok(Some(token))
}

fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "rejected bearer token");
        AppError::Unauthorized
    })?;

    Ok(AuthUser {
        user_id: decoded.claims.sub,
        email: decoded.claims.email,
    })
}

/// Sign a token the extractor accepts. Used by the seed binary and tests.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    email: Option<&str>,
    ttl: chrono::Duration,
) -> Result<String, AppError> {
    let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            user_id: "user_1".into(),
            email: None,
        }
    }

    #[test]
    fn omitted_user_id_defaults_to_subject() {
        assert_eq!(user().resolve(None).unwrap(), "user_1");
        assert_eq!(user().resolve(Some("  ")).unwrap(), "user_1");
    }

    #[test]
    fn issued_token_decodes_to_same_subject() {
        let token = issue_token("secret", "user_9", Some("u9@example.com"), chrono::Duration::hours(1)).unwrap();
        let user = decode_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, "user_9");
        assert_eq!(user.email.as_deref(), Some("u9@example.com"));
        assert!(matches!(decode_token(&token, "other"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn mismatched_user_id_is_forbidden() {
        assert!(matches!(user().resolve(Some("user_2")), Err(AppError::Forbidden)));
    }
}
