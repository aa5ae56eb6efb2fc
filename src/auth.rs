//! Caller identity
//!
//! Bearer tokens are minted by the identity service; this module only
//! verifies them and exposes the caller's id and permission set to
//! handlers through the `AuthUser` extractor.

use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const RESOLVE_DISPUTES: &str = "resolve_disputes";
pub const SHOW_TRANSACTIONS: &str = "show_transactions";

/// Token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Verification key shared through application state
#[derive(Clone)]
pub struct AuthKeys {
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Fails with Forbidden unless the caller holds `permission`.
    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        if self.permissions.iter().any(|p| p == permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing required permission: {permission}"
            )))
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let keys = AuthKeys::from_ref(state);
        let claims = keys.verify(bearer.token())?;

        Ok(AuthUser {
            id: claims.sub,
            permissions: claims.permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_a_valid_token() {
        let keys = AuthKeys::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = mint(
            "test-secret",
            &Claims {
                sub: user_id,
                permissions: vec![RESOLVE_DISPUTES.to_string()],
                exp: (chrono::Utc::now().timestamp()) + 600,
            },
        );

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.permissions, vec![RESOLVE_DISPUTES.to_string()]);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let keys = AuthKeys::new("test-secret");
        let claims = Claims {
            sub: Uuid::new_v4(),
            permissions: vec![],
            exp: chrono::Utc::now().timestamp() + 600,
        };
        assert!(keys.verify(&mint("other-secret", &claims)).is_err());

        let expired = Claims {
            exp: chrono::Utc::now().timestamp() - 600,
            ..claims
        };
        assert!(keys.verify(&mint("test-secret", &expired)).is_err());
    }

    #[test]
    fn permission_check() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            permissions: vec![SHOW_TRANSACTIONS.to_string()],
        };
        assert!(user.require(SHOW_TRANSACTIONS).is_ok());
        assert!(matches!(
            user.require(RESOLVE_DISPUTES),
            Err(AppError::Forbidden(_))
        ));
    }
}
