//! Access token creation and verification.
//!
//! Verification checks the signature and expiry and returns the embedded
//! [`Claims`]. Issuing tokens is exposed for the CLI and the test suite;
//! end-user sign-in belongs to the identity service.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use registrar_config::JwtConfig;
use registrar_core::AppError;
use registrar_models::{UserId, UserRole};

use crate::claims::Claims;

/// Creates a signed access token for `user_id` acting as `role`.
pub fn create_access_token(
    user_id: UserId,
    role: UserRole,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {}", e)))
}

/// Verifies an access token and returns the embedded claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature is invalid, the token
/// has expired or it is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test_secret_key_for_testing_purposes".to_string(),
            access_token_expiry: 3600,
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let config = test_config();
        let token = create_access_token(UserId::new(12), UserRole::Student, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(12));
        assert_eq!(claims.role, UserRole::Student);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_with_wrong_secret() {
        let token = create_access_token(UserId::new(1), UserRole::Admin, &test_config()).unwrap();
        let other = JwtConfig {
            secret: "a_different_secret".to_string(),
            access_token_expiry: 3600,
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_verify_garbage_token() {
        let err = verify_token("not.a.token", &test_config()).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }
}
