//! JWT claim structures.
//!
//! The identity service issues access tokens; the API only reads who the
//! caller is and which role they hold. No further lookups are needed to
//! decide whether a caller may reach an endpoint.

use registrar_core::AppError;
use registrar_models::{UserId, UserRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JWT claims for access tokens.
///
/// - `sub`: User ID (subject)
/// - `role`: The caller's system role
/// - `exp`: Token expiration timestamp
/// - `iat`: Token issued-at timestamp
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// System role of the user
    pub role: UserRole,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Parses the subject claim into a [`UserId`].
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialize() {
        let claims = Claims {
            sub: "42".to_string(),
            role: UserRole::Student,
            exp: 1234567890,
            iat: 1234567800,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""sub":"42""#));
        assert!(serialized.contains(r#""role":"student""#));
    }

    #[test]
    fn test_claims_deserialize() {
        let json = r#"{"sub":"7","role":"instructor","exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.role, UserRole::Instructor);
        assert_eq!(claims.user_id().unwrap(), UserId::new(7));
    }

    #[test]
    fn test_claims_with_non_numeric_subject() {
        let claims = Claims {
            sub: "not-a-number".to_string(),
            role: UserRole::Student,
            exp: 0,
            iat: 0,
        };
        let err = claims.user_id().unwrap_err();
        assert_eq!(err.code, "access_denied");
    }
}
