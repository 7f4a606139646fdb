//! Bearer token verification.
//!
//! Tokens are issued by the identity service and signed with HS256 using
//! the shared `JWT_SECRET`. This server only verifies them.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use ton_rewards::UserId;

/// JWT claims for access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: UserId,
    #[serde(default)]
    pub is_admin: bool,
    /// Expiration timestamp
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// HS256 token verifier
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify signature and expiry of an access token
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(exp_offset: i64) -> Claims {
        Claims {
            sub: 42,
            is_admin: true,
            exp: chrono::Utc::now().timestamp() + exp_offset,
        }
    }

    #[test]
    fn test_verify_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = claims(3600);
        assert_eq!(verifier.verify(&token(&claims, SECRET)).unwrap(), claims);
    }

    #[test]
    fn test_reject_wrong_secret() {
        let verifier = TokenVerifier::new(SECRET);
        let forged = token(&claims(3600), "another-secret-another-secret-xx");
        assert!(matches!(verifier.verify(&forged), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_reject_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let expired = token(&claims(-3600), SECRET);
        assert!(verifier.verify(&expired).is_err());
    }

    #[test]
    fn test_reject_garbage() {
        let verifier = TokenVerifier::new(SECRET);
        assert!(verifier.verify("not.a.jwt").is_err());
    }
}
