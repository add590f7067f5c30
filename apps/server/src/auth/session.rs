//! Session tokens.
//!
//! HS256 JWTs stored in the `stockroom_session` cookie.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

const SESSION_TOKEN_TYPE: &str = "session";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type, always "session"
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken(format!("bad subject '{}'", self.sub)))
    }
}

/// Signs and checks session tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Generate a session token for `user_id`.
    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: SESSION_TOKEN_TYPE.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))
    }

    /// Validate and decode a session token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(token, &self.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if token_data.claims.token_type != SESSION_TOKEN_TYPE {
            return Err(AuthError::InvalidToken("expected session token".to_string()));
        }

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_names_the_user() {
        let keys = SessionKeys::new("test-secret", 3600);

        let token = keys.issue(42).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.token_type, "session");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_tokens_are_unique() {
        let keys = SessionKeys::new("test-secret", 3600);
        let a = keys.verify(&keys.issue(1).unwrap()).unwrap();
        let b = keys.verify(&keys.issue(1).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = SessionKeys::new("one", 3600).issue(1).unwrap();
        let result = SessionKeys::new("two", 3600).verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60 s leeway.
        let keys = SessionKeys::new("test-secret", -300);
        let token = keys.issue(1).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = SessionKeys::new("test-secret", 3600);
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
