//! JWT session tokens
//!
//! A session token encodes the agency, its role and an expiry. Expired
//! tokens fail with a dedicated message so clients can prompt a re-login.

use crate::entities::agency::AgencyRole;
use crate::errors::{CoreError, CoreResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message returned for expired sessions; clients match on it.
pub const SESSION_EXPIRED: &str = "session expired, please log in again";

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expires_in: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            expires_in: Duration::seconds(expires_in_secs),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Agency id
    pub sub: i64,
    pub email: String,
    pub role: AgencyRole,
    pub iat: i64,
    pub exp: i64,
    /// Token id, the revocation key
    pub jti: String,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for an authenticated agency.
    pub fn issue(&self, agency_id: i64, email: &str, role: AgencyRole) -> CoreResult<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: agency_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.config.expires_in).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CoreError::internal(format!("token encoding failed: {}", e)))?;
        Ok((token, claims))
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> CoreResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    CoreError::unauthenticated(SESSION_EXPIRED)
                }
                _ => CoreError::unauthenticated("invalid token"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expires_in_secs: i64) -> TokenService {
        TokenService::new(TokenConfig::new("test-secret", expires_in_secs))
    }

    #[test]
    fn test_issue_and_validate() {
        let service = service(3600);
        let (token, issued) = service
            .issue(7, "agency@example.cm", AgencyRole::Agency)
            .unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "agency@example.cm");
        assert_eq!(claims.role, AgencyRole::Agency);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn test_expired_token_has_specific_message() {
        let service = service(-120);
        let (token, _) = service
            .issue(7, "agency@example.cm", AgencyRole::Agency)
            .unwrap();

        match service.validate(&token) {
            Err(CoreError::Unauthenticated(message)) => {
                assert_eq!(message, SESSION_EXPIRED);
            }
            other => panic!("expected unauthenticated, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = service(3600);
        let (token, _) = issuer
            .issue(7, "agency@example.cm", AgencyRole::SuperAdmin)
            .unwrap();

        let other = TokenService::new(TokenConfig::new("other-secret", 3600));
        assert!(other.validate(&token).is_err());
    }
}
