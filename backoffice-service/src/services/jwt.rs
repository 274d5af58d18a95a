//! Bearer token validation.
//!
//! Token issuance lives in the external identity service; this service only
//! verifies tokens and reads the tenant claims out of them.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub company_id: Uuid,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT verification service (HS256 shared secret).
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Encode a token for the given claims. Used by tests; production tokens
    /// come from the identity service signed with the same secret.
    pub fn encode_token(&self, claims: &AccessTokenClaims) -> Result<String, AppError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims_for(username: &str, offset: Duration) -> AccessTokenClaims {
        let now = Utc::now();
        AccessTokenClaims {
            sub: Uuid::new_v4(),
            username: username.to_string(),
            first_name: Some("Erika".to_string()),
            last_name: Some("Mustermann".to_string()),
            role: Some("MITARBEITER".to_string()),
            company_id: Uuid::new_v4(),
            company_name: Some("bestatter".to_string()),
            exp: (now + offset).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn round_trips_claims() {
        let service = JwtService::new("test-secret");
        let claims = claims_for("emustermann", Duration::minutes(15));

        let token = service.encode_token(&claims).unwrap();
        let decoded = service.validate_access_token(&token).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.username, "emustermann");
        assert_eq!(decoded.company_id, claims.company_id);
        assert_eq!(decoded.role.as_deref(), Some("MITARBEITER"));
    }

    #[test]
    fn rejects_expired_tokens() {
        let service = JwtService::new("test-secret");
        let claims = claims_for("emustermann", Duration::minutes(-5));

        let token = service.encode_token(&claims).unwrap();
        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let issuer = JwtService::new("secret-a");
        let verifier = JwtService::new("secret-b");
        let claims = claims_for("emustermann", Duration::minutes(15));

        let token = issuer.encode_token(&claims).unwrap();
        assert!(verifier.validate_access_token(&token).is_err());
    }
}
