//! JWT access/refresh token issuance and validation
//!
//! Both tokens are HS256-signed and carry the user id in `sub` plus a
//! `token_type` discriminator so a refresh token can never be presented
//! where an access token is required. Expiry is the only invalidation
//! mechanism - there is no revocation list.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Token kind discriminator carried in the `token_type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Access or refresh
    pub token_type: TokenKind,
}

impl Claims {
    fn new(user_id: i64, kind: TokenKind, ttl_secs: u64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs as i64,
            token_type: kind,
        }
    }

    /// Parse the subject back into a user id
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// An access/refresh token pair, as returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Sign a single token of the given kind
pub fn issue(user_id: i64, kind: TokenKind, ttl_secs: u64, secret: &str) -> Result<String, TokenError> {
    let claims = Claims::new(user_id, kind, ttl_secs);
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(TokenError::Sign)
}

/// Issue an access/refresh pair for an authenticated user.
/// Never fails for a valid user and a non-empty secret.
pub fn issue_pair(user_id: i64, config: &Config) -> Result<TokenPair, TokenError> {
    Ok(TokenPair {
        access: issue(
            user_id,
            TokenKind::Access,
            config.access_token_ttl_secs,
            &config.jwt_secret,
        )?,
        refresh: issue(
            user_id,
            TokenKind::Refresh,
            config.refresh_token_ttl_secs,
            &config.jwt_secret,
        )?,
    })
}

/// Validate a token presented for API access.
///
/// Rejects malformed tokens, bad signatures, expired tokens, and refresh
/// tokens presented as access tokens.
pub fn decode_access(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    })?;

    if data.claims.token_type != TokenKind::Access {
        return Err(TokenError::WrongKind);
    }

    Ok(data.claims)
}

/// Token errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),

    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Wrong token type")]
    WrongKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn access_token_round_trips() {
        let token = issue(42, TokenKind::Access, 900, SECRET).unwrap();
        let claims = decode_access(&token, SECRET).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.token_type, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_is_rejected_for_api_access() {
        let token = issue(42, TokenKind::Refresh, 604_800, SECRET).unwrap();
        let err = decode_access(&token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::WrongKind));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(42, TokenKind::Access, 900, SECRET).unwrap();
        assert!(decode_access(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Backdate well past the validator's default leeway
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenKind::Access,
        };
        let key = EncodingKey::from_secret(SECRET.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let err = decode_access(&token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_access("not.a.token", SECRET),
            Err(TokenError::Invalid)
        ));
    }
}
