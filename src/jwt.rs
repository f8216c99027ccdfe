//! Signed access token issuance and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::Role;

/// Claims carried by a signed access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (username)
    pub sub: String,
    /// Role names, uppercase on the wire
    pub roles: Vec<Role>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signs and verifies access tokens with a symmetric HMAC-SHA256 key.
///
/// The key is fixed at construction and shared read-only across all
/// requests. A token is valid through its exact expiry second; only
/// `now > exp` counts as expired.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
}

impl TokenCodec {
    /// Create a codec from raw secret bytes and the configured access TTL.
    pub fn new(secret: &[u8], access_ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
        }
    }

    /// Sign a token for `subject` carrying the given roles, expiring after `ttl_secs`.
    pub fn issue(&self, subject: &str, roles: &[Role], ttl_secs: u64) -> Result<String, TokenError> {
        let now = now_secs()?;

        let claims = AccessClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp: now + ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Sign an access token using the configured access TTL.
    pub fn issue_access(&self, subject: &str, roles: &[Role]) -> Result<String, TokenError> {
        self.issue(subject, roles, self.access_ttl_secs)
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// The signature is checked before any claim is surfaced; claims from
    /// a token that fails verification never reach the caller.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match jsonwebtoken::decode::<AccessClaims>(token.trim(), &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Malformed),
            },
        }
    }

    /// Extract the subject from a verified token.
    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.decode(token)?.sub)
    }

    /// Extract the role claims from a verified token.
    pub fn extract_roles(&self, token: &str) -> Result<Vec<Role>, TokenError> {
        Ok(self.decode(token)?.roles)
    }

    /// Extract the expiry timestamp from a verified token.
    pub fn extract_expiration(&self, token: &str) -> Result<u64, TokenError> {
        Ok(self.decode(token)?.exp)
    }

    /// True iff the token verifies, is not expired, and its subject matches
    /// `expected_subject` exactly (case-sensitive). Never fails.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == expected_subject,
            Err(_) => false,
        }
    }

    /// Pure comparison of a decoded expiry timestamp against the current time.
    pub fn is_expired(exp: u64) -> bool {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() > exp)
            .unwrap_or(false)
    }
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}

/// Errors from token issuance and verification.
#[derive(Debug)]
pub enum TokenError {
    /// Structurally invalid, unsigned, or wrong-signature token
    Malformed,
    /// Valid signature, expiry in the past
    Expired,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System clock before the Unix epoch
    Clock,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Clock => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret-key-for-testing", 300)
    }

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let codec = codec();

        let token = codec.issue_access("alice", &[Role::User]).unwrap();
        let claims = codec.decode(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec![Role::User]);
        assert_eq!(claims.exp, claims.iat + 300);
    }

    #[test]
    fn test_admin_role_in_token() {
        let codec = codec();

        let token = codec.issue_access("root", &[Role::Admin]).unwrap();
        assert_eq!(codec.extract_roles(&token).unwrap(), vec![Role::Admin]);
    }

    #[test]
    fn test_extract_projections() {
        let codec = codec();

        let token = codec.issue("bob", &[Role::User], 60).unwrap();
        assert_eq!(codec.extract_subject(&token).unwrap(), "bob");
        assert_eq!(codec.extract_roles(&token).unwrap(), vec![Role::User]);
        assert!(!TokenCodec::is_expired(
            codec.extract_expiration(&token).unwrap()
        ));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let codec = codec();

        assert!(matches!(
            codec.decode("not-a-token"),
            Err(TokenError::Malformed)
        ));
        assert!(!codec.validate("not-a-token", "alice"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let codec1 = TokenCodec::new(b"secret-1", 300);
        let codec2 = TokenCodec::new(b"secret-2", 300);

        let token = codec1.issue_access("alice", &[Role::User]).unwrap();

        assert!(matches!(codec2.decode(&token), Err(TokenError::Malformed)));
        assert!(!codec2.validate(&token, "alice"));
    }

    #[test]
    fn test_validate_subject_mismatch() {
        let codec = codec();

        let token = codec.issue_access("alice", &[Role::User]).unwrap();
        assert!(codec.validate(&token, "alice"));
        assert!(!codec.validate(&token, "Alice"));
        assert!(!codec.validate(&token, "mallory"));
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret";
        let encoding_key = EncodingKey::from_secret(secret);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // exp 50 seconds in the past
        let claims = AccessClaims {
            sub: "alice".to_string(),
            roles: vec![Role::User],
            iat: now - 100,
            exp: now - 50,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let codec = TokenCodec::new(secret, 300);
        assert!(matches!(codec.decode(&token), Err(TokenError::Expired)));
        assert!(matches!(
            codec.extract_subject(&token),
            Err(TokenError::Expired)
        ));
        assert!(!codec.validate(&token, "alice"));
        assert!(TokenCodec::is_expired(now - 50));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();

        let token = codec.issue_access("alice", &[Role::User]).unwrap();

        // Swap the payload segment for one claiming a different subject.
        let other = codec.issue_access("mallory", &[Role::Admin]).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        parts[1] = other_parts[1];
        let forged = parts.join(".");

        assert!(matches!(codec.decode(&forged), Err(TokenError::Malformed)));
    }
}
