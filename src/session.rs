//! Signed session markers carried in the dashboard URL
//!
//! A marker is an HS256 token naming the user and fingerprinting the
//! credential that was checked at login. Restoring a session verifies the
//! signature and expiry and then compares the fingerprint with the stored
//! credential, so a changed password invalidates outstanding markers.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;
use crate::models::User;

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Credential fingerprint
    pub cred: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per login, so every sign-in gets its own marker
    pub jti: String,
}

/// Keys used to sign and verify markers
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Mint a marker for a user who just proved their password
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.username.clone(),
            cred: fingerprint(&user.username, &user.password),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Check signature and expiry
    pub fn verify(&self, marker: &str) -> Result<Claims> {
        let data = decode::<Claims>(marker, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Hex SHA-256 over the username and password
pub fn fingerprint(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            username: "qa".to_string(),
            password: "secret".to_string(),
            full_name: None,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = SessionKeys::new("a-long-enough-secret", Duration::hours(1));
        let marker = keys.issue(&user()).unwrap();
        let claims = keys.verify(&marker).unwrap();
        assert_eq!(claims.sub, "qa");
        assert_eq!(claims.cred, fingerprint("qa", "secret"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_each_login_gets_its_own_marker() {
        let keys = SessionKeys::new("a-long-enough-secret", Duration::hours(1));
        let first = keys.issue(&user()).unwrap();
        let second = keys.issue(&user()).unwrap();
        assert_ne!(first, second);
        assert_eq!(keys.verify(&second).unwrap().sub, "qa");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let ours = SessionKeys::new("a-long-enough-secret", Duration::hours(1));
        let theirs = SessionKeys::new("another-long-secret!", Duration::hours(1));
        let marker = theirs.issue(&user()).unwrap();
        assert!(ours.verify(&marker).is_err());
    }

    #[test]
    fn test_expired_marker_rejected() {
        let keys = SessionKeys::new("a-long-enough-secret", Duration::hours(-2));
        let marker = keys.issue(&user()).unwrap();
        assert!(keys.verify(&marker).is_err());
    }

    #[test]
    fn test_bare_username_rejected() {
        let keys = SessionKeys::new("a-long-enough-secret", Duration::hours(1));
        assert!(keys.verify("qa").is_err());
    }

    #[test]
    fn test_fingerprint_separates_fields() {
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
        assert_eq!(fingerprint("qa", "secret").len(), 64);
    }
}
