use super::identity::Identity;
use crate::error::{Result, StellarError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

/// Reasons a credential is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided")]
    Missing,
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token expired")]
    Expired,
}

impl AuthError {
    /// Whether the credential was absent rather than present-but-invalid.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity claim
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Issued-at (seconds since the Unix epoch)
    pub iat: i64,
    /// Expiry (seconds since the Unix epoch)
    pub exp: i64,
}

/// Stateless verifier (and issuer) of signed capability tokens.
///
/// Tokens are HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`.
/// Verification has no side effects; the returned `Identity` is attached to
/// the request or connection by the caller.
#[derive(Clone)]
pub struct AuthGate {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AuthGate {
    /// Creates a gate signing with `secret`; issued tokens live for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the secret is empty.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(StellarError::config("token secret must not be empty"));
        }
        Ok(Self { secret, ttl })
    }

    /// Lifetime of tokens produced by [`AuthGate::issue`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies `token` against the current clock.
    pub fn verify(&self, token: &str) -> std::result::Result<Identity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies an optional credential; `None` or a blank value is `Missing`.
    pub fn verify_credential(
        &self,
        credential: Option<&str>,
    ) -> std::result::Result<Identity, AuthError> {
        let token = credential
            .map(strip_bearer)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Missing)?;
        self.verify(token)
    }

    /// Verifies `token` as of `now`.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Identity, AuthError> {
        let token = strip_bearer(token);
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed("expected three segments".into()));
        };

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(AuthError::Malformed(format!(
                "unsupported algorithm '{}'",
                header.alg
            )));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| AuthError::Malformed(format!("signature encoding: {e}")))?;
        let mut mac = self
            .mac()
            .map_err(|e| AuthError::Malformed(format!("signing key: {e}")))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let claims: TokenClaims = decode_segment(claims_b64)?;
        if claims.user_id.trim().is_empty() {
            return Err(AuthError::Malformed("empty identity claim".into()));
        }
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Identity::new(claims.user_id))
    }

    /// Issues a token for `identity`, valid from now for the configured TTL.
    pub fn issue(&self, identity: &Identity) -> Result<String> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token for `identity` as if the current time were `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        };
        let claims = TokenClaims {
            user_id: identity.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);

        let mut mac = self
            .mac()
            .map_err(|e| StellarError::internal(format!("signing key: {e}")))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{header_b64}.{claims_b64}.{signature_b64}"))
    }

    fn mac(&self) -> std::result::Result<HmacSha256, hmac::digest::InvalidLength> {
        <HmacSha256 as Mac>::new_from_slice(&self.secret)
    }
}

fn strip_bearer(token: &str) -> &str {
    let token = token.trim();
    token.strip_prefix("Bearer ").unwrap_or(token).trim()
}

fn decode_segment<T: for<'de> Deserialize<'de>>(
    segment: &str,
) -> std::result::Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("segment encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(format!("segment json: {e}")))
}
