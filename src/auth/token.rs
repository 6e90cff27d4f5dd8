//! # Token Codec
//!
//! Signs and parses the compact HS256 tokens that carry an identity between requests.
//! A token holds three claims: the identity id (`sub`), the role tag (`role`) and the
//! issue time (`iat`). No expiry is embedded, so a token stays valid for as long as the
//! signing key does.
//!
//! There is no server-side session store: the signature is the only thing standing
//! between a client and any identity, and the key is injected once at construction.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::config::{AuthConfig, MIN_SECRET_LEN};
use crate::core::error::{ClubError, ClubResult};

/// Claims embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id, matching an id in one of the identity stores
    pub sub: String,
    /// Role tag; the codec does not restrict its values
    pub role: String,
    /// Issue time as a unix timestamp in seconds
    pub iat: i64,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}

/// Token parse and encode failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("token signature does not verify")]
    Signature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    #[error("token could not be encoded: {0}")]
    Encoding(String),
}

/// HS256 token codec bound to a single process-wide key
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec from raw key bytes
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens are issued without `exp`; do not demand it on the way back in.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create a codec from the auth configuration, enforcing the minimum key length
    pub fn from_config(config: &AuthConfig) -> ClubResult<Self> {
        if config.signing_secret.len() < MIN_SECRET_LEN {
            return Err(ClubError::config(format!(
                "signing_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self::new(config.signing_secret.as_bytes()))
    }

    /// Sign a token for an identity, stamped with the current time
    pub fn generate(&self, identity_id: &str, role: &str) -> Result<String, TokenError> {
        self.issue_at(identity_id, role, Utc::now())
    }

    /// Sign a token with an explicit issue time
    pub fn issue_at(
        &self,
        identity_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if identity_id.is_empty() {
            return Err(TokenError::MissingClaim("sub"));
        }
        if role.is_empty() {
            return Err(TokenError::MissingClaim("role"));
        }

        let claims = Claims {
            sub: identity_id.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token and return its claims
    ///
    /// All whitespace is stripped first, since the token usually arrives in a header value.
    pub fn parse_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let sanitized: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        if sanitized.is_empty() {
            return Err(TokenError::Empty);
        }

        decode::<Claims>(&sanitized, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::Signature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }

    pub fn extract_identity_id(&self, token: &str) -> Result<String, TokenError> {
        self.parse_claims(token).map(|claims| claims.sub)
    }

    pub fn extract_role(&self, token: &str) -> Result<String, TokenError> {
        self.parse_claims(token).map(|claims| claims.role)
    }

    /// True iff the token verifies and its subject is `expected_identity_id`
    ///
    /// Never fails: every parse error yields `false`.
    pub fn validate(&self, token: &str, expected_identity_id: &str) -> bool {
        match self.parse_claims(token) {
            Ok(claims) => claims.sub == expected_identity_id,
            Err(_) => false,
        }
    }
}
