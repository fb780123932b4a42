//! Authorization code records.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A single-use authorization code, bound to the request it resolves.
///
/// Consumed atomically at the token endpoint: a second exchange of the
/// same value fails with `invalid_grant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The opaque code value handed to the client.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Account that authorized the request.
    pub account_id: String,

    /// Grant backing the code.
    pub grant_id: Uuid,

    /// Redirect URI the code was issued against; the token request must
    /// repeat it exactly.
    pub redirect_uri: String,

    /// Scope approved for this exchange (space-delimited).
    pub scope: String,

    /// Resource indicator from the authorization request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// OIDC nonce to echo into the ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// PKCE challenge to verify at exchange time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// Timestamp when the code was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Checks if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}

/// Generates an opaque token value with 256 bits of entropy,
/// base64url-encoded. Used for authorization codes, refresh tokens, and
/// opaque access tokens.
#[must_use]
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
