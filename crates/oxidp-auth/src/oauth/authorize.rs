//! Authorization endpoint types.
//!
//! Request parsing, success/error response generation, and redirect URL
//! construction for the OAuth 2.0 authorization endpoint.
//!
//! # Flow
//!
//! 1. Client redirects the browser to `/authorize` with request parameters
//! 2. The interaction flow drives login and consent
//! 3. Server redirects back to the client with an authorization code
//! 4. Client exchanges the code for tokens at the token endpoint

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization request parameters.
///
/// Received as query string parameters on the authorization endpoint.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=dev-rp
///   &redirect_uri=https://app.example/callback
///   &scope=openid offline_access read
///   &state=xyz
///   &resource=https://api.example.com
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code" for authorization code flow.
    pub response_type: String,

    /// Client identifier issued during registration.
    pub client_id: String,

    /// Redirect URI where the response will be sent.
    /// Must exactly match one of the registered redirect URIs.
    pub redirect_uri: String,

    /// Requested scopes (space-separated).
    pub scope: String,

    /// CSRF protection state parameter, echoed back on every redirect.
    pub state: String,

    /// Resource indicator (RFC 8707). Determines the audience and
    /// format of the access token eventually issued.
    #[serde(default)]
    pub resource: Option<String>,

    /// OpenID Connect nonce, echoed into the ID token.
    #[serde(default)]
    pub nonce: Option<String>,

    /// PKCE code challenge (base64url SHA-256 of the verifier).
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method. Only "S256" is supported.
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

impl AuthorizationRequest {
    /// Returns the requested scopes split on whitespace.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }
}

/// Authorization success response.
///
/// Returned as query parameters on the client's redirect URI.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens. Single-use,
    /// short-lived.
    pub code: String,

    /// Echoed state parameter.
    pub state: String,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: String) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }
}

/// Authorization error response.
///
/// Communicated via redirect to the client's redirect URI whenever the
/// redirect target is known and validated; otherwise rendered locally.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter.
    pub state: String,
}

impl AuthorizationError {
    /// Creates a new authorization error.
    #[must_use]
    pub fn new(error: AuthorizationErrorCode, state: String) -> Self {
        Self {
            error,
            error_description: None,
            state,
        }
    }

    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: String,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            pairs.append_pair("state", &self.state);
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 error codes carried on redirects back to the client.
///
/// Covers RFC 6749 authorization endpoint codes plus the token-family
/// codes that the mid-flow error translator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a required parameter or is malformed.
    InvalidRequest,

    /// The client failed authentication or is unknown.
    InvalidClient,

    /// The grant, code, or interaction backing the flow is invalid,
    /// expired, or revoked.
    InvalidGrant,

    /// The client (or account) is not authorized to use this flow.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The server does not support the requested response type.
    UnsupportedResponseType,

    /// The server does not support the requested grant type.
    UnsupportedGrantType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The server hit an unexpected condition.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }

    /// Parses an error code string produced by the error classifier.
    #[must_use]
    pub fn from_str_or_default(code: &str) -> Self {
        match code {
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "unauthorized_client" => Self::UnauthorizedClient,
            "access_denied" => Self::AccessDenied,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "invalid_scope" => Self::InvalidScope,
            "server_error" => Self::ServerError,
            _ => Self::InvalidRequest,
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
