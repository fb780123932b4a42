//! OAuth 2.0 client descriptor types.
//!
//! A [`ClientDescriptor`] is the immutable registration record for a
//! relying party. Descriptors are loaded once at startup by the client
//! registry and schema-validated before anything else runs.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types the server supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Response Type
// =============================================================================

/// OAuth 2.0 response types the server supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code response.
    Code,
}

impl ResponseType {
    /// Returns the OAuth 2.0 response_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
        }
    }
}

// =============================================================================
// Token Endpoint Auth Method
// =============================================================================

/// Client authentication methods at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// Secret in the HTTP Basic Authorization header.
    ClientSecretBasic,
    /// Secret in the form-encoded request body.
    ClientSecretPost,
    /// No client authentication (public clients, PKCE required).
    None,
}

// =============================================================================
// Client Descriptor
// =============================================================================

/// OAuth 2.0 client registration.
///
/// Immutable after load. The `force_refresh_token` flag is a deployment
/// extension: the registry extracts it into a side-set and strips it
/// before descriptors reach any component that doesn't know the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDescriptor {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Client secret (plaintext in this reference deployment).
    pub client_secret: String,

    /// Allowed redirect URIs for authorization code flow. Must be
    /// non-empty; every entry must be an absolute URI.
    pub redirect_uris: Vec<String>,

    /// Allowed post-logout redirect URIs for RP-initiated logout.
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,

    /// OAuth 2.0 grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// OAuth 2.0 response types this client is allowed to use.
    #[serde(default = "default_response_types")]
    pub response_types: Vec<ResponseType>,

    /// How the client authenticates at the token endpoint.
    #[serde(default = "default_auth_method")]
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,

    /// When set, the client always receives a refresh token regardless
    /// of whether `offline_access` was requested (still gated on
    /// `grant_types` containing `refresh_token`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_refresh_token: Option<bool>,
}

fn default_response_types() -> Vec<ResponseType> {
    vec![ResponseType::Code]
}

fn default_auth_method() -> TokenEndpointAuthMethod {
    TokenEndpointAuthMethod::ClientSecretBasic
}

impl ClientDescriptor {
    /// Validates the descriptor against the registration schema.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint, naming the offending field.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.client_secret.is_empty()
            && self.token_endpoint_auth_method != TokenEndpointAuthMethod::None
        {
            return Err(ClientValidationError::EmptySecret);
        }

        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }

        for uri in self.redirect_uris.iter().chain(&self.post_logout_redirect_uris) {
            if url::Url::parse(uri).is_err() {
                return Err(ClientValidationError::RelativeRedirectUri { uri: uri.clone() });
            }
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        if self.response_types.is_empty() {
            return Err(ClientValidationError::NoResponseTypes);
        }

        Ok(())
    }

    /// Checks if the given redirect URI exactly matches a registered one.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns `true` if the client is public (no token endpoint auth).
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.token_endpoint_auth_method == TokenEndpointAuthMethod::None
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client descriptor validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// client_id cannot be empty.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// client_secret cannot be empty for confidential clients.
    #[error("client_secret cannot be empty for confidential clients")]
    EmptySecret,

    /// redirect_uris must not be empty.
    #[error("redirect_uris must contain at least one URI")]
    NoRedirectUris,

    /// A redirect URI is not absolute.
    #[error("redirect URI is not an absolute URI: {uri:?}")]
    RelativeRedirectUri {
        /// The rejected URI.
        uri: String,
    },

    /// grant_types must not be empty.
    #[error("grant_types must contain at least one grant type")]
    NoGrantTypes,

    /// response_types must not be empty.
    #[error("response_types must contain at least one response type")]
    NoResponseTypes,
}

// =============================================================================
// Tests
// =============================================================================
