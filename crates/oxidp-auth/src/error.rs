//! Authorization server error types.
//!
//! This module defines all error types that can occur while driving an
//! authorization interaction or serving the token endpoint, plus the
//! deterministic mapping from internal failures to OAuth 2.0 error codes.

use std::fmt;

/// Errors that can occur during authorization and token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is invalid or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The client credentials are invalid or the client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization grant, code, or refresh token is invalid,
    /// expired, or revoked.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested scope is invalid, unknown, or malformed.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The authenticated account is not permitted to authorize clients.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The resource owner denied the authorization request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The authorization server does not support the requested response type.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// Input failed shape validation (malformed uid, email, or password).
    ///
    /// Validation errors stay within this service as HTTP 400 responses;
    /// they are never translated into client redirects.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// PKCE code verifier does not match the code challenge.
    #[error("PKCE verification failed")]
    PkceVerificationFailed,

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error must stay within the service as a
    /// plain HTTP response rather than redirecting back to the client.
    #[must_use]
    pub fn stays_local(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the OAuth 2.0 error code for this error.
    ///
    /// Typed variants map directly; `Storage`/`Internal` failures fall
    /// back to keyword classification over their message, so errors
    /// bubbling up from storage or third-party layers still translate
    /// into a reproducible OAuth error token.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } | Self::Validation { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } | Self::PkceVerificationFailed => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::Unauthorized { .. } => "unauthorized_client",
            Self::AccessDenied { .. } => "access_denied",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::Configuration { .. } => "server_error",
            Self::Storage { message } | Self::Internal { message } => classify_message(message),
        }
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::Validation { .. }
            | Self::UnsupportedGrantType { .. }
            | Self::UnsupportedResponseType { .. } => ErrorCategory::Validation,
            Self::InvalidClient { .. }
            | Self::InvalidGrant { .. }
            | Self::PkceVerificationFailed => ErrorCategory::Authentication,
            Self::InvalidScope { .. } | Self::Unauthorized { .. } | Self::AccessDenied { .. } => {
                ErrorCategory::Authorization
            }
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Classifies an arbitrary failure message into an OAuth 2.0 error code.
///
/// The table is keyword-based and order-sensitive: more specific phrases
/// ("grant type") are matched before their substrings ("grant"). The
/// result is deterministic for a given message, which lets a relying
/// party handle mid-flow failures programmatically.
#[must_use]
pub fn classify_message(message: &str) -> &'static str {
    let lower = message.to_ascii_lowercase();

    if lower.contains("missing") || lower.contains("required") {
        return "invalid_request";
    }
    if lower.contains("client") && (lower.contains("auth") || lower.contains("secret")) {
        return "invalid_client";
    }
    if lower.contains("grant type") || lower.contains("unsupported") {
        return "unsupported_grant_type";
    }
    if lower.contains("grant") || lower.contains("expired") || lower.contains("revoked") {
        return "invalid_grant";
    }
    if lower.contains("unauthorized") {
        return "unauthorized_client";
    }
    if lower.contains("scope") {
        return "invalid_scope";
    }
    "invalid_request"
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity/credential verification failures.
    Authentication,
    /// Permission and consent failures.
    Authorization,
    /// Request shape failures.
    Validation,
    /// Storage failures.
    Infrastructure,
    /// Configuration failures (process-fatal at startup).
    Configuration,
    /// Unexpected internal failures.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::invalid_grant("expired authorization code");
        assert_eq!(err.to_string(), "Invalid grant: expired authorization code");

        let err = AuthError::unsupported_grant_type("implicit");
        assert_eq!(err.to_string(), "Unsupported grant type: implicit");
    }

    #[test]
    fn test_oauth_error_code_typed_variants() {
        assert_eq!(
            AuthError::invalid_request("x").oauth_error_code(),
            "invalid_request"
        );
        assert_eq!(
            AuthError::invalid_client("x").oauth_error_code(),
            "invalid_client"
        );
        assert_eq!(
            AuthError::unauthorized("x").oauth_error_code(),
            "unauthorized_client"
        );
        assert_eq!(
            AuthError::access_denied("x").oauth_error_code(),
            "access_denied"
        );
        assert_eq!(
            AuthError::PkceVerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
        assert_eq!(
            AuthError::invalid_scope("x").oauth_error_code(),
            "invalid_scope"
        );
    }

    #[test]
    fn test_classify_missing_and_required() {
        assert_eq!(classify_message("missing parameter: scope"), "invalid_request");
        assert_eq!(classify_message("redirect_uri is required"), "invalid_request");
    }

    #[test]
    fn test_classify_client_auth() {
        assert_eq!(
            classify_message("client authentication failed"),
            "invalid_client"
        );
        assert_eq!(
            classify_message("client secret mismatch"),
            "invalid_client"
        );
    }

    #[test]
    fn test_classify_grant_family() {
        assert_eq!(classify_message("grant not found"), "invalid_grant");
        assert_eq!(classify_message("interaction expired"), "invalid_grant");
        assert_eq!(classify_message("token was revoked"), "invalid_grant");
        // "grant type" wins over plain "grant"
        assert_eq!(
            classify_message("grant type not allowed"),
            "unsupported_grant_type"
        );
        assert_eq!(
            classify_message("unsupported operation"),
            "unsupported_grant_type"
        );
    }

    #[test]
    fn test_classify_unauthorized_and_scope() {
        assert_eq!(
            classify_message("account unauthorized for oauth"),
            "unauthorized_client"
        );
        assert_eq!(classify_message("unknown scope value"), "invalid_scope");
    }

    #[test]
    fn test_classify_fallback() {
        assert_eq!(classify_message("something odd happened"), "invalid_request");
    }

    #[test]
    fn test_classify_via_internal_variant() {
        let err = AuthError::internal("downstream grant lookup expired");
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[test]
    fn test_validation_stays_local() {
        assert!(AuthError::validation("malformed uid").stays_local());
        assert!(!AuthError::invalid_grant("x").stays_local());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("x").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::access_denied("x").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            AuthError::validation("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
    }
}
