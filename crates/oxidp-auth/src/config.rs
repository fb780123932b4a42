//! Authorization server configuration.
//!
//! Configuration is environment-driven and validated at startup. A server
//! that fails validation must not bind its listening port, so every check
//! here returns a [`ConfigError`] that the binary treats as process-fatal.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization server configuration.
///
/// # Example (JSON)
///
/// ```json
/// {
///   "issuer": "http://localhost:3000",
///   "ttl": { "access_token": "1h", "refresh_token": "14d", "grant": "1y" },
///   "resources": [
///     { "indicator": "https://api.example.com", "scopes": ["read", "write"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL (used in token `iss` claim and the discovery document).
    pub issuer: String,

    /// Token, session, and grant lifetimes.
    pub ttl: TtlConfig,

    /// Pre-registered resource server configurations.
    ///
    /// A resource indicator on an authorization or token request is only
    /// accepted if it matches one of these entries.
    pub resources: Vec<ResourceServerConfig>,

    /// Resource indicator applied when a token request carries none.
    ///
    /// Left unset in the reference deployment: requests without an
    /// indicator fall through to opaque access tokens.
    pub default_resource: Option<String>,

    /// Token signing configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:3000".to_string(),
            ttl: TtlConfig::default(),
            resources: Vec::new(),
            default_resource: None,
            signing: SigningConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Looks up a pre-registered resource server by its indicator URI.
    #[must_use]
    pub fn resource(&self, indicator: &str) -> Option<&ResourceServerConfig> {
        self.resources.iter().find(|r| r.indicator == indicator)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the issuer or any resource indicator
    /// is not an absolute URI.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.issuer).map_err(|_| ConfigError::InvalidIssuer {
            value: self.issuer.clone(),
        })?;

        for resource in &self.resources {
            url::Url::parse(&resource.indicator).map_err(|_| {
                ConfigError::InvalidResourceIndicator {
                    value: resource.indicator.clone(),
                }
            })?;
        }

        if let Some(ref default) = self.default_resource
            && self.resource(default).is_none()
        {
            return Err(ConfigError::UnknownDefaultResource {
                value: default.clone(),
            });
        }

        Ok(())
    }
}

/// Token, session, and grant lifetimes.
///
/// Each lifetime is independently configurable; the defaults mirror the
/// reference deployment (1h/1h/14d/1d/1y).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token: Duration,

    /// Session lifetime. Interactions expire with the session: a login
    /// or consent submission against an older interaction never resolves.
    #[serde(with = "humantime_serde")]
    pub session: Duration,

    /// Grant lifetime. Grants are the durable record of what an account
    /// has approved for a client.
    #[serde(with = "humantime_serde")]
    pub grant: Duration,

    /// Authorization code lifetime. Codes are single-use and short-lived.
    #[serde(with = "humantime_serde")]
    pub authorization_code: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            access_token: Duration::from_secs(3600),
            id_token: Duration::from_secs(3600),
            refresh_token: Duration::from_secs(14 * 24 * 3600),
            session: Duration::from_secs(24 * 3600),
            grant: Duration::from_secs(365 * 24 * 3600),
            authorization_code: Duration::from_secs(600),
        }
    }
}

/// Pre-registered resource server configuration.
///
/// Access tokens issued for this resource are signed JWTs with `aud`
/// set to the indicator and `scope` limited to the approved list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceServerConfig {
    /// Resource indicator URI (RFC 8707).
    pub indicator: String,

    /// Scopes this resource server accepts.
    pub scopes: Vec<String>,

    /// Access token lifetime override for this resource.
    #[serde(default, with = "humantime_serde::option")]
    pub access_token_ttl: Option<Duration>,
}

impl ResourceServerConfig {
    /// Returns the subset of `requested` scopes this resource accepts,
    /// preserving request order.
    #[must_use]
    pub fn approved_scopes<'a>(&self, requested: &[&'a str]) -> Vec<&'a str> {
        requested
            .iter()
            .copied()
            .filter(|s| self.scopes.iter().any(|allowed| allowed == s))
            .collect()
    }
}

/// Token signing configuration.
///
/// When no key material is provided, an ephemeral RSA key pair is
/// generated at startup. Tokens signed before a restart then fail
/// verification — a documented limitation of the reference deployment,
/// not a defect.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// PEM-encoded PKCS#8 RSA private key. Absent means ephemeral keys.
    pub private_key_pem: Option<String>,

    /// Key ID to advertise in JWKS when a configured key is used.
    pub kid: Option<String>,
}

/// Errors raised while loading or validating configuration.
///
/// All of these abort startup: an authorization server must never start
/// with an ambiguous trust boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The issuer is not an absolute URI.
    #[error("issuer is not an absolute URI: {value:?}")]
    InvalidIssuer {
        /// The rejected value.
        value: String,
    },

    /// A resource indicator is not an absolute URI.
    #[error("resource indicator is not an absolute URI: {value:?}")]
    InvalidResourceIndicator {
        /// The rejected value.
        value: String,
    },

    /// The default resource does not match any registered resource server.
    #[error("default_resource does not match any registered resource: {value:?}")]
    UnknownDefaultResource {
        /// The rejected value.
        value: String,
    },

    /// Client descriptor JSON could not be parsed.
    #[error("malformed client descriptor JSON from {source_name}: {message}")]
    MalformedClientJson {
        /// Which source tier produced the JSON.
        source_name: &'static str,
        /// Parser error detail.
        message: String,
    },

    /// A client descriptor failed schema validation.
    #[error("client descriptor {index} ({client_id:?}) is invalid: {reason}")]
    InvalidClient {
        /// Position of the descriptor in its source list.
        index: usize,
        /// The descriptor's client_id, if it had one.
        client_id: String,
        /// The violated field/constraint.
        reason: crate::types::ClientValidationError,
    },

    /// Two descriptors share a client_id.
    #[error("duplicate client_id in registry: {client_id:?}")]
    DuplicateClientId {
        /// The duplicated id.
        client_id: String,
    },

    /// No client source yielded any descriptors.
    #[error("no client configuration found in environment, file, or fallback")]
    NoClientSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls_match_reference_deployment() {
        let ttl = TtlConfig::default();
        assert_eq!(ttl.access_token, Duration::from_secs(3600));
        assert_eq!(ttl.id_token, Duration::from_secs(3600));
        assert_eq!(ttl.refresh_token, Duration::from_secs(14 * 24 * 3600));
        assert_eq!(ttl.session, Duration::from_secs(24 * 3600));
        assert_eq!(ttl.grant, Duration::from_secs(365 * 24 * 3600));
    }

    #[test]
    fn test_resource_lookup() {
        let config = AuthConfig {
            resources: vec![ResourceServerConfig {
                indicator: "https://api.example.com".to_string(),
                scopes: vec!["read".to_string(), "write".to_string()],
                access_token_ttl: None,
            }],
            ..AuthConfig::default()
        };

        assert!(config.resource("https://api.example.com").is_some());
        assert!(config.resource("https://other.example.com").is_none());
    }

    #[test]
    fn test_approved_scopes_preserves_request_order() {
        let resource = ResourceServerConfig {
            indicator: "https://api.example.com".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
            access_token_ttl: None,
        };

        let approved = resource.approved_scopes(&["write", "openid", "read"]);
        assert_eq!(approved, vec!["write", "read"]);
    }

    #[test]
    fn test_validate_rejects_relative_issuer() {
        let config = AuthConfig {
            issuer: "/not-a-url".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_default_resource() {
        let config = AuthConfig {
            default_resource: Some("https://api.example.com".to_string()),
            ..AuthConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownDefaultResource { .. })
        ));
    }

    #[test]
    fn test_config_deserialize_with_humantime() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "ttl": { "access_token": "1h", "refresh_token": "14d" }
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.issuer, "https://idp.example.com");
        assert_eq!(config.ttl.access_token, Duration::from_secs(3600));
        assert_eq!(config.ttl.refresh_token, Duration::from_secs(14 * 24 * 3600));
        // Unspecified fields keep their defaults
        assert_eq!(config.ttl.grant, Duration::from_secs(365 * 24 * 3600));
    }
}
