//! Token issuance policy.
//!
//! Decides, for each token-endpoint exchange, whether a refresh token
//! accompanies the response and what shape the access token takes.
//!
//! The format rule is deliberately asymmetric: a request carrying a
//! resource indicator (or running under a configured default resource)
//! receives a signed JWT with `aud` set to that indicator, while a
//! request without one receives an opaque token resolvable only at the
//! userinfo endpoint. Clients that want JWTs everywhere must send the
//! indicator on the authorization request, the code exchange, and every
//! refresh exchange; omitting it on any leg silently produces an opaque
//! token on that leg.

use std::sync::Arc;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::registry::ClientRegistry;
use crate::types::{ClientDescriptor, GrantType};

/// Shape of the access token to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenFormat {
    /// Signed JWT bound to a resource audience.
    Jwt {
        /// The resource indicator carried in `aud`.
        audience: String,
    },
    /// Opaque server-side token.
    Opaque,
}

/// The policy's decision for one exchange.
#[derive(Debug, Clone)]
pub struct TokenIssuanceDecision {
    /// Whether to issue a refresh token alongside the access token.
    pub issue_refresh_token: bool,

    /// Access token shape.
    pub format: AccessTokenFormat,

    /// Scope the access token carries (space-delimited). For JWT
    /// tokens this is narrowed to the resource server's registered
    /// scopes.
    pub scope: String,

    /// Access token lifetime.
    pub access_token_ttl: std::time::Duration,
}

/// Token issuance policy, shared by the token service.
pub struct IssuancePolicy {
    registry: Arc<ClientRegistry>,
    config: Arc<AuthConfig>,
}

impl IssuancePolicy {
    /// Creates the policy.
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, config: Arc<AuthConfig>) -> Self {
        Self { registry, config }
    }

    /// Decides refresh issuance and access-token shape for an exchange.
    ///
    /// `granted_scope` is the space-delimited scope approved for this
    /// exchange; `resource` is the indicator from the token request, if
    /// any.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` when the indicator does not resolve to
    /// a registered resource server.
    pub fn decide(
        &self,
        client: &ClientDescriptor,
        granted_scope: &str,
        resource: Option<&str>,
    ) -> AuthResult<TokenIssuanceDecision> {
        let scopes: Vec<&str> = granted_scope.split_whitespace().collect();

        // Refresh tokens require the grant type; scope or the
        // force-flag then enable issuance independently.
        let issue_refresh_token = client.is_grant_type_allowed(GrantType::RefreshToken)
            && (scopes.contains(&"offline_access")
                || self.registry.forces_refresh_token(&client.client_id));

        let indicator = resource
            .map(ToString::to_string)
            .or_else(|| self.config.default_resource.clone());

        let (format, scope, access_token_ttl) = match indicator {
            Some(indicator) => {
                let resource_config = self.config.resource(&indicator).ok_or_else(|| {
                    AuthError::invalid_request(format!(
                        "Unknown resource indicator: {indicator}"
                    ))
                })?;
                let approved = resource_config.approved_scopes(&scopes).join(" ");
                let ttl = resource_config
                    .access_token_ttl
                    .unwrap_or(self.config.ttl.access_token);
                (
                    AccessTokenFormat::Jwt {
                        audience: indicator,
                    },
                    approved,
                    ttl,
                )
            }
            None => (
                AccessTokenFormat::Opaque,
                granted_scope.to_string(),
                self.config.ttl.access_token,
            ),
        };

        Ok(TokenIssuanceDecision {
            issue_refresh_token,
            format,
            scope,
            access_token_ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceServerConfig;
    use crate::types::{ResponseType, TokenEndpointAuthMethod};

    fn client(grant_types: Vec<GrantType>) -> ClientDescriptor {
        ClientDescriptor {
            client_id: "dev-rp".to_string(),
            client_secret: "dev-secret".to_string(),
            redirect_uris: vec!["https://app.example/callback".to_string()],
            post_logout_redirect_uris: Vec::new(),
            grant_types,
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::ClientSecretBasic,
            force_refresh_token: None,
        }
    }

    fn config() -> AuthConfig {
        AuthConfig {
            resources: vec![ResourceServerConfig {
                indicator: "https://api.example.com".to_string(),
                scopes: vec!["read".to_string(), "write".to_string()],
                access_token_ttl: None,
            }],
            ..AuthConfig::default()
        }
    }

    fn policy(force_refresh: bool, config: AuthConfig) -> IssuancePolicy {
        let mut descriptor = client(vec![GrantType::AuthorizationCode, GrantType::RefreshToken]);
        descriptor.force_refresh_token = force_refresh.then_some(true);
        let registry = ClientRegistry::from_descriptors(vec![descriptor]).unwrap();
        IssuancePolicy::new(Arc::new(registry), Arc::new(config))
    }

    #[test]
    fn test_refresh_requires_grant_type() {
        let policy = policy(true, config());
        // Client without refresh_token grant type never gets one
        let no_refresh = client(vec![GrantType::AuthorizationCode]);
        let decision = policy
            .decide(&no_refresh, "openid offline_access", None)
            .unwrap();
        assert!(!decision.issue_refresh_token);
    }

    #[test]
    fn test_refresh_via_offline_access() {
        let policy = policy(false, config());
        let client = client(vec![GrantType::AuthorizationCode, GrantType::RefreshToken]);

        let with_scope = policy
            .decide(&client, "openid offline_access", None)
            .unwrap();
        assert!(with_scope.issue_refresh_token);

        let without_scope = policy.decide(&client, "openid", None).unwrap();
        assert!(!without_scope.issue_refresh_token);
    }

    #[test]
    fn test_refresh_via_force_flag() {
        let policy = policy(true, config());
        let client = client(vec![GrantType::AuthorizationCode, GrantType::RefreshToken]);

        // No offline_access, but the force flag covers it
        let decision = policy.decide(&client, "openid", None).unwrap();
        assert!(decision.issue_refresh_token);
    }

    #[test]
    fn test_resource_indicator_yields_jwt_with_narrowed_scope() {
        let policy = policy(false, config());
        let client = client(vec![GrantType::AuthorizationCode]);

        let decision = policy
            .decide(&client, "openid read write admin", Some("https://api.example.com"))
            .unwrap();
        assert_eq!(
            decision.format,
            AccessTokenFormat::Jwt {
                audience: "https://api.example.com".to_string()
            }
        );
        // openid and admin are not registered for the resource
        assert_eq!(decision.scope, "read write");
    }

    #[test]
    fn test_no_indicator_yields_opaque() {
        let policy = policy(false, config());
        let client = client(vec![GrantType::AuthorizationCode]);

        let decision = policy.decide(&client, "openid read", None).unwrap();
        assert_eq!(decision.format, AccessTokenFormat::Opaque);
        assert_eq!(decision.scope, "openid read");
    }

    #[test]
    fn test_default_resource_applies_when_indicator_omitted() {
        let mut cfg = config();
        cfg.default_resource = Some("https://api.example.com".to_string());
        let policy = policy(false, cfg);
        let client = client(vec![GrantType::AuthorizationCode]);

        let decision = policy.decide(&client, "openid read", None).unwrap();
        assert_eq!(
            decision.format,
            AccessTokenFormat::Jwt {
                audience: "https://api.example.com".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_indicator_fails() {
        let policy = policy(false, config());
        let client = client(vec![GrantType::AuthorizationCode]);

        let err = policy
            .decide(&client, "read", Some("https://unknown.example"))
            .unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn test_resource_ttl_override() {
        let mut cfg = config();
        cfg.resources[0].access_token_ttl = Some(std::time::Duration::from_secs(300));
        let policy = policy(false, cfg);
        let client = client(vec![GrantType::AuthorizationCode]);

        let decision = policy
            .decide(&client, "read", Some("https://api.example.com"))
            .unwrap();
        assert_eq!(
            decision.access_token_ttl,
            std::time::Duration::from_secs(300)
        );
    }
}
