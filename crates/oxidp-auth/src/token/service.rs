//! Token endpoint service.
//!
//! Handles client authentication and the two supported exchanges:
//! authorization code and refresh token. The issuance policy decides
//! refresh-token accompaniment and access-token shape; this service
//! carries out the decision, persists the resulting records, and
//! reports each issuance to the observer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::account::{AccountStore, verify_secret};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::code::random_token;
use crate::oauth::grant::Grant;
use crate::oauth::pkce;
use crate::registry::ClientRegistry;
use crate::storage::{AccessTokenStorage, CodeStorage, GrantStorage, RefreshTokenStorage};
use crate::token::jwt::{AccessTokenClaims, IdTokenClaims, JwtService, now_unix};
use crate::token::observer::{IssuanceEvent, TokenObserver};
use crate::token::policy::{AccessTokenFormat, IssuancePolicy, TokenIssuanceDecision};
use crate::types::{
    ClientDescriptor, GrantType, OpaqueAccessToken, RefreshToken, TokenEndpointAuthMethod,
};

/// Token request parameters (form-encoded body).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type: "authorization_code" or "refresh_token".
    pub grant_type: String,

    /// Authorization code (authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI, must repeat the authorization request exactly.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier.
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (client_secret_post).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope (refresh_token grant; must narrow, never widen).
    #[serde(default)]
    pub scope: Option<String>,

    /// Resource indicator for this leg of the flow.
    #[serde(default)]
    pub resource: Option<String>,
}

/// Successful token response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    /// The access token (JWT or opaque).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Scope carried by the access token.
    pub scope: String,

    /// Refresh token, when the policy granted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OIDC ID token, when `openid` is in scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// The token endpoint service.
pub struct TokenService {
    jwt: Arc<JwtService>,
    registry: Arc<ClientRegistry>,
    accounts: Arc<AccountStore>,
    config: Arc<AuthConfig>,
    policy: IssuancePolicy,
    grants: Arc<dyn GrantStorage>,
    codes: Arc<dyn CodeStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    observer: Arc<dyn TokenObserver>,
}

impl TokenService {
    /// Creates the token service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jwt: Arc<JwtService>,
        registry: Arc<ClientRegistry>,
        accounts: Arc<AccountStore>,
        config: Arc<AuthConfig>,
        grants: Arc<dyn GrantStorage>,
        codes: Arc<dyn CodeStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
        access_tokens: Arc<dyn AccessTokenStorage>,
        observer: Arc<dyn TokenObserver>,
    ) -> Self {
        let policy = IssuancePolicy::new(registry.clone(), config.clone());
        Self {
            jwt,
            registry,
            accounts,
            config,
            policy,
            grants,
            codes,
            refresh_tokens,
            access_tokens,
            observer,
        }
    }

    /// Authenticates the client for a token request.
    ///
    /// `basic` carries credentials from an `Authorization: Basic`
    /// header when present; otherwise credentials come from the body
    /// per the client's registered auth method.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` on unknown clients, a missing secret,
    /// or a secret mismatch. The comparison is timing-safe.
    pub fn authenticate_client(
        &self,
        basic: Option<(&str, &str)>,
        request: &TokenRequest,
    ) -> AuthResult<ClientDescriptor> {
        let client_id = basic
            .map(|(id, _)| id)
            .or(request.client_id.as_deref())
            .ok_or_else(|| AuthError::invalid_client("Missing client identification"))?;

        let client = self
            .registry
            .find(client_id)
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        let presented = match client.token_endpoint_auth_method {
            TokenEndpointAuthMethod::ClientSecretBasic => basic.map(|(_, secret)| secret),
            TokenEndpointAuthMethod::ClientSecretPost => request.client_secret.as_deref(),
            TokenEndpointAuthMethod::None => {
                return Ok(client.clone());
            }
        };

        let Some(presented) = presented else {
            return Err(AuthError::invalid_client("Missing client secret"));
        };
        if !verify_secret(presented, &client.client_secret) {
            return Err(AuthError::invalid_client("Client authentication failed"));
        }
        Ok(client.clone())
    }

    /// Handles a token request end to end.
    ///
    /// # Errors
    ///
    /// Returns the OAuth error for the failed exchange; the HTTP layer
    /// translates it into a JSON error body.
    pub async fn exchange(
        &self,
        basic: Option<(&str, &str)>,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        let client = self.authenticate_client(basic, &request)?;

        match request.grant_type.as_str() {
            "authorization_code" => self.exchange_code(&client, request).await,
            "refresh_token" => self.exchange_refresh_token(&client, request).await,
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        client: &ClientDescriptor,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized(
                "Client is not authorized for the authorization_code grant",
            ));
        }

        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: code"))?;
        let redirect_uri = request.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::invalid_request("Missing required parameter: redirect_uri")
        })?;

        // Single use: a second presentation finds nothing.
        let code = self
            .codes
            .consume(code_value)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Authorization code is invalid or expired"))?;

        if code.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to another client",
            ));
        }
        if code.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri does not match"));
        }

        match (&code.code_challenge, &request.code_verifier) {
            (Some(challenge), Some(verifier)) => pkce::verify(challenge, verifier)?,
            (Some(_), None) => {
                return Err(AuthError::invalid_request(
                    "Missing required parameter: code_verifier",
                ));
            }
            (None, Some(_)) => {
                return Err(AuthError::invalid_request(
                    "code_verifier provided but no challenge was registered",
                ));
            }
            (None, None) => {}
        }

        let grant = self
            .grants
            .find(code.grant_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Grant not found or expired"))?;

        let decision = self
            .policy
            .decide(client, &code.scope, request.resource.as_deref())?;

        self.issue(
            "authorization_code",
            client,
            &grant,
            &code.scope,
            code.nonce.as_deref(),
            decision,
        )
        .await
    }

    /// Exchanges a refresh token, rotating it.
    async fn exchange_refresh_token(
        &self,
        client: &ClientDescriptor,
        request: TokenRequest,
    ) -> AuthResult<TokenResponse> {
        if !client.is_grant_type_allowed(GrantType::RefreshToken) {
            return Err(AuthError::unauthorized(
                "Client is not authorized for the refresh_token grant",
            ));
        }

        let token_value = request.refresh_token.as_deref().ok_or_else(|| {
            AuthError::invalid_request("Missing required parameter: refresh_token")
        })?;

        // Rotation: the presented token is consumed unconditionally.
        let token = self
            .refresh_tokens
            .consume(token_value)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Refresh token is invalid or expired"))?;

        if token.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to another client",
            ));
        }

        // Scope may narrow but never widen.
        let effective_scope = match request.scope.as_deref() {
            Some(requested) => {
                let held: Vec<&str> = token.scope.split_whitespace().collect();
                for scope in requested.split_whitespace() {
                    if !held.contains(&scope) {
                        return Err(AuthError::invalid_scope(format!(
                            "Scope {scope} exceeds the original grant"
                        )));
                    }
                }
                requested.to_string()
            }
            None => token.scope.clone(),
        };

        let grant = self
            .grants
            .find(token.grant_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Grant not found or expired"))?;

        let decision = self
            .policy
            .decide(client, &effective_scope, request.resource.as_deref())?;

        self.issue(
            "refresh_token",
            client,
            &grant,
            &effective_scope,
            None,
            decision,
        )
        .await
    }

    /// Carries out an issuance decision and assembles the response.
    async fn issue(
        &self,
        grant_type: &'static str,
        client: &ClientDescriptor,
        grant: &Grant,
        granted_scope: &str,
        nonce: Option<&str>,
        decision: TokenIssuanceDecision,
    ) -> AuthResult<TokenResponse> {
        let now = OffsetDateTime::now_utc();

        let access_token = match &decision.format {
            AccessTokenFormat::Jwt { audience } => {
                let iat = now_unix();
                let claims = AccessTokenClaims {
                    iss: self.jwt.issuer().to_string(),
                    sub: grant.account_id.clone(),
                    aud: audience.clone(),
                    exp: iat + decision.access_token_ttl.as_secs() as i64,
                    iat,
                    jti: uuid::Uuid::new_v4().to_string(),
                    scope: decision.scope.clone(),
                    client_id: client.client_id.clone(),
                };
                self.jwt
                    .encode(&claims)
                    .map_err(|e| AuthError::internal(e.to_string()))?
            }
            AccessTokenFormat::Opaque => {
                let record = OpaqueAccessToken {
                    token: random_token(),
                    account_id: grant.account_id.clone(),
                    client_id: client.client_id.clone(),
                    grant_id: grant.id,
                    scope: decision.scope.clone(),
                    expires_at: now + decision.access_token_ttl,
                };
                self.access_tokens.create(&record).await?;
                record.token
            }
        };

        let refresh_token = if decision.issue_refresh_token {
            let record = RefreshToken {
                token: random_token(),
                account_id: grant.account_id.clone(),
                client_id: client.client_id.clone(),
                grant_id: grant.id,
                scope: granted_scope.to_string(),
                created_at: now,
                expires_at: now + self.config.ttl.refresh_token,
            };
            self.refresh_tokens.create(&record).await?;
            Some(record.token)
        } else {
            None
        };

        let id_token = if granted_scope.split_whitespace().any(|s| s == "openid") {
            Some(self.encode_id_token(client, grant, nonce)?)
        } else {
            None
        };

        let event = IssuanceEvent {
            grant_type,
            client_id: client.client_id.clone(),
            account_id: grant.account_id.clone(),
            format: decision.format,
            scope: decision.scope.clone(),
            refresh_token_issued: refresh_token.is_some(),
        };
        self.observer.on_issuance(&event);

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: decision.access_token_ttl.as_secs(),
            scope: decision.scope,
            refresh_token,
            id_token,
        })
    }

    fn encode_id_token(
        &self,
        client: &ClientDescriptor,
        grant: &Grant,
        nonce: Option<&str>,
    ) -> AuthResult<String> {
        let resolved = self.accounts.claims(&grant.account_id);
        let iat = now_unix();
        let claims = IdTokenClaims {
            iss: self.jwt.issuer().to_string(),
            sub: resolved.sub,
            aud: client.client_id.clone(),
            exp: iat + self.config.ttl.id_token.as_secs() as i64,
            iat,
            nonce: nonce.map(ToString::to_string),
            email: resolved
                .email
                .filter(|_| grant.oidc_claims.contains("email")),
            name: resolved.name.filter(|_| grant.oidc_claims.contains("name")),
        };
        self.jwt
            .encode(&claims)
            .map_err(|e| AuthError::internal(e.to_string()))
    }

    /// Shared JWT service (used by userinfo and discovery).
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt
    }
}
