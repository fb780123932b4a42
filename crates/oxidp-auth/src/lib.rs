//! # oxidp-auth
//!
//! OpenID Connect authorization server library for oxidp.
//!
//! This crate provides:
//! - OAuth 2.0 authorization code flow with PKCE
//! - Browser interaction handling (login and consent prompts)
//! - Per-account/per-client grant accumulation across flows
//! - Token issuance (JWT and opaque access tokens, refresh rotation,
//!   ID tokens)
//! - Discovery document, JWKS, and userinfo endpoints
//!
//! ## Overview
//!
//! The server is built around an interaction record: the authorization
//! endpoint validates the request and opens an interaction, the
//! interaction pages drive it through login and consent, and resolution
//! issues a single-use authorization code that the token endpoint
//! exchanges for tokens. Consent decisions accumulate into a grant
//! shared by all flows for the same account/client pair, so scopes a
//! user already approved are never prompted for again.
//!
//! ## Modules
//!
//! - [`account`] - Account store and claims resolution
//! - [`config`] - Server configuration (issuer, TTLs, resource servers)
//! - [`error`] - Error types and OAuth error code translation
//! - [`http`] - Axum HTTP handlers for all endpoints
//! - [`oauth`] - Authorization flow: requests, interactions, grants,
//!   codes, PKCE
//! - [`registry`] - Client registry with layered configuration sources
//! - [`storage`] - Storage traits and the in-memory implementation
//! - [`token`] - Token issuance policy, JWT signing, and the token
//!   endpoint service
//! - [`types`] - Shared domain types

pub mod account;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod registry;
pub mod storage;
pub mod token;
pub mod types;

pub use account::{Account, AccountStore, Claims};
pub use config::{AuthConfig, ConfigError, ResourceServerConfig, SigningConfig, TtlConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{OidcState, router};
pub use oauth::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    Grant, Interaction, InteractionFlow, InteractionState, LoginOutcome, Prompt,
};
pub use registry::{ClientRegistry, ClientSources, FallbackClient};
pub use storage::{
    AccessTokenStorage, CodeStorage, GrantStorage, InteractionStorage, MemoryStorage,
    RefreshTokenStorage,
};
pub use token::{
    AccessTokenFormat, IssuancePolicy, Jwks, JwtService, SigningKeyPair, TokenObserver,
    TokenRequest, TokenResponse, TokenService, TracingObserver,
};
pub use types::{ClientDescriptor, GrantType, OpaqueAccessToken, RefreshToken, ResponseType};

/// Type alias for authorization server results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oxidp_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::account::{Account, AccountStore, Claims};
    pub use crate::config::{AuthConfig, ConfigError, ResourceServerConfig, TtlConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OidcState, router};
    pub use crate::oauth::{
        AuthorizationRequest, Grant, Interaction, InteractionFlow, InteractionState, LoginOutcome,
    };
    pub use crate::registry::{ClientRegistry, ClientSources, FallbackClient};
    pub use crate::storage::{
        AccessTokenStorage, CodeStorage, GrantStorage, InteractionStorage, MemoryStorage,
        RefreshTokenStorage,
    };
    pub use crate::token::{
        JwtService, SigningKeyPair, TokenRequest, TokenResponse, TokenService,
    };
    pub use crate::types::{ClientDescriptor, GrantType, OpaqueAccessToken, RefreshToken};
}
