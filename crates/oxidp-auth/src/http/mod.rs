//! HTTP surface: axum handlers for the authorization, interaction,
//! token, discovery, and userinfo endpoints.

pub mod authorize;
pub mod discovery;
pub mod interaction;
pub mod templates;
pub mod token;
pub mod userinfo;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::account::AccountStore;
use crate::config::AuthConfig;
use crate::oauth::InteractionFlow;
use crate::storage::AccessTokenStorage;
use crate::token::{JwtService, TokenService};

/// Shared state for all OIDC endpoints.
#[derive(Clone)]
pub struct OidcState {
    /// Interaction flow service.
    pub flow: Arc<InteractionFlow>,

    /// Token endpoint service.
    pub tokens: Arc<TokenService>,

    /// Account store, used by the userinfo endpoint.
    pub accounts: Arc<AccountStore>,

    /// Opaque access token lookup for userinfo.
    pub access_tokens: Arc<dyn AccessTokenStorage>,

    /// JWT service for verification and JWKS export.
    pub jwt: Arc<JwtService>,

    /// Server configuration.
    pub config: Arc<AuthConfig>,
}

/// Builds the OIDC router.
#[must_use]
pub fn router(state: OidcState) -> Router {
    Router::new()
        .route("/authorize", get(authorize::authorize_handler))
        .route("/interaction/{uid}", get(interaction::details_handler))
        .route("/interaction/{uid}/login", post(interaction::login_handler))
        .route(
            "/interaction/{uid}/confirm",
            post(interaction::confirm_handler),
        )
        .route(
            "/interaction/{uid}/cancel",
            post(interaction::cancel_handler),
        )
        .route("/token", post(token::token_handler))
        .route(
            "/.well-known/openid-configuration",
            get(discovery::discovery_handler),
        )
        .route("/jwks", get(discovery::jwks_handler))
        .route("/userinfo", get(userinfo::userinfo_handler))
        .with_state(state)
}
