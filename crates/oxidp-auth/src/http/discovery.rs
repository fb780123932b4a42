//! Discovery document and JWKS handlers.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::http::OidcState;
use crate::token::Jwks;

/// GET /.well-known/openid-configuration handler.
pub async fn discovery_handler(State(state): State<OidcState>) -> Json<Value> {
    let issuer = state.config.issuer.trim_end_matches('/');
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "userinfo_endpoint": format!("{issuer}/userinfo"),
        "jwks_uri": format!("{issuer}/jwks"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "token_endpoint_auth_methods_supported": [
            "client_secret_basic",
            "client_secret_post",
            "none",
        ],
        "code_challenge_methods_supported": ["S256"],
        "scopes_supported": ["openid", "profile", "email", "offline_access"],
        "claims_supported": ["sub", "name", "email"],
    }))
}

/// GET /jwks handler.
pub async fn jwks_handler(State(state): State<OidcState>) -> Json<Jwks> {
    Json(state.jwt.jwks())
}
