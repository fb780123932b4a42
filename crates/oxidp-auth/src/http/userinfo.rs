//! Userinfo endpoint handler.
//!
//! Accepts both access token formats: JWTs are verified against the
//! signing key, opaque tokens are resolved through server-side lookup.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::account::Claims;
use crate::http::OidcState;
use crate::token::AccessTokenClaims;

/// GET /userinfo handler.
pub async fn userinfo_handler(State(state): State<OidcState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return challenge();
    };

    let subject = if token.split('.').count() == 3 {
        match state.jwt.decode::<AccessTokenClaims>(token) {
            Ok(data) => data.claims.sub,
            Err(err) => {
                debug!(error = %err, "Userinfo JWT rejected");
                return challenge();
            }
        }
    } else {
        match state.access_tokens.find(token).await {
            Ok(Some(record)) => record.account_id,
            _ => return challenge(),
        }
    };

    let claims: Claims = state.accounts.claims(&subject);
    Json(claims).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer realm=\"oxidp\"")],
    )
        .into_response()
}
