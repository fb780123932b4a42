//! Token endpoint handler.
//!
//! Accepts a form-encoded token request, authenticates the client
//! (HTTP Basic or form credentials), and answers with JSON. Failures
//! use the OAuth 2.0 error body; `invalid_client` answers 401 with a
//! `WWW-Authenticate` challenge per RFC 6749 section 5.2.

use axum::Form;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tracing::warn;

use crate::http::OidcState;
use crate::token::TokenRequest;

/// POST /token handler.
pub async fn token_handler(
    State(state): State<OidcState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let basic = basic_credentials(&headers);
    let basic_ref = basic.as_ref().map(|(id, secret)| (id.as_str(), secret.as_str()));

    match state.tokens.exchange(basic_ref, request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            let code = err.oauth_error_code();
            warn!(error = %err, oauth_error = %code, "Token request failed");

            let body = Json(json!({
                "error": code,
                "error_description": err.to_string(),
            }));
            if code == "invalid_client" {
                (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Basic realm=\"oxidp\"")],
                    body,
                )
                    .into_response()
            } else {
                (StatusCode::BAD_REQUEST, body).into_response()
            }
        }
    }
}

/// Parses HTTP Basic credentials from the Authorization header.
///
/// Returns `None` when the header is absent or not a decodable Basic
/// credential pair; the form-body fallback handles the rest.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}
