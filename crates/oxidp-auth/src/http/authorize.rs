//! Authorization endpoint handler.
//!
//! Validates the incoming request and opens an interaction, then sends
//! the browser to the interaction page. Failures before the redirect
//! target is validated stay local as a 400 page; failures after it
//! travel back to the client as OAuth error redirects.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::warn;

use crate::error::AuthError;
use crate::http::OidcState;
use crate::http::templates::render_error_page;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest,
};

/// Raw query parameters; required fields are checked by the handler so
/// a missing one produces a proper OAuth error instead of a rejection.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    response_type: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    code_challenge: Option<String>,
    #[serde(default)]
    code_challenge_method: Option<String>,
}

/// GET /authorize handler.
pub async fn authorize_handler(
    State(state): State<OidcState>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    // Without a trustworthy client and redirect target every failure
    // must stay local.
    let Some(client_id) = params.client_id else {
        return local_error("invalid_request", "Missing required parameter: client_id");
    };
    let Some(redirect_uri) = params.redirect_uri else {
        return local_error("invalid_request", "Missing required parameter: redirect_uri");
    };

    let request = AuthorizationRequest {
        response_type: params.response_type.unwrap_or_default(),
        client_id,
        redirect_uri,
        scope: params.scope.unwrap_or_default(),
        state: params.state.unwrap_or_default(),
        resource: params.resource,
        nonce: params.nonce,
        code_challenge: params.code_challenge,
        code_challenge_method: params.code_challenge_method,
    };

    match state.flow.begin(request.clone()).await {
        Ok(interaction) => Redirect::to(&format!("/interaction/{}", interaction.uid)).into_response(),
        Err(err) if err.stays_local() => {
            warn!(client_id = %request.client_id, error = %err, "Authorization request rejected");
            local_error(err.oauth_error_code(), &err.to_string())
        }
        Err(err) => {
            warn!(client_id = %request.client_id, error = %err, "Authorization request failed");
            error_redirect(&request, &err)
        }
    }
}

/// Redirects a post-validation failure to the client.
fn error_redirect(request: &AuthorizationRequest, err: &AuthError) -> Response {
    let code = AuthorizationErrorCode::from_str_or_default(err.oauth_error_code());
    match AuthorizationError::new(code, request.state.clone())
        .to_redirect_url(&request.redirect_uri)
    {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(_) => local_error(err.oauth_error_code(), "The request could not be completed"),
    }
}

fn local_error(code: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(render_error_page(code, description)),
    )
        .into_response()
}
