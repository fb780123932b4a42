//! Interaction page handlers: prompt rendering, login, consent, and
//! cancellation.
//!
//! Every submission answers with a 303 redirect (to the next prompt,
//! or out to the client) except a failed login, which re-renders the
//! form. Unexpected failures are recovered into an OAuth error
//! redirect when the interaction's redirect target is still known;
//! otherwise the browser gets a generic 400 page with no internal
//! detail.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::warn;

use crate::error::AuthError;
use crate::http::OidcState;
use crate::http::templates::{render_consent_form, render_error_page, render_login_form};
use crate::oauth::interaction::Prompt;
use crate::oauth::LoginOutcome;

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Submitted email.
    pub email: String,
    /// Submitted password. Never echoed back.
    pub password: String,
}

/// GET /interaction/{uid} handler.
pub async fn details_handler(
    State(state): State<OidcState>,
    Path(uid): Path<String>,
) -> Response {
    match state.flow.details(&uid).await {
        Ok(interaction) => {
            let client_id = &interaction.request.client_id;
            let page = match &interaction.prompt {
                Prompt::Login(prompt) => {
                    render_login_form(client_id, &uid, prompt.login_hint.as_deref(), None)
                }
                Prompt::Consent(prompt) => render_consent_form(client_id, &uid, prompt),
            };
            Html(page).into_response()
        }
        Err(err) => failure(&state, &uid, err).await,
    }
}

/// POST /interaction/{uid}/login handler.
pub async fn login_handler(
    State(state): State<OidcState>,
    Path(uid): Path<String>,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    match state.flow.submit_login(&uid, &form.email, &form.password).await {
        Ok(LoginOutcome::Retry { message, email }) => {
            let interaction = match state.flow.details(&uid).await {
                Ok(interaction) => interaction,
                Err(err) => return failure(&state, &uid, err).await,
            };
            Html(render_login_form(
                &interaction.request.client_id,
                &uid,
                Some(&email),
                Some(&message),
            ))
            .into_response()
        }
        Ok(LoginOutcome::Redirect(url)) => Redirect::to(&url).into_response(),
        Ok(LoginOutcome::NextPrompt) => {
            Redirect::to(&format!("/interaction/{uid}")).into_response()
        }
        Err(err) => failure(&state, &uid, err).await,
    }
}

/// POST /interaction/{uid}/confirm handler.
pub async fn confirm_handler(
    State(state): State<OidcState>,
    Path(uid): Path<String>,
) -> Response {
    match state.flow.submit_consent(&uid).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(err) => failure(&state, &uid, err).await,
    }
}

/// POST /interaction/{uid}/cancel handler.
pub async fn cancel_handler(
    State(state): State<OidcState>,
    Path(uid): Path<String>,
) -> Response {
    match state.flow.cancel(&uid).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(err) => failure(&state, &uid, err).await,
    }
}

/// Translates a flow failure into a response: an OAuth error redirect
/// when recoverable, a 400 page otherwise.
async fn failure(state: &OidcState, uid: &str, err: AuthError) -> Response {
    warn!(uid = %uid, error = %err, "Interaction request failed");

    if let Some(url) = state.flow.recover_error_redirect(uid, &err).await {
        return Redirect::to(&url).into_response();
    }

    let description = if err.stays_local() {
        err.to_string()
    } else {
        // Fail closed without leaking the underlying failure
        "The request could not be completed".to_string()
    };
    (
        StatusCode::BAD_REQUEST,
        Html(render_error_page(err.oauth_error_code(), &description)),
    )
        .into_response()
}
