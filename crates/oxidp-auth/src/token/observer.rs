//! Token issuance observation.
//!
//! The token service reports every issued token through this hook so
//! deployments can attach audit logging or metrics without patching the
//! issuance path itself.

use crate::token::policy::AccessTokenFormat;

/// A token issuance event.
#[derive(Debug, Clone)]
pub struct IssuanceEvent {
    /// Grant type that produced the tokens ("authorization_code" or
    /// "refresh_token").
    pub grant_type: &'static str,

    /// Client the tokens were issued to.
    pub client_id: String,

    /// Account the tokens were issued for.
    pub account_id: String,

    /// Access token shape.
    pub format: AccessTokenFormat,

    /// Scope carried by the access token.
    pub scope: String,

    /// Whether a refresh token accompanied the response.
    pub refresh_token_issued: bool,
}

/// Hook invoked after each successful issuance.
pub trait TokenObserver: Send + Sync {
    /// Called once per token-endpoint response, after the tokens are
    /// persisted. Must not fail; observers cannot veto an issuance.
    fn on_issuance(&self, event: &IssuanceEvent);
}

/// Default observer: structured log line per issuance.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TokenObserver for TracingObserver {
    fn on_issuance(&self, event: &IssuanceEvent) {
        let format = match &event.format {
            AccessTokenFormat::Jwt { audience } => format!("jwt aud={audience}"),
            AccessTokenFormat::Opaque => "opaque".to_string(),
        };
        tracing::info!(
            grant_type = event.grant_type,
            client_id = %event.client_id,
            account_id = %event.account_id,
            format = %format,
            scope = %event.scope,
            refresh_token = event.refresh_token_issued,
            "Tokens issued"
        );
    }
}
