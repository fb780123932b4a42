//! Interaction records for browser-facing authorization flows.
//!
//! An interaction is created when the authorization endpoint decides
//! the end user must be prompted, and keyed by an opaque `uid` carried
//! in the interaction URLs. It moves through login and consent prompts
//! and ends resolved (code issued), cancelled, or errored.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize::AuthorizationRequest;

/// Maximum accepted length of an interaction uid.
const MAX_UID_LEN: usize = 64;

/// Validates an interaction uid from the request path.
///
/// Uids we mint are 32 lowercase hex characters, but the check accepts
/// the broader URL-safe alphabet so the format can evolve without
/// breaking in-flight interactions. This runs before any storage
/// lookup.
///
/// # Errors
///
/// Returns a validation error kept local to the browser (400, never a
/// client redirect) when the uid is empty, too long, or carries a
/// character outside `[A-Za-z0-9_-]`.
pub fn validate_uid(uid: &str) -> AuthResult<()> {
    if uid.is_empty() || uid.len() > MAX_UID_LEN {
        return Err(AuthError::validation("Invalid interaction id"));
    }
    if !uid
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(AuthError::validation("Invalid interaction id"));
    }
    Ok(())
}

/// Lifecycle state of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    /// Waiting for the end user to authenticate.
    AwaitingLogin,
    /// Authenticated; waiting for the end user to approve scopes.
    AwaitingConsent,
    /// Completed; an authorization code was issued.
    Resolved,
    /// The end user declined; `access_denied` was sent to the client.
    Cancelled,
    /// An unexpected failure ended the flow.
    Errored,
}

/// What the browser should currently be shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Prompt {
    /// The login form.
    Login(LoginPrompt),
    /// The consent form, listing what is not yet granted.
    Consent(ConsentPrompt),
}

impl Prompt {
    /// Prompt name as rendered in interaction details.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Consent(_) => "consent",
        }
    }
}

/// Login prompt details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginPrompt {
    /// Email to prefill, echoed back after a failed attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,
}

/// Consent prompt details: what the covering grant is still missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentPrompt {
    /// OIDC scopes not yet in the grant.
    pub missing_oidc_scopes: Vec<String>,

    /// OIDC claim names not yet in the grant.
    pub missing_oidc_claims: Vec<String>,

    /// Resource scopes not yet in the grant, keyed by indicator.
    pub missing_resource_scopes: Vec<(String, Vec<String>)>,
}

impl ConsentPrompt {
    /// Returns `true` when nothing is missing and consent can be
    /// skipped.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.missing_oidc_scopes.is_empty()
            && self.missing_oidc_claims.is_empty()
            && self.missing_resource_scopes.iter().all(|(_, s)| s.is_empty())
    }
}

/// A pending browser interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Opaque identifier carried in the interaction URLs.
    pub uid: String,

    /// The authorization request that started the flow. Holds the
    /// validated `redirect_uri` and `state` used for every redirect
    /// out of the interaction, including error recovery.
    pub request: AuthorizationRequest,

    /// Current lifecycle state.
    pub state: InteractionState,

    /// What the browser should be shown next.
    pub prompt: Prompt,

    /// Account bound by a successful login submission.
    pub account_id: Option<String>,

    /// Grant bound by a successful consent submission.
    pub grant_id: Option<Uuid>,

    /// Timestamp when the interaction was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the interaction expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Interaction {
    /// Creates a new interaction awaiting login.
    #[must_use]
    pub fn new(request: AuthorizationRequest, ttl: std::time::Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            uid: Uuid::new_v4().simple().to_string(),
            request,
            state: InteractionState::AwaitingLogin,
            prompt: Prompt::Login(LoginPrompt::default()),
            account_id: None,
            grant_id: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Checks if the interaction has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` while the interaction still accepts submissions.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            InteractionState::AwaitingLogin | InteractionState::AwaitingConsent
        ) && !self.is_expired()
    }
}
