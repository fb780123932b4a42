//! Interaction flow service.
//!
//! Drives a browser authorization flow from the validated request
//! through login and consent to the final redirect carrying the
//! authorization code. One service instance is shared by the
//! authorization and interaction endpoints.
//!
//! State lives behind the storage traits; the service itself is
//! stateless and every operation loads, mutates, and saves the
//! interaction record keyed by its uid.

use std::sync::Arc;

use tracing::{info, warn};

use crate::AuthResult;
use crate::account::{AccountStore, verify_secret};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
use crate::oauth::code::{AuthorizationCode, random_token};
use crate::oauth::grant::Grant;
use crate::oauth::interaction::{
    ConsentPrompt, Interaction, InteractionState, LoginPrompt, Prompt, validate_uid,
};
use crate::oauth::pkce;
use crate::registry::ClientRegistry;
use crate::storage::{CodeStorage, GrantStorage, InteractionStorage};
use crate::types::{GrantType, ResponseType};

/// Outcome of a login submission.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials did not match: re-render the login form with a
    /// generic message and the submitted email echoed back.
    Retry {
        /// Generic failure message. Never distinguishes unknown email
        /// from wrong password.
        message: String,
        /// Submitted email, echoed into the form.
        email: String,
    },

    /// The flow left the interaction page: redirect the browser to the
    /// given URL (client redirect with code or error).
    Redirect(String),

    /// Login succeeded and a consent prompt is pending: redirect back
    /// to the interaction page.
    NextPrompt,
}

/// The interaction flow service.
pub struct InteractionFlow {
    registry: Arc<ClientRegistry>,
    accounts: Arc<AccountStore>,
    config: Arc<AuthConfig>,
    interactions: Arc<dyn InteractionStorage>,
    grants: Arc<dyn GrantStorage>,
    codes: Arc<dyn CodeStorage>,
}

impl InteractionFlow {
    /// Creates the flow service.
    pub fn new(
        registry: Arc<ClientRegistry>,
        accounts: Arc<AccountStore>,
        config: Arc<AuthConfig>,
        interactions: Arc<dyn InteractionStorage>,
        grants: Arc<dyn GrantStorage>,
        codes: Arc<dyn CodeStorage>,
    ) -> Self {
        Self {
            registry,
            accounts,
            config,
            interactions,
            grants,
            codes,
        }
    }

    /// Validates an authorization request and opens an interaction.
    ///
    /// # Errors
    ///
    /// Unknown client and unregistered redirect URI stay local (the
    /// browser sees a 400, never a redirect to an unvetted target).
    /// Every later failure is redirectable: the caller may send it to
    /// the now-validated `redirect_uri`.
    pub async fn begin(&self, request: AuthorizationRequest) -> AuthResult<Interaction> {
        let client = self
            .registry
            .find(&request.client_id)
            .ok_or_else(|| AuthError::validation("Unknown client"))?;

        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::validation("redirect_uri is not registered"));
        }

        // From here on the redirect target is trusted and errors may
        // travel on it.
        if request.response_type != "code"
            || !client.response_types.contains(&ResponseType::Code)
        {
            return Err(AuthError::unsupported_response_type(
                request.response_type.clone(),
            ));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized(
                "Client is not authorized for the authorization_code grant",
            ));
        }

        if request.scope.trim().is_empty() {
            return Err(AuthError::invalid_scope("scope is required"));
        }

        if let Some(ref resource) = request.resource
            && self.config.resource(resource).is_none()
        {
            return Err(AuthError::invalid_request(format!(
                "Unknown resource indicator: {resource}"
            )));
        }

        match (&request.code_challenge, &request.code_challenge_method) {
            (Some(_), Some(method)) => pkce::validate_method(method)?,
            (Some(_), None) => {
                return Err(AuthError::invalid_request(
                    "code_challenge_method is required when code_challenge is present",
                ));
            }
            _ => {}
        }

        let interaction = Interaction::new(request, self.config.ttl.session);
        self.interactions.save(&interaction).await?;

        info!(
            uid = %interaction.uid,
            client_id = %interaction.request.client_id,
            "Authorization interaction started"
        );
        Ok(interaction)
    }

    /// Loads interaction details for rendering.
    ///
    /// # Errors
    ///
    /// Fails with a local (400) error on a malformed uid or an unknown,
    /// expired, or already-finished interaction.
    pub async fn details(&self, uid: &str) -> AuthResult<Interaction> {
        validate_uid(uid)?;
        let interaction = self
            .interactions
            .find(uid)
            .await?
            .ok_or_else(|| AuthError::validation("Unknown or expired interaction"))?;
        if !interaction.is_active() {
            return Err(AuthError::validation("Interaction is no longer active"));
        }
        Ok(interaction)
    }

    /// Handles a login submission.
    ///
    /// # Errors
    ///
    /// Fails locally on an invalid uid or when the interaction is not
    /// awaiting login; storage failures are redirectable via
    /// [`Self::recover_error_redirect`].
    pub async fn submit_login(
        &self,
        uid: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<LoginOutcome> {
        let mut interaction = self.details(uid).await?;
        if interaction.state != InteractionState::AwaitingLogin {
            return Err(AuthError::invalid_grant("Interaction is not awaiting login"));
        }

        let account = self.accounts.find_by_email(email);
        let verified = match account {
            Some(account) => verify_secret(password, &account.password),
            // Equalize work for unknown emails
            None => {
                let _ = verify_secret(password, "");
                false
            }
        };

        let Some(account) = account.filter(|_| verified).cloned() else {
            warn!(uid = %uid, "Login attempt failed");
            interaction.prompt = Prompt::Login(LoginPrompt {
                login_hint: Some(email.to_string()),
            });
            self.interactions.save(&interaction).await?;
            return Ok(LoginOutcome::Retry {
                message: "Invalid email or password".to_string(),
                email: email.to_string(),
            });
        };

        if !account.oauth_authorized {
            // Valid credentials but the account may not authorize
            // clients: this bounces back to the relying party instead
            // of staying on the login page.
            info!(uid = %uid, account_id = %account.id, "Account not authorized for OAuth");
            let redirect = AuthorizationError::new(
                AuthorizationErrorCode::UnauthorizedClient,
                interaction.request.state.clone(),
            )
            .to_redirect_url(&interaction.request.redirect_uri)
            .map_err(|e| AuthError::internal(e.to_string()))?;

            interaction.state = InteractionState::Errored;
            self.interactions.save(&interaction).await?;
            return Ok(LoginOutcome::Redirect(redirect));
        }

        interaction.account_id = Some(account.id.clone());

        let existing = self
            .grants
            .find_for(&account.id, &interaction.request.client_id)
            .await?;
        let prompt = self.consent_prompt(&interaction.request, existing.as_ref());

        if prompt.is_satisfied()
            && let Some(grant) = existing
        {
            // A covering grant exists: skip consent and resolve now.
            let redirect = self.resolve(&mut interaction, grant).await?;
            return Ok(LoginOutcome::Redirect(redirect));
        }

        interaction.state = InteractionState::AwaitingConsent;
        interaction.prompt = Prompt::Consent(prompt);
        self.interactions.save(&interaction).await?;
        info!(uid = %uid, account_id = %account.id, "Login accepted, consent pending");
        Ok(LoginOutcome::NextPrompt)
    }

    /// Handles a consent confirmation.
    ///
    /// Unions the approved scopes and claims into the grant, issues the
    /// authorization code, and returns the client redirect URL.
    ///
    /// # Errors
    ///
    /// Fails locally on an invalid uid; fails with `invalid_grant` when
    /// the interaction is not awaiting consent.
    pub async fn submit_consent(&self, uid: &str) -> AuthResult<String> {
        let mut interaction = self.details(uid).await?;
        if interaction.state != InteractionState::AwaitingConsent {
            return Err(AuthError::invalid_grant(
                "Interaction is not awaiting consent",
            ));
        }
        let account_id = interaction
            .account_id
            .clone()
            .ok_or_else(|| AuthError::internal("Consent reached without a bound account"))?;

        let mut grant = match self
            .grants
            .find_for(&account_id, &interaction.request.client_id)
            .await?
        {
            Some(grant) => grant,
            None => Grant::new(
                account_id.clone(),
                interaction.request.client_id.clone(),
                self.config.ttl.grant,
            ),
        };

        // Union everything the request asked for; the grant only grows.
        grant.add_oidc_scope(&interaction.request.scope);
        grant.add_oidc_claims(claims_for_scopes(&interaction.request.scopes()));
        if let Some(ref resource) = interaction.request.resource
            && let Some(config) = self.config.resource(resource)
        {
            let approved = config.approved_scopes(&interaction.request.scopes());
            if !approved.is_empty() {
                grant.add_resource_scope(resource, &approved.join(" "));
            }
        }
        self.grants.save(&grant).await?;

        self.resolve(&mut interaction, grant).await
    }

    /// Handles a cancel submission: no code is issued and the client
    /// receives `access_denied` with the original state.
    ///
    /// # Errors
    ///
    /// Fails locally on an invalid uid or inactive interaction.
    pub async fn cancel(&self, uid: &str) -> AuthResult<String> {
        let mut interaction = self.details(uid).await?;

        let redirect = AuthorizationError::new(
            AuthorizationErrorCode::AccessDenied,
            interaction.request.state.clone(),
        )
        .to_redirect_url(&interaction.request.redirect_uri)
        .map_err(|e| AuthError::internal(e.to_string()))?;

        interaction.state = InteractionState::Cancelled;
        self.interactions.save(&interaction).await?;
        info!(uid = %uid, "Interaction cancelled by the end user");
        Ok(redirect)
    }

    /// Best-effort error recovery: if the interaction's redirect target
    /// is still recoverable, translate the failure into an OAuth error
    /// redirect. Returns `None` when details cannot be recovered, in
    /// which case the caller fails closed with a generic 400.
    pub async fn recover_error_redirect(&self, uid: &str, error: &AuthError) -> Option<String> {
        if error.stays_local() || validate_uid(uid).is_err() {
            return None;
        }
        let mut interaction = self.interactions.find(uid).await.ok().flatten()?;

        // Only the classified code travels to the browser; the failure
        // text itself stays in the logs.
        let code = AuthorizationErrorCode::from_str_or_default(error.oauth_error_code());
        let redirect = AuthorizationError::new(code, interaction.request.state.clone())
            .to_redirect_url(&interaction.request.redirect_uri)
            .ok()?;

        interaction.state = InteractionState::Errored;
        let _ = self.interactions.save(&interaction).await;
        warn!(uid = %uid, error = %code, "Interaction errored, redirecting to client");
        Some(redirect)
    }

    /// Computes the consent prompt for a request against an existing
    /// grant.
    fn consent_prompt(
        &self,
        request: &AuthorizationRequest,
        grant: Option<&Grant>,
    ) -> ConsentPrompt {
        let requested = request.scopes();
        let claims = claims_for_scopes(&requested);

        let missing_oidc_scopes: Vec<String> = requested
            .iter()
            .filter(|s| !grant.is_some_and(|g| g.oidc_scopes.contains(**s)))
            .map(ToString::to_string)
            .collect();

        let missing_oidc_claims: Vec<String> = claims
            .iter()
            .filter(|c| !grant.is_some_and(|g| g.oidc_claims.contains(**c)))
            .map(ToString::to_string)
            .collect();

        let mut missing_resource_scopes = Vec::new();
        if let Some(ref resource) = request.resource
            && let Some(config) = self.config.resource(resource)
        {
            let missing: Vec<String> = config
                .approved_scopes(&requested)
                .into_iter()
                .filter(|s| {
                    !grant.is_some_and(|g| {
                        g.resource_scopes
                            .get(resource)
                            .is_some_and(|granted| granted.contains(*s))
                    })
                })
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                missing_resource_scopes.push((resource.clone(), missing));
            }
        }

        ConsentPrompt {
            missing_oidc_scopes,
            missing_oidc_claims,
            missing_resource_scopes,
        }
    }

    /// Issues the authorization code and resolves the interaction.
    async fn resolve(&self, interaction: &mut Interaction, grant: Grant) -> AuthResult<String> {
        let now = time::OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            code: random_token(),
            client_id: interaction.request.client_id.clone(),
            account_id: grant.account_id.clone(),
            grant_id: grant.id,
            redirect_uri: interaction.request.redirect_uri.clone(),
            scope: interaction.request.scope.clone(),
            resource: interaction.request.resource.clone(),
            nonce: interaction.request.nonce.clone(),
            code_challenge: interaction.request.code_challenge.clone(),
            created_at: now,
            expires_at: now + self.config.ttl.authorization_code,
        };
        self.codes.create(&code).await?;

        let redirect =
            AuthorizationResponse::new(code.code.clone(), interaction.request.state.clone())
                .to_redirect_url(&interaction.request.redirect_uri)
                .map_err(|e| AuthError::internal(e.to_string()))?;

        interaction.state = InteractionState::Resolved;
        interaction.grant_id = Some(grant.id);
        self.interactions.save(interaction).await?;

        info!(
            uid = %interaction.uid,
            client_id = %interaction.request.client_id,
            grant_id = %grant.id,
            "Interaction resolved, authorization code issued"
        );
        Ok(redirect)
    }
}

/// Maps requested OIDC scopes to the claim names they unlock.
fn claims_for_scopes(scopes: &[&str]) -> Vec<&'static str> {
    let mut claims = Vec::new();
    for scope in scopes {
        match *scope {
            "profile" => claims.push("name"),
            "email" => claims.push("email"),
            _ => {}
        }
    }
    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::registry::{ClientSources, FallbackClient};
    use crate::storage::MemoryStorage;

    fn accounts() -> AccountStore {
        AccountStore::new(vec![
            Account {
                id: "acct-1".to_string(),
                email: "alice@example.com".to_string(),
                password: "passw0rd!".to_string(),
                display_name: "Alice Example".to_string(),
                oauth_authorized: true,
            },
            Account {
                id: "acct-2".to_string(),
                email: "bob@example.com".to_string(),
                password: "hunter2".to_string(),
                display_name: "Bob Example".to_string(),
                oauth_authorized: false,
            },
        ])
    }

    fn flow() -> InteractionFlow {
        let registry = ClientRegistry::load(ClientSources {
            fallback: Some(FallbackClient {
                client_id: "dev-rp".to_string(),
                client_secret: "dev-secret".to_string(),
                redirect_uri: "https://app.example/callback".to_string(),
            }),
            ..ClientSources::default()
        })
        .unwrap();
        let storage = Arc::new(MemoryStorage::new());
        InteractionFlow::new(
            Arc::new(registry),
            Arc::new(accounts()),
            Arc::new(AuthConfig::default()),
            storage.clone(),
            storage.clone(),
            storage,
        )
    }

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: "code".to_string(),
            client_id: "dev-rp".to_string(),
            redirect_uri: "https://app.example/callback".to_string(),
            scope: "openid profile".to_string(),
            state: "xyz".to_string(),
            resource: None,
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    #[tokio::test]
    async fn test_begin_unknown_client_stays_local() {
        let flow = flow();
        let mut req = request();
        req.client_id = "ghost".to_string();
        let err = flow.begin(req).await.unwrap_err();
        assert!(err.stays_local());
    }

    #[tokio::test]
    async fn test_begin_unregistered_redirect_stays_local() {
        let flow = flow();
        let mut req = request();
        req.redirect_uri = "https://evil.example/cb".to_string();
        let err = flow.begin(req).await.unwrap_err();
        assert!(err.stays_local());
    }

    #[tokio::test]
    async fn test_begin_bad_response_type_is_redirectable() {
        let flow = flow();
        let mut req = request();
        req.response_type = "token".to_string();
        let err = flow.begin(req).await.unwrap_err();
        assert!(!err.stays_local());
        assert_eq!(err.oauth_error_code(), "unsupported_response_type");
    }

    #[tokio::test]
    async fn test_begin_unknown_resource_rejected() {
        let flow = flow();
        let mut req = request();
        req.resource = Some("https://unknown.example".to_string());
        let err = flow.begin(req).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_login_bad_credentials_retries_with_email() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();

        let outcome = flow
            .submit_login(&interaction.uid, "alice@example.com", "wrong")
            .await
            .unwrap();
        match outcome {
            LoginOutcome::Retry { message, email } => {
                assert_eq!(email, "alice@example.com");
                assert!(!message.contains("password only"));
            }
            other => panic!("expected Retry, got {other:?}"),
        }

        // Still awaiting login
        let details = flow.details(&interaction.uid).await.unwrap();
        assert_eq!(details.state, InteractionState::AwaitingLogin);
    }

    #[tokio::test]
    async fn test_login_unknown_email_same_generic_message() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();
        let outcome = flow
            .submit_login(&interaction.uid, "ghost@example.com", "whatever")
            .await
            .unwrap();
        match outcome {
            LoginOutcome::Retry { message, .. } => {
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("expected Retry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_forbidden_account_redirects_unauthorized_client() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();

        let outcome = flow
            .submit_login(&interaction.uid, "bob@example.com", "hunter2")
            .await
            .unwrap();
        match outcome {
            LoginOutcome::Redirect(url) => {
                assert!(url.starts_with("https://app.example/callback?"));
                assert!(url.contains("error=unauthorized_client"));
                assert!(url.contains("state=xyz"));
                assert!(!url.contains("code="));
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_login_consent_resolution() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();

        let outcome = flow
            .submit_login(&interaction.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::NextPrompt));

        let details = flow.details(&interaction.uid).await.unwrap();
        assert_eq!(details.state, InteractionState::AwaitingConsent);
        match &details.prompt {
            Prompt::Consent(prompt) => {
                assert_eq!(prompt.missing_oidc_scopes, vec!["openid", "profile"]);
                assert_eq!(prompt.missing_oidc_claims, vec!["name"]);
            }
            other => panic!("expected consent prompt, got {other:?}"),
        }

        let redirect = flow.submit_consent(&interaction.uid).await.unwrap();
        assert!(redirect.starts_with("https://app.example/callback?"));
        assert!(redirect.contains("code="));
        assert!(redirect.contains("state=xyz"));
    }

    #[tokio::test]
    async fn test_covering_grant_skips_consent() {
        let flow = flow();

        // First pass approves everything
        let first = flow.begin(request()).await.unwrap();
        flow.submit_login(&first.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();
        flow.submit_consent(&first.uid).await.unwrap();

        // Second pass with the same scopes resolves straight from login
        let second = flow.begin(request()).await.unwrap();
        let outcome = flow
            .submit_login(&second.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();
        match outcome {
            LoginOutcome::Redirect(url) => assert!(url.contains("code=")),
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_widened_scope_requires_consent_again() {
        let flow = flow();

        let first = flow.begin(request()).await.unwrap();
        flow.submit_login(&first.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();
        flow.submit_consent(&first.uid).await.unwrap();

        let mut req = request();
        req.scope = "openid profile email".to_string();
        let second = flow.begin(req).await.unwrap();
        let outcome = flow
            .submit_login(&second.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::NextPrompt));

        let details = flow.details(&second.uid).await.unwrap();
        match &details.prompt {
            Prompt::Consent(prompt) => {
                assert_eq!(prompt.missing_oidc_scopes, vec!["email"]);
                assert_eq!(prompt.missing_oidc_claims, vec!["email"]);
            }
            other => panic!("expected consent prompt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_redirects_access_denied_without_code() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();
        flow.submit_login(&interaction.uid, "alice@example.com", "passw0rd!")
            .await
            .unwrap();

        let redirect = flow.cancel(&interaction.uid).await.unwrap();
        assert_eq!(
            redirect,
            "https://app.example/callback?error=access_denied&state=xyz"
        );
    }

    #[tokio::test]
    async fn test_consent_before_login_is_invalid_grant() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();
        let err = flow.submit_consent(&interaction.uid).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_details_rejects_malformed_uid() {
        let flow = flow();
        let err = flow.details("../../etc").await.unwrap_err();
        assert!(err.stays_local());
    }

    #[tokio::test]
    async fn test_recover_error_redirect() {
        let flow = flow();
        let interaction = flow.begin(request()).await.unwrap();

        let error = AuthError::invalid_grant("Grant has expired");
        let redirect = flow
            .recover_error_redirect(&interaction.uid, &error)
            .await
            .unwrap();
        assert!(redirect.starts_with("https://app.example/callback?"));
        assert!(redirect.contains("error=invalid_grant"));
        assert!(redirect.contains("state=xyz"));

        // Local errors and unknown uids fail closed
        assert!(
            flow.recover_error_redirect(&interaction.uid, &AuthError::validation("bad uid"))
                .await
                .is_none()
        );
        let uid = uuid::Uuid::new_v4().simple().to_string();
        assert!(flow.recover_error_redirect(&uid, &error).await.is_none());
    }
}
