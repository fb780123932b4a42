//! Grant records: the accumulated consent for an (account, client) pair.
//!
//! A grant only ever grows. Each consent interaction unions the newly
//! approved scopes and claims into the existing record, so a grant
//! reflects everything the account has approved for the client over
//! time. Nothing in the flow removes an entry; revocation is deleting
//! the whole grant.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Accumulated authorization state for an (account, client) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Grant identifier, referenced by codes and refresh tokens.
    pub id: Uuid,

    /// Account that approved the grant.
    pub account_id: String,

    /// Client the grant was approved for.
    pub client_id: String,

    /// Approved OIDC scopes. Ordered for stable serialization.
    pub oidc_scopes: BTreeSet<String>,

    /// Approved OIDC claim names.
    pub oidc_claims: BTreeSet<String>,

    /// Approved scopes per resource indicator.
    pub resource_scopes: BTreeMap<String, BTreeSet<String>>,

    /// Timestamp when the grant was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the grant expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Grant {
    /// Creates an empty grant for an (account, client) pair.
    #[must_use]
    pub fn new(account_id: String, client_id: String, ttl: std::time::Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            account_id,
            client_id,
            oidc_scopes: BTreeSet::new(),
            oidc_claims: BTreeSet::new(),
            resource_scopes: BTreeMap::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Unions a space-delimited scope string into the OIDC scope set.
    pub fn add_oidc_scope(&mut self, scope: &str) {
        for s in scope.split_whitespace() {
            self.oidc_scopes.insert(s.to_string());
        }
    }

    /// Unions claim names into the OIDC claim set.
    pub fn add_oidc_claims<I, S>(&mut self, claims: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for claim in claims {
            self.oidc_claims.insert(claim.into());
        }
    }

    /// Unions a space-delimited scope string into a resource's scope set.
    pub fn add_resource_scope(&mut self, resource: &str, scope: &str) {
        let entry = self.resource_scopes.entry(resource.to_string()).or_default();
        for s in scope.split_whitespace() {
            entry.insert(s.to_string());
        }
    }

    /// Space-joined OIDC scope string for token issuance.
    #[must_use]
    pub fn oidc_scope(&self) -> String {
        self.oidc_scopes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Approved scopes for a resource, space-joined, if any were granted.
    #[must_use]
    pub fn resource_scope(&self, resource: &str) -> Option<String> {
        self.resource_scopes.get(resource).map(|scopes| {
            scopes
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    /// Returns `true` if every requested scope and claim is already
    /// covered by this grant. A covering grant lets the flow skip the
    /// consent prompt entirely.
    #[must_use]
    pub fn covers(
        &self,
        oidc_scopes: &[&str],
        oidc_claims: &[&str],
        resource_scopes: Option<(&str, &[&str])>,
    ) -> bool {
        let scopes_ok = oidc_scopes.iter().all(|s| self.oidc_scopes.contains(*s));
        let claims_ok = oidc_claims.iter().all(|c| self.oidc_claims.contains(*c));
        let resources_ok = match resource_scopes {
            Some((resource, scopes)) => match self.resource_scopes.get(resource) {
                Some(granted) => scopes.iter().all(|s| granted.contains(*s)),
                None => scopes.is_empty(),
            },
            None => true,
        };
        scopes_ok && claims_ok && resources_ok
    }

    /// Checks if the grant has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }
}
