//! Account store and claims resolution.
//!
//! Accounts are an in-memory, read-mostly map seeded at startup. Lookup
//! is by email at login time and by id (token subject) at claims time.
//!
//! Credential comparison is timing-safe: candidate and stored password
//! are compared over length-padded buffers with a constant-time equality
//! primitive, and the original lengths are folded into the result the
//! same way. Length is already observable to an attacker through the
//! account lookup, so the explicit length check closes the padding gap
//! without leaking anything new.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// An end-user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable subject identifier (`sub` claim).
    pub id: String,

    /// Email address, used as the login identifier.
    pub email: String,

    /// Plaintext credential. Hashing is out of scope for this reference
    /// deployment.
    pub password: String,

    /// Display name.
    pub display_name: String,

    /// Whether the account may authorize OAuth clients. Accounts with
    /// this flag unset authenticate successfully but are refused before
    /// any grant is produced.
    pub oauth_authorized: bool,
}

/// OIDC claims resolved for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier. Always present.
    pub sub: String,

    /// Email claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Name claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// In-memory account store.
///
/// Read-mostly after construction; shared by reference into the
/// interaction flow and the userinfo endpoint.
#[derive(Debug, Default)]
pub struct AccountStore {
    by_id: HashMap<String, Account>,
}

impl AccountStore {
    /// Creates a store from a list of accounts.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        let by_id = accounts.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self { by_id }
    }

    /// Finds an account by its login email.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.by_id.values().find(|a| a.email == email)
    }

    /// Finds an account by its subject identifier.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Account> {
        self.by_id.get(id)
    }

    /// Resolves OIDC claims for a subject.
    ///
    /// Never fails: the issuer must still answer claims requests for
    /// subjects whose backing record has disappeared, so an unknown id
    /// yields a minimal `{sub}` object.
    #[must_use]
    pub fn claims(&self, id: &str) -> Claims {
        match self.by_id.get(id) {
            Some(account) => Claims {
                sub: account.id.clone(),
                email: Some(account.email.clone()),
                name: Some(account.display_name.clone()),
            },
            None => Claims {
                sub: id.to_string(),
                email: None,
                name: None,
            },
        }
    }

    /// Number of accounts in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Padded buffer size for credential comparison. Secrets longer than
/// this are compared over their own length.
const COMPARE_PAD: usize = 64;

/// Compares a candidate secret against the stored one in constant time.
///
/// Both inputs are copied into zero-padded buffers of equal length
/// before the byte comparison, and the length equality is combined into
/// the constant-time result rather than short-circuiting.
#[must_use]
pub fn verify_secret(candidate: &str, actual: &str) -> bool {
    let len = candidate.len().max(actual.len()).max(COMPARE_PAD);

    let mut a = vec![0u8; len];
    a[..candidate.len()].copy_from_slice(candidate.as_bytes());
    let mut b = vec![0u8; len];
    b[..actual.len()].copy_from_slice(actual.as_bytes());

    let bytes_equal = a.ct_eq(&b);
    let lengths_equal = candidate.len().ct_eq(&actual.len());

    (bytes_equal & lengths_equal).into()
}
