//! Storage traits for authorization flow state.
//!
//! Interactions, grants, authorization codes, and token records are all
//! reached through these traits so the in-memory backend can be swapped
//! for a persistent one without touching the flow or token service.
//! Records carry their own expiry; `find`/`consume` never return an
//! expired record.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::oauth::code::AuthorizationCode;
use crate::oauth::grant::Grant;
use crate::oauth::interaction::Interaction;
use crate::types::{OpaqueAccessToken, RefreshToken};

pub use memory::MemoryStorage;

/// Storage for pending browser interactions, keyed by uid.
#[async_trait]
pub trait InteractionStorage: Send + Sync {
    /// Persists an interaction (insert or replace by uid).
    async fn save(&self, interaction: &Interaction) -> AuthResult<()>;

    /// Finds a live interaction by uid. Expired records are not
    /// returned.
    async fn find(&self, uid: &str) -> AuthResult<Option<Interaction>>;

    /// Deletes an interaction by uid.
    async fn delete(&self, uid: &str) -> AuthResult<()>;
}

/// Storage for accumulated grants.
#[async_trait]
pub trait GrantStorage: Send + Sync {
    /// Persists a grant (insert or replace by id) and returns its id.
    async fn save(&self, grant: &Grant) -> AuthResult<Uuid>;

    /// Finds a live grant by id.
    async fn find(&self, id: Uuid) -> AuthResult<Option<Grant>>;

    /// Finds the live grant for an (account, client) pair, if one
    /// exists.
    async fn find_for(&self, account_id: &str, client_id: &str) -> AuthResult<Option<Grant>>;

    /// Deletes a grant by id.
    async fn delete(&self, id: Uuid) -> AuthResult<()>;
}

/// Storage for single-use authorization codes.
#[async_trait]
pub trait CodeStorage: Send + Sync {
    /// Stores a new authorization code.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Atomically removes and returns the code record. A second call
    /// with the same value returns `None`, which the token endpoint
    /// reports as `invalid_grant`.
    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;
}

/// Storage for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Atomically removes and returns the token record. Rotation: the
    /// presented token is always consumed, and the exchange issues a
    /// replacement.
    async fn consume(&self, token: &str) -> AuthResult<Option<RefreshToken>>;
}

/// Storage for opaque access tokens.
#[async_trait]
pub trait AccessTokenStorage: Send + Sync {
    /// Stores a new opaque access token.
    async fn create(&self, token: &OpaqueAccessToken) -> AuthResult<()>;

    /// Finds a live token by its value.
    async fn find(&self, token: &str) -> AuthResult<Option<OpaqueAccessToken>>;
}
