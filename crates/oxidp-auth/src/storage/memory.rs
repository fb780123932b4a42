//! In-memory storage backend.
//!
//! The reference deployment keeps all flow state in process memory.
//! Expiry is enforced on read: lookups drop and ignore expired records
//! rather than relying on a background sweeper.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::AuthResult;
use crate::oauth::code::AuthorizationCode;
use crate::oauth::grant::Grant;
use crate::oauth::interaction::Interaction;
use crate::types::{OpaqueAccessToken, RefreshToken};

use super::{
    AccessTokenStorage, CodeStorage, GrantStorage, InteractionStorage, RefreshTokenStorage,
};

/// A single in-memory backend implementing every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    interactions: RwLock<HashMap<String, Interaction>>,
    grants: RwLock<HashMap<Uuid, Grant>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
    access_tokens: RwLock<HashMap<String, OpaqueAccessToken>>,
}

impl MemoryStorage {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStorage for MemoryStorage {
    async fn save(&self, interaction: &Interaction) -> AuthResult<()> {
        self.interactions
            .write()
            .await
            .insert(interaction.uid.clone(), interaction.clone());
        Ok(())
    }

    async fn find(&self, uid: &str) -> AuthResult<Option<Interaction>> {
        let mut interactions = self.interactions.write().await;
        match interactions.get(uid) {
            Some(interaction) if interaction.is_expired() => {
                interactions.remove(uid);
                Ok(None)
            }
            Some(interaction) => Ok(Some(interaction.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, uid: &str) -> AuthResult<()> {
        self.interactions.write().await.remove(uid);
        Ok(())
    }
}

#[async_trait]
impl GrantStorage for MemoryStorage {
    async fn save(&self, grant: &Grant) -> AuthResult<Uuid> {
        self.grants.write().await.insert(grant.id, grant.clone());
        Ok(grant.id)
    }

    async fn find(&self, id: Uuid) -> AuthResult<Option<Grant>> {
        let mut grants = self.grants.write().await;
        match grants.get(&id) {
            Some(grant) if grant.is_expired() => {
                grants.remove(&id);
                Ok(None)
            }
            Some(grant) => Ok(Some(grant.clone())),
            None => Ok(None),
        }
    }

    async fn find_for(&self, account_id: &str, client_id: &str) -> AuthResult<Option<Grant>> {
        let grants = self.grants.read().await;
        Ok(grants
            .values()
            .find(|g| g.account_id == account_id && g.client_id == client_id && !g.is_expired())
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.grants.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CodeStorage for MemoryStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes
            .write()
            .await
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let mut codes = self.codes.write().await;
        match codes.remove(code) {
            Some(record) if record.is_expired() => Ok(None),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.refresh_tokens
            .write()
            .await
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn consume(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let mut tokens = self.refresh_tokens.write().await;
        match tokens.remove(token) {
            Some(record) if record.is_expired() => Ok(None),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl AccessTokenStorage for MemoryStorage {
    async fn create(&self, token: &OpaqueAccessToken) -> AuthResult<()> {
        self.access_tokens
            .write()
            .await
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> AuthResult<Option<OpaqueAccessToken>> {
        let mut tokens = self.access_tokens.write().await;
        match tokens.get(token) {
            Some(record) if record.is_expired() => {
                tokens.remove(token);
                Ok(None)
            }
            Some(record) => Ok(Some(record.clone())),
            None => Ok(None),
        }
    }
}
