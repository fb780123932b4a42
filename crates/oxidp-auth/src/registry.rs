//! Client registry: loads and validates client descriptors at startup.
//!
//! Resolution order, first match wins:
//!
//! 1. An environment-provided JSON array of descriptors
//! 2. A JSON file at a project-relative path
//! 3. A single-client fallback synthesized from scalar configuration
//!
//! Every tier goes through the same schema validation; any failure is a
//! [`ConfigError`] and aborts startup. The registry is read-only after
//! load and shared by reference into the interaction flow and token
//! service.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::types::{ClientDescriptor, GrantType, ResponseType, TokenEndpointAuthMethod};

/// Where client descriptors may come from, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ClientSources {
    /// Raw JSON array from the environment (tier 1).
    pub env_json: Option<String>,

    /// Path to a JSON file holding an array of descriptors (tier 2).
    pub file_path: Option<PathBuf>,

    /// Scalar fallback configuration (tier 3).
    pub fallback: Option<FallbackClient>,
}

/// Scalar configuration for the single-client fallback tier.
///
/// The remaining descriptor fields are synthesized with fixed defaults:
/// both grant types, `code` response type, `client_secret_basic` auth.
#[derive(Debug, Clone)]
pub struct FallbackClient {
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Single redirect URI.
    pub redirect_uri: String,
}

impl FallbackClient {
    fn into_descriptor(self) -> ClientDescriptor {
        ClientDescriptor {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uris: vec![self.redirect_uri],
            post_logout_redirect_uris: Vec::new(),
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::ClientSecretBasic,
            force_refresh_token: None,
        }
    }
}

/// The loaded, validated set of client registrations.
///
/// `force_refresh_token` flags have been extracted into [`Self::forces_refresh_token`]
/// and stripped from the descriptors themselves.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientDescriptor>,
    force_refresh: HashSet<String>,
}

impl ClientRegistry {
    /// Loads the registry from the first available source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on malformed JSON, a schema violation
    /// (naming the offending descriptor and field), a duplicate
    /// `client_id`, or when no source yields any descriptors. Callers
    /// treat this as process-fatal.
    pub fn load(sources: ClientSources) -> Result<Self, ConfigError> {
        if let Some(json) = sources.env_json {
            let descriptors = parse_descriptors(&json, "environment")?;
            return Self::from_descriptors(descriptors);
        }

        if let Some(ref path) = sources.file_path
            && path.exists()
        {
            let descriptors = read_descriptor_file(path)?;
            return Self::from_descriptors(descriptors);
        }

        if let Some(fallback) = sources.fallback {
            return Self::from_descriptors(vec![fallback.into_descriptor()]);
        }

        Err(ConfigError::NoClientSource)
    }

    /// Builds a registry from already-parsed descriptors.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on schema violations or duplicate ids.
    pub fn from_descriptors(descriptors: Vec<ClientDescriptor>) -> Result<Self, ConfigError> {
        if descriptors.is_empty() {
            return Err(ConfigError::NoClientSource);
        }

        let mut clients = HashMap::with_capacity(descriptors.len());
        let mut force_refresh = HashSet::new();

        for (index, mut descriptor) in descriptors.into_iter().enumerate() {
            descriptor
                .validate()
                .map_err(|reason| ConfigError::InvalidClient {
                    index,
                    client_id: descriptor.client_id.clone(),
                    reason,
                })?;

            if descriptor.force_refresh_token.take() == Some(true) {
                force_refresh.insert(descriptor.client_id.clone());
            }

            let client_id = descriptor.client_id.clone();
            if clients.insert(client_id.clone(), descriptor).is_some() {
                return Err(ConfigError::DuplicateClientId { client_id });
            }
        }

        Ok(Self {
            clients,
            force_refresh,
        })
    }

    /// Finds a client by its id.
    #[must_use]
    pub fn find(&self, client_id: &str) -> Option<&ClientDescriptor> {
        self.clients.get(client_id)
    }

    /// Returns `true` if the client carried the `force_refresh_token`
    /// flag at load time.
    #[must_use]
    pub fn forces_refresh_token(&self, client_id: &str) -> bool {
        self.force_refresh.contains(client_id)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if the registry holds no clients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterates over the registered descriptors.
    pub fn iter(&self) -> impl Iterator<Item = &ClientDescriptor> {
        self.clients.values()
    }
}

fn parse_descriptors(
    json: &str,
    source_name: &'static str,
) -> Result<Vec<ClientDescriptor>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::MalformedClientJson {
        source_name,
        message: e.to_string(),
    })
}

fn read_descriptor_file(path: &Path) -> Result<Vec<ClientDescriptor>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::MalformedClientJson {
        source_name: "file",
        message: e.to_string(),
    })?;
    parse_descriptors(&contents, "file")
}
