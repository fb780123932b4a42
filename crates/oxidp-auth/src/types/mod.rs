//! Domain types shared across the authorization server.

pub mod access_token;
pub mod client;
pub mod refresh_token;

pub use access_token::OpaqueAccessToken;
pub use client::{
    ClientDescriptor, ClientValidationError, GrantType, ResponseType, TokenEndpointAuthMethod,
};
pub use refresh_token::RefreshToken;
