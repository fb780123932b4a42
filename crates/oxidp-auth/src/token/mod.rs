//! Token issuance: policy, JWT signing, the token endpoint service,
//! and the issuance observer hook.

pub mod jwt;
pub mod observer;
pub mod policy;
pub mod service;

pub use jwt::{AccessTokenClaims, IdTokenClaims, Jwk, Jwks, JwtError, JwtService, SigningKeyPair};
pub use observer::{IssuanceEvent, TokenObserver, TracingObserver};
pub use policy::{AccessTokenFormat, IssuancePolicy, TokenIssuanceDecision};
pub use service::{TokenRequest, TokenResponse, TokenService};
