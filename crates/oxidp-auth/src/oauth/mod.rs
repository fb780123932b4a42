//! OAuth 2.0 / OIDC authorization flow: request types, interaction
//! state, grants, authorization codes, and PKCE.

pub mod authorize;
pub mod code;
pub mod flow;
pub mod grant;
pub mod interaction;
pub mod pkce;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
pub use code::AuthorizationCode;
pub use flow::{InteractionFlow, LoginOutcome};
pub use grant::Grant;
pub use interaction::{
    ConsentPrompt, Interaction, InteractionState, LoginPrompt, Prompt, validate_uid,
};
