//! Credential models: the bearer credential, anti-forgery tokens, and their redacting secret
//! wrapper.

pub mod credential;
pub mod csrf_token;
pub mod secret;

pub use credential::*;
pub use csrf_token::*;
pub use secret::*;
