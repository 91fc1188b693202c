//! Scope lists, bearer tokens, and the redacting secret wrapper.

pub mod scope;
pub mod token;

pub use scope::*;
pub use token::{Token, secret::TokenSecret};
