//! Authentication callback resolution
//!
//! Turns the query string of a provider redirect or email link into either a
//! session and a redirect to `next`, or a redirect to the error view.

pub mod resolver;

pub use resolver::{CallbackResolver, CredentialPath, FailureReason, Resolution};
