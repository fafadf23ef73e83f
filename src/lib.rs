#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authgate application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod callback;
pub mod handlers;
pub mod models;
pub mod otp;
pub mod provider;
pub mod session;
pub mod settings;
pub mod utils;
pub mod validation;
pub mod verifier;
pub mod views;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use callback::{CallbackResolver, Resolution};
pub use handlers::configure_services;
pub use models::{AuthSession, VerificationOutcome, VerificationRequest};
pub use provider::{GoTrueClient, IdentityProvider, ProviderError};
pub use session::SessionCookieFactory;
pub use settings::AuthGateSettings;
pub use verifier::{EmailVerifier, VerifyStatus};
