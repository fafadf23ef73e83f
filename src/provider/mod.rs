//! Identity provider capability
//!
//! Every credential check, token issuance and OAuth redirect is delegated to
//! a hosted GoTrue-compatible backend. Handlers only see this trait, which
//! keeps them testable against a scripted provider.

pub mod gotrue;

use crate::models::{AuthUser, SessionGrant};
use crate::otp::VerifyOtpParams;
use async_trait::async_trait;
use std::fmt;

pub use gotrue::GoTrueClient;

/// Shown when the backend gave no usable error text
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Failures surfaced by the identity backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The backend answered and refused the request
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// The backend could not be reached
    #[error("Identity backend unreachable: {0}")]
    Transport(String),
    /// The backend answered with a body we could not read
    #[error("Unexpected identity backend response: {0}")]
    Decode(String),
    #[error("Identity provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// Human readable message, `None` when the backend gave none
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let message = match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let trimmed = message.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn message_or_default(&self) -> String {
        self.message()
            .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_string())
    }

    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// OAuth providers offered on the sign-in panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration details forwarded to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Where the confirmation email link should land
    pub redirect_to: String,
    /// S256 challenge of the verifier kept in the browser
    pub code_challenge: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for a session
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown, expired or already consumed
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionGrant, ProviderError>;

    /// Verify an email OTP (token or token hash)
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid for the given type
    async fn verify_otp(&self, params: &VerifyOtpParams) -> Result<SessionGrant, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the credentials are rejected
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionGrant, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the backend refuses the registration
    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot revoke the session
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// Send a password recovery email; its link carries a code bound to
    /// `code_challenge`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to send the email
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the token is invalid or the password is refused
    async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the access token is invalid
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError>;

    /// URL the browser should be sent to for an OAuth sign-in
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is malformed
    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError>;

    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy
    async fn health(&self) -> Result<(), ProviderError>;
}
