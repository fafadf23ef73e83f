//! Email verification state machine
//!
//! Drives the `/auth/verify` page: one token verification, a three-state
//! status published on a watch channel, and a single delayed navigation to
//! `next` on success. Every failure ends in the `Error` state; nothing is
//! propagated to the caller.

use crate::models::{VerificationOutcome, VerificationRequest};
use crate::otp::VerifyOtpParams;
use crate::provider::IdentityProvider;
use crate::utils::{sanitize_next, LoggingHelper};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Pause between showing success and navigating away
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1000);

pub const MISSING_TOKEN_MESSAGE: &str = "Missing verification token";
pub const MISSING_TYPE_MESSAGE: &str = "Missing verification type";

const DEFAULT_SIGN_IN_PATH: &str = "/auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStatus {
    Verifying,
    Success,
    Error(String),
}

impl VerifyStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Verifying)
    }
}

/// Client-side navigation
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
}

/// Single-shot email verifier
pub struct EmailVerifier {
    provider: Arc<dyn IdentityProvider>,
    sign_in_path: String,
    status: watch::Sender<VerifyStatus>,
    outcome: Mutex<Option<VerificationOutcome>>,
}

impl EmailVerifier {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (status, _) = watch::channel(VerifyStatus::Verifying);
        Self {
            provider,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            status,
            outcome: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_sign_in_path(mut self, path: &str) -> Self {
        self.sign_in_path = path.to_string();
        self
    }

    /// Observe status transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<VerifyStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> VerifyStatus {
        self.status.borrow().clone()
    }

    /// Run the verification once.
    ///
    /// Later calls return the first outcome without contacting the provider.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        let mut outcome = self.outcome.lock().await;
        if let Some(done) = outcome.as_ref() {
            return done.clone();
        }

        LoggingHelper::log_verification_request("Verifier", request);
        let result = self.attempt(request).await;
        self.status.send_replace(match &result {
            VerificationOutcome::Verified(_) => VerifyStatus::Success,
            VerificationOutcome::Rejected(message) => VerifyStatus::Error(message.clone()),
        });
        *outcome = Some(result.clone());
        result
    }

    async fn attempt(&self, request: &VerificationRequest) -> VerificationOutcome {
        if !request.has_token() {
            return VerificationOutcome::Rejected(MISSING_TOKEN_MESSAGE.to_string());
        }
        let Some(params) = VerifyOtpParams::from_request(request) else {
            return VerificationOutcome::Rejected(MISSING_TYPE_MESSAGE.to_string());
        };

        match self.provider.verify_otp(&params).await {
            Ok(grant) => VerificationOutcome::Verified(grant),
            Err(e) => {
                LoggingHelper::log_exchange_failed("Email verification", &e);
                VerificationOutcome::Rejected(e.message_or_default())
            }
        }
    }

    /// Verify, then after [`REDIRECT_DELAY`] navigate once to `next` on success
    pub async fn run(&self, request: &VerificationRequest, navigator: &dyn Navigator) -> VerifyStatus {
        if self.verify(request).await.is_verified() {
            tokio::time::sleep(REDIRECT_DELAY).await;
            navigator.push(&sanitize_next(request.next()));
        }
        self.status()
    }

    /// Manual escape hatch shown with the error state
    pub fn return_to_sign_in(&self, navigator: &dyn Navigator) {
        navigator.push(&self.sign_in_path);
    }
}
