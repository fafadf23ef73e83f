use crate::models::VerificationRequest;
use crate::otp::VerifyOtpParams;
use crate::provider::IdentityProvider;
use crate::utils::{sanitize_next, LoggingHelper};
use actix_web::cookie::Cookie;
use std::sync::Arc;

/// Why a callback could not be resolved.
///
/// Chosen by which inputs were present, never by the backend's error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    CodeExchange,
    TokenVerification,
    MissingParameters,
}

impl FailureReason {
    #[must_use]
    pub fn for_request(request: &VerificationRequest) -> Self {
        if request.code().is_some() {
            Self::CodeExchange
        } else if request.has_token() {
            Self::TokenVerification
        } else {
            Self::MissingParameters
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeExchange => "Could not exchange code for session",
            Self::TokenVerification => "Could not verify token",
            Self::MissingParameters => "Missing authentication parameters",
        }
    }
}

/// Which credential established the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPath {
    CodeExchange,
    TokenVerification,
}

/// Terminal outcome of one callback
#[derive(Debug, Clone)]
pub enum Resolution {
    Authenticated {
        location: String,
        cookies: Vec<Cookie<'static>>,
        via: CredentialPath,
    },
    Failed {
        reason: FailureReason,
    },
}

impl Resolution {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Resolves provider redirects and email links into a session.
///
/// The code exchange runs first; token verification only runs if there was
/// no code or the exchange failed. Each path is tried at most once and the
/// first success wins.
#[derive(Clone)]
pub struct CallbackResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl CallbackResolver {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(
        &self,
        request: &VerificationRequest,
        code_verifier: Option<&str>,
    ) -> Resolution {
        LoggingHelper::log_verification_request("Callback", request);
        let location = sanitize_next(request.next());

        if let Some(code) = request.code() {
            match self
                .provider
                .exchange_code_for_session(code, code_verifier)
                .await
            {
                Ok(grant) => {
                    LoggingHelper::log_authenticated("Code exchange", &location, grant.cookies.len());
                    return Resolution::Authenticated {
                        location,
                        cookies: grant.cookies,
                        via: CredentialPath::CodeExchange,
                    };
                }
                Err(e) => LoggingHelper::log_exchange_failed("Code exchange", &e),
            }
        }

        if let Some(params) = VerifyOtpParams::from_request(request) {
            match self.provider.verify_otp(&params).await {
                Ok(grant) => {
                    LoggingHelper::log_authenticated(
                        "Token verification",
                        &location,
                        grant.cookies.len(),
                    );
                    return Resolution::Authenticated {
                        location,
                        cookies: grant.cookies,
                        via: CredentialPath::TokenVerification,
                    };
                }
                Err(e) => LoggingHelper::log_exchange_failed("Token verification", &e),
            }
        }

        let reason = FailureReason::for_request(request);
        LoggingHelper::log_resolution_failed(reason.as_str());
        Resolution::Failed { reason }
    }
}
