//! Scripted identity provider for isolated handler and resolver tests
//!
//! Every call is recorded. Credentials succeed only when they were registered
//! up front, and codes are consumed on first use the way the real backend
//! consumes them.

use crate::models::{AuthUser, SessionGrant};
use crate::otp::VerifyOtpParams;
use crate::provider::{IdentityProvider, OAuthProvider, ProviderError, SignUpRequest};
use crate::session::SessionCookieFactory;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::fixtures::TestFixtures;

/// One recorded provider call; secrets other than the credential under test are omitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ExchangeCode {
        code: String,
        code_verifier: Option<String>,
    },
    VerifyOtp(VerifyOtpParams),
    SignInWithPassword {
        email: String,
    },
    SignUp(SignUpRequest),
    SignOut {
        access_token: String,
    },
    ResetPasswordForEmail {
        email: String,
        redirect_to: String,
        code_challenge: String,
    },
    UpdatePassword {
        access_token: String,
    },
    GetUser {
        access_token: String,
    },
    AuthorizeUrl {
        provider: OAuthProvider,
        redirect_to: String,
    },
    Health,
}

#[derive(Default)]
struct MockState {
    codes: HashSet<String>,
    tokens: HashSet<String>,
    token_hashes: HashSet<String>,
    passwords: HashMap<String, String>,
    access_tokens: HashMap<String, AuthUser>,
    rejected_emails: HashMap<String, String>,
    failure: Option<ProviderError>,
    calls: Vec<ProviderCall>,
}

/// In-memory `IdentityProvider`
pub struct MockIdentityProvider {
    cookies: SessionCookieFactory,
    state: Mutex<MockState>,
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookies: TestFixtures::cookie_factory(),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configure(self, apply: impl FnOnce(&mut MockState)) -> Self {
        apply(&mut self.state());
        self
    }

    /// Accept `code` for exactly one exchange
    #[must_use]
    pub fn with_code(self, code: &str) -> Self {
        self.configure(|s| {
            s.codes.insert(code.to_string());
        })
    }

    #[must_use]
    pub fn with_token(self, token: &str) -> Self {
        self.configure(|s| {
            s.tokens.insert(token.to_string());
        })
    }

    #[must_use]
    pub fn with_token_hash(self, token_hash: &str) -> Self {
        self.configure(|s| {
            s.token_hashes.insert(token_hash.to_string());
        })
    }

    /// Register an account that can sign in with a password
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.configure(|s| {
            s.passwords.insert(email.to_string(), password.to_string());
        })
    }

    /// Treat `access_token` as a live session for `user`
    #[must_use]
    pub fn with_access_token(self, access_token: &str, user: AuthUser) -> Self {
        self.configure(|s| {
            s.access_tokens.insert(access_token.to_string(), user);
        })
    }

    /// Refuse sign-ups and recovery emails for `email` with `message`
    #[must_use]
    pub fn rejecting_email(self, email: &str, message: &str) -> Self {
        self.configure(|s| {
            s.rejected_emails
                .insert(email.to_string(), message.to_string());
        })
    }

    /// Fail every call with `error`
    #[must_use]
    pub fn failing_with(self, error: ProviderError) -> Self {
        self.configure(|s| s.failure = Some(error))
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    #[must_use]
    pub fn exchange_calls(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ProviderCall::ExchangeCode { .. }))
            .collect()
    }

    #[must_use]
    pub fn verify_calls(&self) -> Vec<VerifyOtpParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::VerifyOtp(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    /// Record `call` and return the scripted failure, if any
    fn record(&self, call: ProviderCall) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(call);
        state.failure.clone().map_or(Ok(()), Err)
    }

    fn grant(&self) -> Result<SessionGrant, ProviderError> {
        let session = TestFixtures::session();
        let cookies = self
            .cookies
            .create_session_cookies(&session)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(SessionGrant::new(session, cookies))
    }

    fn rejected(status: u16, message: &str) -> ProviderError {
        ProviderError::Rejected {
            status,
            message: message.to_string(),
        }
    }

    fn user_for(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        self.state()
            .access_tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| Self::rejected(401, "invalid JWT"))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionGrant, ProviderError> {
        self.record(ProviderCall::ExchangeCode {
            code: code.to_string(),
            code_verifier: code_verifier.map(ToString::to_string),
        })?;
        if self.state().codes.remove(code) {
            self.grant()
        } else {
            Err(Self::rejected(
                400,
                "invalid flow state, no valid flow state found",
            ))
        }
    }

    async fn verify_otp(&self, params: &VerifyOtpParams) -> Result<SessionGrant, ProviderError> {
        self.record(ProviderCall::VerifyOtp(params.clone()))?;
        let accepted = {
            let state = self.state();
            match params {
                VerifyOtpParams::TokenHash { token_hash, .. } => {
                    state.token_hashes.contains(token_hash)
                }
                VerifyOtpParams::Token { token, .. } => state.tokens.contains(token),
            }
        };
        if accepted {
            self.grant()
        } else {
            Err(Self::rejected(403, "Token has expired or is invalid"))
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionGrant, ProviderError> {
        self.record(ProviderCall::SignInWithPassword {
            email: email.to_string(),
        })?;
        let matches = self
            .state()
            .passwords
            .get(email)
            .is_some_and(|stored| stored == password);
        if matches {
            self.grant()
        } else {
            Err(Self::rejected(400, "Invalid login credentials"))
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError> {
        self.record(ProviderCall::SignUp(request.clone()))?;
        match self.state().rejected_emails.get(&request.email) {
            Some(message) => Err(Self::rejected(422, message)),
            None => Ok(()),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::SignOut {
            access_token: access_token.to_string(),
        })?;
        self.state().access_tokens.remove(access_token);
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::ResetPasswordForEmail {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
            code_challenge: code_challenge.to_string(),
        })?;
        match self.state().rejected_emails.get(email) {
            Some(message) => Err(Self::rejected(429, message)),
            None => Ok(()),
        }
    }

    async fn update_password(
        &self,
        access_token: &str,
        _password: &str,
    ) -> Result<AuthUser, ProviderError> {
        self.record(ProviderCall::UpdatePassword {
            access_token: access_token.to_string(),
        })?;
        self.user_for(access_token)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        self.record(ProviderCall::GetUser {
            access_token: access_token.to_string(),
        })?;
        self.user_for(access_token)
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError> {
        self.record(ProviderCall::AuthorizeUrl {
            provider,
            redirect_to: redirect_to.to_string(),
        })?;
        Ok(format!(
            "https://identity.test/auth/v1/authorize?provider={provider}&redirect_to={}&code_challenge={code_challenge}&code_challenge_method=s256",
            urlencoding::encode(redirect_to)
        ))
    }

    async fn health(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::Health)
    }
}
