use serde::{Deserialize, Serialize};
use std::fmt;

/// Panels of the authentication page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthView {
    #[default]
    SignIn,
    SignUp,
    ForgotPassword,
    ResetSuccess,
}

/// User intents that move between panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthViewEvent {
    ShowSignIn,
    ShowSignUp,
    ShowForgotPassword,
    /// The recovery email was accepted by the backend
    ResetEmailSent,
}

/// Every permitted `(from, event) -> to` move; anything absent is refused
pub const TRANSITIONS: &[(AuthView, AuthViewEvent, AuthView)] = &[
    (AuthView::SignIn, AuthViewEvent::ShowSignUp, AuthView::SignUp),
    (AuthView::SignIn, AuthViewEvent::ShowForgotPassword, AuthView::ForgotPassword),
    (AuthView::SignUp, AuthViewEvent::ShowSignIn, AuthView::SignIn),
    (AuthView::ForgotPassword, AuthViewEvent::ShowSignIn, AuthView::SignIn),
    (AuthView::ForgotPassword, AuthViewEvent::ResetEmailSent, AuthView::ResetSuccess),
    (AuthView::ResetSuccess, AuthViewEvent::ShowSignIn, AuthView::SignIn),
];

impl AuthView {
    pub const ALL: [Self; 4] = [
        Self::SignIn,
        Self::SignUp,
        Self::ForgotPassword,
        Self::ResetSuccess,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::SignIn => "sign-in",
            Self::SignUp => "sign-up",
            Self::ForgotPassword => "forgot-password",
            Self::ResetSuccess => "reset-success",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.slug() == slug)
    }

    /// Next view for `event`, or `None` if the move is not in [`TRANSITIONS`]
    #[must_use]
    pub fn transition(self, event: AuthViewEvent) -> Option<Self> {
        TRANSITIONS
            .iter()
            .find(|(from, on, _)| *from == self && *on == event)
            .map(|(_, _, to)| *to)
    }

    /// Moves offered from this view, in table order
    #[must_use]
    pub fn available(self) -> Vec<(AuthViewEvent, Self)> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| *from == self)
            .map(|(_, on, to)| (*on, *to))
            .collect()
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::SignIn => "Sign in",
            Self::SignUp => "Create an account",
            Self::ForgotPassword => "Reset your password",
            Self::ResetSuccess => "Check your email",
        }
    }
}

impl fmt::Display for AuthView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
