//! Validation Module
//!
//! - [`forms`] - Auth action payloads (sign in, sign up, password reset)
//!
//! Redirect targets are validated separately in
//! [`crate::utils::redirect_validator`].

pub mod forms;

pub use forms::{
    FormError, ForgotPasswordForm, OAuthForm, ResetPasswordForm, SignInForm, SignUpForm,
};
