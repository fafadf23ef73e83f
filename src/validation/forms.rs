//! Payload validation for the auth actions
//!
//! Each form checks its fields in declaration order and reports the first
//! problem only, with the same wording the auth panels display.

use crate::provider::OAuthProvider;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_NAME_LENGTH: usize = 2;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(?:\.[^\s@.]+)+$").expect("static pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    InvalidEmail,
    PasswordTooShort,
    NameTooShort,
    TermsNotAccepted,
    PasswordMismatch,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidEmail => write!(f, "Invalid email address"),
            FormError::PasswordTooShort => write!(
                f,
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ),
            FormError::NameTooShort => {
                write!(f, "Name must be at least {MIN_NAME_LENGTH} characters")
            }
            FormError::TermsNotAccepted => write!(f, "You must agree to the terms"),
            FormError::PasswordMismatch => write!(f, "Passwords don't match"),
        }
    }
}

impl std::error::Error for FormError {}

fn check_email(email: &str) -> Result<(), FormError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(FormError::InvalidEmail)
    }
}

fn check_password(password: &str) -> Result<(), FormError> {
    if password.chars().count() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(FormError::PasswordTooShort)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignInForm {
    /// # Errors
    ///
    /// Returns the first invalid field
    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)?;
        check_password(&self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub terms: bool,
}

impl SignUpForm {
    /// # Errors
    ///
    /// Returns the first invalid field
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.chars().count() < MIN_NAME_LENGTH {
            return Err(FormError::NameTooShort);
        }
        check_email(&self.email)?;
        check_password(&self.password)?;
        if self.terms {
            Ok(())
        } else {
            Err(FormError::TermsNotAccepted)
        }
    }

    /// Name stored in the user metadata; the email's local part when blank
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

impl ForgotPasswordForm {
    /// # Errors
    ///
    /// Returns an error if the email is malformed
    pub fn validate(&self) -> Result<(), FormError> {
        check_email(&self.email)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "confirmPassword")]
    pub confirm_password: String,
}

impl ResetPasswordForm {
    /// # Errors
    ///
    /// Returns the first invalid field, then a mismatch
    pub fn validate(&self) -> Result<(), FormError> {
        check_password(&self.password)?;
        check_password(&self.confirm_password)?;
        if self.password == self.confirm_password {
            Ok(())
        } else {
            Err(FormError::PasswordMismatch)
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OAuthForm {
    pub provider: OAuthProvider,
}
