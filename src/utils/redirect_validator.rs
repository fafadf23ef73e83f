//! Post-authentication redirect validation
//!
//! `next` arrives straight from a query string, so it is untrusted. Only
//! same-origin relative paths survive; anything else collapses to `/`.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Where a rejected or missing `next` sends the user
pub const DEFAULT_REDIRECT: &str = "/";

const MAX_REDIRECT_LENGTH: usize = 2048;

static PATH_TRAVERSAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.\.").expect("static pattern compiles")
});

// A leading scheme or a leading protocol-relative `//`
static PROTOCOL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*:|/{2,})")
        .expect("static pattern compiles")
});

// Control characters, backslashes and invisible Unicode separators
static SUSPICIOUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x1F\x7F-\x9F]|\\|[\u{200E}\u{200F}\u{2060}-\u{2064}\u{2000}-\u{200A}]")
        .expect("static pattern compiles")
});

/// Why a redirect target was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    NotRelative,
    TooLong(usize),
    PathTraversal,
    ProtocolInjection,
    SuspiciousCharacters,
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectError::NotRelative => write!(f, "redirect must be a relative path"),
            RedirectError::TooLong(len) => write!(f, "redirect is too long ({len} characters)"),
            RedirectError::PathTraversal => write!(f, "redirect contains path traversal"),
            RedirectError::ProtocolInjection => write!(f, "redirect contains a scheme or host"),
            RedirectError::SuspiciousCharacters => {
                write!(f, "redirect contains control or invisible characters")
            }
        }
    }
}

impl std::error::Error for RedirectError {}

/// Validate a post-authentication redirect target
///
/// # Errors
///
/// Returns an error if the target is not a plain relative path on this origin
pub fn validate_relative_redirect(target: &str) -> Result<String, RedirectError> {
    if target.len() > MAX_REDIRECT_LENGTH {
        return Err(RedirectError::TooLong(target.len()));
    }
    if !target.starts_with('/') {
        return Err(RedirectError::NotRelative);
    }

    for variant in decoded_variants(target) {
        if PATH_TRAVERSAL_PATTERN.is_match(&variant) {
            return Err(RedirectError::PathTraversal);
        }
        if PROTOCOL_PATTERN.is_match(&variant) {
            return Err(RedirectError::ProtocolInjection);
        }
        if SUSPICIOUS_PATTERN.is_match(&variant) {
            return Err(RedirectError::SuspiciousCharacters);
        }
    }

    Ok(target.to_string())
}

/// The validated target, or [`DEFAULT_REDIRECT`] when it is refused
#[must_use]
pub fn sanitize_next(target: &str) -> String {
    match validate_relative_redirect(target) {
        Ok(path) => {
            debug!("Accepted redirect target: {path}");
            path
        }
        Err(e) => {
            warn!("Refusing redirect target ({e}), using {DEFAULT_REDIRECT}");
            DEFAULT_REDIRECT.to_string()
        }
    }
}

/// The raw value plus its single and double URL-decoded forms
fn decoded_variants(target: &str) -> Vec<String> {
    let mut variants = vec![target.to_string()];
    if let Ok(decoded) = urlencoding::decode(target) {
        let decoded = decoded.into_owned();
        if decoded != target {
            if let Ok(double) = urlencoding::decode(&decoded) {
                let double = double.into_owned();
                if double != decoded {
                    variants.push(double);
                }
            }
            variants.push(decoded);
        }
    }
    variants
}
