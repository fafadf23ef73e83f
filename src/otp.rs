//! One-time-password verification types
//!
//! Email links carry one of four `type` literals. The identity backend speaks
//! a slightly larger vocabulary that also includes a generic `email` type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::VerificationRequest;

/// The four `type` values an email link may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    EmailChange,
    Recovery,
    Magiclink,
}

impl OtpType {
    pub const ALL: [Self; 4] = [
        Self::Signup,
        Self::EmailChange,
        Self::Recovery,
        Self::Magiclink,
    ];

    /// Parse a raw `type` literal; anything outside the closed set is `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "signup" => Some(Self::Signup),
            "email_change" => Some(Self::EmailChange),
            "recovery" => Some(Self::Recovery),
            "magiclink" => Some(Self::Magiclink),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::EmailChange => "email_change",
            Self::Recovery => "recovery",
            Self::Magiclink => "magiclink",
        }
    }
}

/// Verification type as understood by the identity backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOtpType {
    Signup,
    EmailChange,
    Recovery,
    Magiclink,
    /// Generic email OTP
    Email,
}

impl ProviderOtpType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::EmailChange => "email_change",
            Self::Recovery => "recovery",
            Self::Magiclink => "magiclink",
            Self::Email => "email",
        }
    }
}

impl From<OtpType> for ProviderOtpType {
    fn from(otp_type: OtpType) -> Self {
        match otp_type {
            OtpType::Signup => Self::Signup,
            OtpType::EmailChange => Self::EmailChange,
            OtpType::Recovery => Self::Recovery,
            OtpType::Magiclink => Self::Magiclink,
        }
    }
}

impl fmt::Display for ProviderOtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw link `type` onto the backend vocabulary.
///
/// Total over every input: the four known literals map 1:1 and anything
/// else, including an absent value, maps to the generic `email` type. Callers
/// only reach this after checking that a `type` was supplied, so the fallback
/// fires for unrecognised literals; the backend then judges the token against
/// the generic email flow and rejects it if it was minted for another purpose.
#[must_use]
pub fn provider_otp_type(raw: Option<&str>) -> ProviderOtpType {
    raw.and_then(OtpType::parse)
        .map_or(ProviderOtpType::Email, ProviderOtpType::from)
}

/// Body of a verify call: by token hash, or by plaintext token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VerifyOtpParams {
    TokenHash {
        token_hash: String,
        #[serde(rename = "type")]
        otp_type: ProviderOtpType,
    },
    Token {
        token: String,
        #[serde(rename = "type")]
        otp_type: ProviderOtpType,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
}

impl VerifyOtpParams {
    /// Build verify params from a request, preferring `token_hash` over `token`.
    ///
    /// Returns `None` unless a token-shaped credential and a `type` are both
    /// present. The email only accompanies a plaintext token.
    #[must_use]
    pub fn from_request(request: &VerificationRequest) -> Option<Self> {
        let raw_type = request.verification_type()?;
        let otp_type = provider_otp_type(Some(raw_type));

        if let Some(token_hash) = request.token_hash() {
            return Some(Self::TokenHash {
                token_hash: token_hash.to_string(),
                otp_type,
            });
        }

        request.token().map(|token| Self::Token {
            token: token.to_string(),
            otp_type,
            email: request.email().map(ToString::to_string),
        })
    }

    #[must_use]
    pub fn otp_type(&self) -> ProviderOtpType {
        match self {
            Self::TokenHash { otp_type, .. } | Self::Token { otp_type, .. } => *otp_type,
        }
    }

    #[must_use]
    pub fn uses_hash(&self) -> bool {
        matches!(self, Self::TokenHash { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(token: Option<&str>, hash: Option<&str>, kind: Option<&str>) -> VerificationRequest {
        VerificationRequest {
            token: token.map(ToString::to_string),
            token_hash: hash.map(ToString::to_string),
            verification_type: kind.map(ToString::to_string),
            email: Some("user@example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_known_types_map_one_to_one() {
        for otp_type in OtpType::ALL {
            let mapped = provider_otp_type(Some(otp_type.as_str()));
            assert_eq!(mapped.as_str(), otp_type.as_str());
        }
    }

    #[test]
    fn test_unknown_or_missing_type_falls_back_to_email() {
        assert_eq!(provider_otp_type(Some("invite")), ProviderOtpType::Email);
        assert_eq!(provider_otp_type(Some("SIGNUP")), ProviderOtpType::Email);
        assert_eq!(provider_otp_type(None), ProviderOtpType::Email);
    }

    #[test]
    fn test_hash_preferred_over_token() {
        let params =
            VerifyOtpParams::from_request(&request(Some("123456"), Some("h4sh"), Some("signup")))
                .unwrap();
        assert_eq!(
            params,
            VerifyOtpParams::TokenHash {
                token_hash: "h4sh".to_string(),
                otp_type: ProviderOtpType::Signup,
            }
        );
    }

    #[test]
    fn test_plain_token_carries_email() {
        let params =
            VerifyOtpParams::from_request(&request(Some("123456"), None, Some("magiclink")))
                .unwrap();
        let body = serde_json::to_value(&params).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "token": "123456",
                "type": "magiclink",
                "email": "user@example.com"
            })
        );
    }

    #[test]
    fn test_hash_body_has_no_token_or_email() {
        let params =
            VerifyOtpParams::from_request(&request(None, Some("h4sh"), Some("recovery"))).unwrap();
        let body = serde_json::to_value(&params).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "token_hash": "h4sh", "type": "recovery" })
        );
    }

    #[test]
    fn test_requires_type_and_token() {
        assert!(VerifyOtpParams::from_request(&request(Some("1"), None, None)).is_none());
        assert!(VerifyOtpParams::from_request(&request(None, None, Some("signup"))).is_none());
    }
}
