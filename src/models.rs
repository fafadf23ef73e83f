use serde::{Deserialize, Serialize};

pub mod auth;

pub use auth::{AuthSession, AuthUser, SessionGrant, UserProfile, VerificationOutcome};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Identity backend health as reported by `/health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub status: HealthStatus,
    /// RFC 3339 timestamp of the check
    pub timestamp: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Verification parameters carried by a provider redirect or an email link.
///
/// Built fresh from the query string of every request and never stored.
/// Values that are present but empty count as absent, the same way an empty
/// query value is falsy to the link generator.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationRequest {
    pub code: Option<String>,
    pub token: Option<String>,
    pub token_hash: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub verification_type: Option<String>,
    pub next: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

impl VerificationRequest {
    pub const DEFAULT_NEXT: &'static str = "/";

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        non_empty(self.code.as_ref())
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_empty(self.token.as_ref())
    }

    #[must_use]
    pub fn token_hash(&self) -> Option<&str> {
        non_empty(self.token_hash.as_ref())
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_ref())
    }

    /// The raw `type` parameter, unvalidated
    #[must_use]
    pub fn verification_type(&self) -> Option<&str> {
        non_empty(self.verification_type.as_ref())
    }

    /// Redirect target after success, `/` when absent
    #[must_use]
    pub fn next(&self) -> &str {
        non_empty(self.next.as_ref()).unwrap_or(Self::DEFAULT_NEXT)
    }

    /// Whether a token-shaped credential (`token` or `token_hash`) is present
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some() || self.token_hash().is_some()
    }

    /// Lenient parse of a raw query string.
    ///
    /// Unlike `web::Query` this never fails: unknown keys are ignored and the
    /// first occurrence of a repeated key wins.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "code" => &mut request.code,
                "token" => &mut request.token,
                "token_hash" => &mut request.token_hash,
                "email" => &mut request.email,
                "type" => &mut request.verification_type,
                "next" => &mut request.next,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_absent() {
        let request = VerificationRequest {
            code: Some(String::new()),
            token: Some(String::new()),
            token_hash: Some("hash".to_string()),
            next: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(request.code(), None);
        assert_eq!(request.token(), None);
        assert_eq!(request.token_hash(), Some("hash"));
        assert_eq!(request.next(), "/");
        assert!(request.has_token());
    }

    #[test]
    fn test_query_deserialization() {
        let request: VerificationRequest = serde_json::from_value(serde_json::json!({
            "token_hash": "abc",
            "type": "recovery",
            "next": "/settings"
        }))
        .unwrap();
        assert_eq!(request.token_hash(), Some("abc"));
        assert_eq!(request.verification_type(), Some("recovery"));
        assert_eq!(request.next(), "/settings");
        assert_eq!(request.code(), None);
    }

    #[test]
    fn test_from_query_is_lenient() {
        let request = VerificationRequest::from_query(
            "code=first&code=second&next=%2Fsettings%3Ftab%3D1&type=&utm_source=mail",
        );
        assert_eq!(request.code(), Some("first"));
        assert_eq!(request.next(), "/settings?tab=1");
        assert_eq!(request.verification_type(), None);

        let request = VerificationRequest::from_query("%%%&=&token_hash");
        assert_eq!(request.token_hash(), None);
        assert!(!request.has_token());
        assert_eq!(VerificationRequest::from_query(""), VerificationRequest::default());
    }

    #[test]
    fn test_health_status_serialization() {
        let check = HealthCheck {
            status: HealthStatus::Unhealthy,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            message: "down".to_string(),
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "unhealthy");
    }
}
