//! HTTP response handling
//!
//! Every handler builds its responses through [`ResponseBuilder`] so error
//! bodies, redirects and cookie propagation look the same across the service.
//! JSON errors are `{"error": "<message>"}`; JSON successes are
//! `{"success": true, ...}`.

use crate::provider::ProviderError;
use actix_web::{cookie::Cookie, http::header, http::StatusCode, HttpResponse};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

/// Pre-serialized body for the most common error
static NOT_SIGNED_IN_BODY: Lazy<String> =
    Lazy::new(|| json!({ "error": NOT_SIGNED_IN }).to_string());

pub const NOT_SIGNED_IN: &str = "Not signed in";

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// `{"error": message}` with the given status
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> HttpResponse {
        HttpResponse::build(status).json(json!({ "error": message }))
    }

    /// Validation failure (400)
    #[must_use]
    pub fn bad_request(message: &str) -> HttpResponse {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn unauthorized(message: &str) -> HttpResponse {
        Self::error(StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn internal_server_error(message: &str) -> HttpResponse {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 401 for a request that needs a session and has none
    #[must_use]
    pub fn not_signed_in() -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(NOT_SIGNED_IN_BODY.clone())
    }

    /// Map an identity backend failure onto a JSON error response.
    ///
    /// Rejections are the user's problem (401); everything else means the
    /// backend could not be used (502, or 500 when misconfigured).
    #[must_use]
    pub fn provider_error(err: &ProviderError) -> HttpResponse {
        let status = match err {
            ProviderError::Rejected { .. } => StatusCode::UNAUTHORIZED,
            ProviderError::Transport(_) | ProviderError::Decode(_) => StatusCode::BAD_GATEWAY,
            ProviderError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::error(status, &err.message_or_default())
    }

    /// 200 `{"success": true}` plus optional fields and cookies
    #[must_use]
    pub fn success() -> SuccessBuilder {
        SuccessBuilder::new()
    }

    /// 302 Found
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    /// Minimal HTML page
    #[must_use]
    pub fn html(status: StatusCode, markup: String) -> HttpResponse {
        Self::html_with_cookies(status, markup, Vec::new())
    }

    #[must_use]
    pub fn html_with_cookies(
        status: StatusCode,
        markup: String,
        cookies: Vec<Cookie<'static>>,
    ) -> HttpResponse {
        let mut builder = HttpResponse::build(status);
        for cookie in cookies {
            builder.cookie(cookie);
        }
        builder
            .content_type("text/html; charset=utf-8")
            .body(markup)
    }
}

/// Builder for `{"success": true, ...}` bodies
pub struct SuccessBuilder {
    fields: Map<String, Value>,
    cookies: Vec<Cookie<'static>>,
}

impl SuccessBuilder {
    fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("success".to_string(), Value::Bool(true));
        Self {
            fields,
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Path the client should navigate to next
    #[must_use]
    pub fn with_redirect(self, location: &str) -> Self {
        self.with_field("redirect", location)
    }

    #[must_use]
    pub fn with_cookies(mut self, mut cookies: Vec<Cookie<'static>>) -> Self {
        self.cookies.append(&mut cookies);
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::Ok();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.json(Value::Object(self.fields))
    }
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
    cookies: Vec<Cookie<'static>>,
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, mut cookies: Vec<Cookie<'static>>) -> Self {
        self.cookies.append(&mut cookies);
        self
    }

    /// Append a URL-encoded `error` query parameter
    #[must_use]
    pub fn with_error(self, message: &str) -> Self {
        self.with_query("error", message)
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        let separator = if self.location.contains('?') { '&' } else { '?' };
        self.location = format!(
            "{}{separator}{key}={}",
            self.location,
            urlencoding::encode(value)
        );
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder
            .insert_header((header::LOCATION, self.location))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &HttpResponse) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[actix_web::test]
    async fn test_error_body() {
        let response = ResponseBuilder::bad_request("Invalid email address");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid email address" })
        );
    }

    #[actix_web::test]
    async fn test_not_signed_in() {
        let response = ResponseBuilder::not_signed_in();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({ "error": NOT_SIGNED_IN }));
    }

    #[actix_web::test]
    async fn test_provider_error_statuses() {
        let rejected = ProviderError::Rejected {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        let response = ResponseBuilder::provider_error(&rejected);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid login credentials" })
        );

        let transport = ProviderError::Transport("refused".to_string());
        assert_eq!(
            ResponseBuilder::provider_error(&transport).status(),
            StatusCode::BAD_GATEWAY
        );

        let config = ProviderError::Configuration("no key".to_string());
        assert_eq!(
            ResponseBuilder::provider_error(&config).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_success_body_and_cookies() {
        let response = ResponseBuilder::success()
            .with_redirect("/")
            .with_cookies(vec![Cookie::new("session", "value")])
            .build();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.cookies().count(), 1);
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "redirect": "/" })
        );
    }

    #[test]
    fn test_redirect_with_encoded_error() {
        let response = ResponseBuilder::redirect("/auth")
            .with_error("Could not verify token")
            .build();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/auth?error=Could%20not%20verify%20token");
    }

    #[test]
    fn test_redirect_appends_to_existing_query() {
        let response = ResponseBuilder::redirect("/auth?view=sign-in")
            .with_error("a&b")
            .build();
        assert_eq!(location(&response), "/auth?view=sign-in&error=a%26b");
    }

    #[test]
    fn test_redirect_carries_cookies() {
        let response = ResponseBuilder::redirect("/")
            .with_cookie(Cookie::new("a", "1"))
            .with_cookies(vec![Cookie::new("b", "2")])
            .build();
        assert_eq!(response.cookies().count(), 2);
    }
}
