//! HTTP client for the GoTrue REST API

use super::{IdentityProvider, OAuthProvider, ProviderError, SignUpRequest};
use crate::models::{AuthSession, AuthUser, SessionGrant};
use crate::otp::VerifyOtpParams;
use crate::session::SessionCookieFactory;
use crate::settings::AuthGateSettings;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const API_PREFIX: &str = "auth/v1/";

const CODE_CHALLENGE_METHOD: &str = "s256";

/// Keys GoTrue uses for error text, most specific first
const ERROR_MESSAGE_KEYS: [&str; 4] = ["msg", "error_description", "message", "error"];

#[derive(Serialize)]
struct PkceExchange<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

/// `IdentityProvider` backed by a GoTrue server
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    cookies: SessionCookieFactory,
}

impl GoTrueClient {
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be constructed
    pub fn new(
        base_url: &str,
        anon_key: impl Into<String>,
        cookies: SessionCookieFactory,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            ProviderError::Configuration(format!("Invalid identity URL '{base_url}': {e}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.into(),
            cookies,
        })
    }

    /// # Errors
    ///
    /// Returns an error if no anon key is configured or the identity URL is invalid
    pub fn from_settings(
        settings: &AuthGateSettings,
        cookies: SessionCookieFactory,
    ) -> Result<Self, ProviderError> {
        let anon_key = settings
            .identity
            .get_anon_key()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration("IDENTITY_ANON_KEY is not set".to_string())
            })?;
        Self::new(
            &settings.identity.url,
            anon_key,
            cookies,
            Duration::from_secs(settings.identity.request_timeout_seconds),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(&format!("{API_PREFIX}{path}"))
            .map_err(|e| ProviderError::Configuration(format!("Invalid endpoint '{path}': {e}")))
    }

    fn endpoint_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request.header("apikey", &self.anon_key).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::rejection(response).await)
        }
    }

    async fn rejection(response: Response) -> ProviderError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = error_message(&body).unwrap_or_default();
        log::debug!("Identity backend rejected request with {status}");
        ProviderError::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    /// Turn a token-endpoint body into a grant, writing the session cookies
    fn grant_from_body(&self, body: Value) -> Result<SessionGrant, ProviderError> {
        if body.get("access_token").is_none() {
            return Ok(SessionGrant::without_session());
        }
        let session: AuthSession =
            serde_json::from_value(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        let session = session.with_expiry_from(chrono::Utc::now());
        let cookies = self
            .cookies
            .create_session_cookies(&session)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(SessionGrant::new(session, cookies))
    }

    async fn session_request(
        &self,
        request: RequestBuilder,
    ) -> Result<SessionGrant, ProviderError> {
        let body: Value = self.send(request).await?.json().await?;
        self.grant_from_body(body)
    }
}

/// First non-empty error message in a GoTrue error body
fn error_message(body: &Value) -> Option<String> {
    ERROR_MESSAGE_KEYS
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|message| !message.trim().is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<SessionGrant, ProviderError> {
        let url = self.endpoint_with_query("token", &[("grant_type", "pkce")])?;
        let body = PkceExchange {
            auth_code: code,
            code_verifier,
        };
        log::debug!(
            "Exchanging authorization code (verifier present: {})",
            code_verifier.is_some()
        );
        self.session_request(self.http.post(url).json(&body)).await
    }

    async fn verify_otp(&self, params: &VerifyOtpParams) -> Result<SessionGrant, ProviderError> {
        let url = self.endpoint("verify")?;
        log::debug!(
            "Verifying OTP of type '{}' (hash: {})",
            params.otp_type(),
            params.uses_hash()
        );
        self.session_request(self.http.post(url).json(params)).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionGrant, ProviderError> {
        let url = self.endpoint_with_query("token", &[("grant_type", "password")])?;
        let body = json!({ "email": email, "password": password });
        self.session_request(self.http.post(url).json(&body)).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError> {
        let url = self.endpoint_with_query("signup", &[("redirect_to", request.redirect_to.as_str())])?;
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": { "name": request.name },
            "code_challenge": request.code_challenge,
            "code_challenge_method": CODE_CHALLENGE_METHOD,
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let url = self.endpoint("logout")?;
        match self.send(self.http.post(url).bearer_auth(access_token)).await {
            Ok(_) => Ok(()),
            // The session is already gone on the backend
            Err(ProviderError::Rejected {
                status: 401 | 403 | 404,
                ..
            }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), ProviderError> {
        let url = self.endpoint_with_query("recover", &[("redirect_to", redirect_to)])?;
        let body = json!({
            "email": email,
            "code_challenge": code_challenge,
            "code_challenge_method": CODE_CHALLENGE_METHOD,
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let url = self.endpoint("user")?;
        let request = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .json(&json!({ "password": password }));
        Ok(self.send(request).await?.json().await?)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        let url = self.endpoint("user")?;
        Ok(self
            .send(self.http.get(url).bearer_auth(access_token))
            .await?
            .json()
            .await?)
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, ProviderError> {
        let url = self.endpoint_with_query(
            "authorize",
            &[
                ("provider", provider.as_str()),
                ("redirect_to", redirect_to),
                ("code_challenge", code_challenge),
                ("code_challenge_method", CODE_CHALLENGE_METHOD),
            ],
        )?;
        Ok(url.into())
    }

    async fn health(&self) -> Result<(), ProviderError> {
        let url = self.endpoint("health")?;
        self.send(self.http.get(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::ProviderOtpType;
    use crate::session::CookieOptions;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    fn cookie_factory() -> SessionCookieFactory {
        SessionCookieFactory::new("sb-test-auth-token", CookieOptions::default())
    }

    fn session_body() -> Value {
        json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "user@example.com" }
        })
    }

    async fn fake_token(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
        if req.headers().get("apikey").and_then(|v| v.to_str().ok()) != Some("anon") {
            return HttpResponse::Unauthorized().json(json!({ "message": "No API key found" }));
        }
        match req.query_string() {
            "grant_type=pkce" if body["auth_code"] == "good" => {
                HttpResponse::Ok().json(session_body())
            }
            "grant_type=pkce" => HttpResponse::BadRequest().json(json!({
                "error": "invalid_grant",
                "error_description": "invalid flow state, no valid flow state found"
            })),
            _ => HttpResponse::BadRequest().json(json!({ "msg": "unsupported grant" })),
        }
    }

    async fn fake_verify(body: web::Json<Value>) -> HttpResponse {
        if body["token_hash"] == "hash" && body["type"] == "recovery" && body.get("token").is_none()
        {
            HttpResponse::Ok().json(session_body())
        } else if body["type"] == "email_change" {
            HttpResponse::Ok().json(json!({ "msg": "Confirmation link accepted" }))
        } else {
            HttpResponse::Forbidden().json(json!({ "msg": "Token has expired or is invalid" }))
        }
    }

    // Signup and recover only issue PKCE links when a challenge comes along
    async fn fake_email_link(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
        let has_redirect = req.query_string().starts_with("redirect_to=");
        if has_redirect
            && body["code_challenge"] == "challenge"
            && body["code_challenge_method"] == "s256"
        {
            HttpResponse::Ok().json(json!({}))
        } else {
            HttpResponse::BadRequest().json(json!({ "msg": "missing code challenge" }))
        }
    }

    async fn fake_health() -> HttpResponse {
        HttpResponse::Ok().json(json!({ "name": "GoTrue" }))
    }

    async fn fake_logout() -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({ "msg": "session not found" }))
    }

    async fn start_fake_backend() -> String {
        let server = HttpServer::new(|| {
            App::new()
                .route("/auth/v1/token", web::post().to(fake_token))
                .route("/auth/v1/verify", web::post().to(fake_verify))
                .route("/auth/v1/logout", web::post().to(fake_logout))
                .route("/auth/v1/signup", web::post().to(fake_email_link))
                .route("/auth/v1/recover", web::post().to(fake_email_link))
                .route("/auth/v1/health", web::get().to(fake_health))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> GoTrueClient {
        GoTrueClient::new(base_url, "anon", cookie_factory(), Duration::from_secs(5)).unwrap()
    }

    #[actix_web::test]
    async fn test_code_exchange_sets_cookies() {
        let base = start_fake_backend().await;
        let grant = client(&base)
            .exchange_code_for_session("good", Some("verifier"))
            .await
            .unwrap();
        let session = grant.session.unwrap();
        assert_eq!(session.access_token, "access");
        assert!(session.expires_at.is_some());
        assert!(grant
            .cookies
            .iter()
            .any(|c| c.name() == "sb-test-auth-token" && !c.value().is_empty()));
    }

    #[actix_web::test]
    async fn test_code_exchange_failure_message() {
        let base = start_fake_backend().await;
        let err = client(&base)
            .exchange_code_for_session("used", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Rejected {
                status: 400,
                message: "invalid flow state, no valid flow state found".to_string(),
            }
        );
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_rejected() {
        let base = start_fake_backend().await;
        let client =
            GoTrueClient::new(&base, "wrong", cookie_factory(), Duration::from_secs(5)).unwrap();
        let err = client
            .exchange_code_for_session("good", None)
            .await
            .unwrap_err();
        assert_eq!(err.message().as_deref(), Some("No API key found"));
    }

    #[actix_web::test]
    async fn test_verify_by_hash() {
        let base = start_fake_backend().await;
        let params = VerifyOtpParams::TokenHash {
            token_hash: "hash".to_string(),
            otp_type: ProviderOtpType::Recovery,
        };
        let grant = client(&base).verify_otp(&params).await.unwrap();
        assert!(grant.session.is_some());
    }

    #[actix_web::test]
    async fn test_verify_without_session_is_accepted() {
        let base = start_fake_backend().await;
        let params = VerifyOtpParams::TokenHash {
            token_hash: "first-half".to_string(),
            otp_type: ProviderOtpType::EmailChange,
        };
        let grant = client(&base).verify_otp(&params).await.unwrap();
        assert!(grant.session.is_none());
        assert!(grant.cookies.is_empty());
    }

    #[actix_web::test]
    async fn test_verify_rejection() {
        let base = start_fake_backend().await;
        let params = VerifyOtpParams::Token {
            token: "000000".to_string(),
            otp_type: ProviderOtpType::Magiclink,
            email: None,
        };
        let err = client(&base).verify_otp(&params).await.unwrap_err();
        assert_eq!(err.message().as_deref(), Some("Token has expired or is invalid"));
    }

    #[actix_web::test]
    async fn test_sign_out_of_unknown_session_succeeds() {
        let base = start_fake_backend().await;
        assert!(client(&base).sign_out("stale").await.is_ok());
    }

    #[actix_web::test]
    async fn test_sign_up_sends_code_challenge() {
        let base = start_fake_backend().await;
        let request = SignUpRequest {
            email: "new@example.com".to_string(),
            password: "correct-horse".to_string(),
            name: "New".to_string(),
            redirect_to: "https://app.example.com/auth/callback".to_string(),
            code_challenge: "challenge".to_string(),
        };
        assert!(client(&base).sign_up(&request).await.is_ok());
    }

    #[actix_web::test]
    async fn test_recovery_sends_code_challenge() {
        let base = start_fake_backend().await;
        let client = client(&base);
        assert!(client
            .reset_password_for_email(
                "user@example.com",
                "https://app.example.com/auth/reset-password",
                "challenge",
            )
            .await
            .is_ok());

        let err = client
            .reset_password_for_email(
                "user@example.com",
                "https://app.example.com/auth/reset-password",
                "other",
            )
            .await
            .unwrap_err();
        assert_eq!(err.message().as_deref(), Some("missing code challenge"));
    }

    #[actix_web::test]
    async fn test_health() {
        let base = start_fake_backend().await;
        assert!(client(&base).health().await.is_ok());
    }

    #[actix_web::test]
    async fn test_unreachable_backend_is_transport_error() {
        let err = client("http://127.0.0.1:9").health().await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[test]
    fn test_authorize_url() {
        let url = client("https://abcd.supabase.co")
            .authorize_url(
                OAuthProvider::Github,
                "https://app.example.com/auth/callback",
                "challenge",
            )
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("provider".to_string(), "github".to_string()),
                (
                    "redirect_to".to_string(),
                    "https://app.example.com/auth/callback".to_string()
                ),
                ("code_challenge".to_string(), "challenge".to_string()),
                ("code_challenge_method".to_string(), "s256".to_string()),
            ]
        );
    }

    #[test]
    fn test_base_path_is_preserved() {
        let client = client("http://gateway.local/identity");
        assert_eq!(
            client.endpoint("health").unwrap().as_str(),
            "http://gateway.local/identity/auth/v1/health"
        );
    }

    #[test]
    fn test_error_message_priority() {
        assert_eq!(
            error_message(&json!({ "error": "e", "message": "m", "msg": "" })).as_deref(),
            Some("m")
        );
        assert_eq!(error_message(&json!({})), None);
        assert_eq!(error_message(&Value::Null), None);
    }

    #[test]
    fn test_from_settings_requires_anon_key() {
        let settings = AuthGateSettings::default();
        let err = GoTrueClient::from_settings(&settings, cookie_factory()).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
