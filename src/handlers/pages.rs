// Browser pages: the auth panels, password reset and the settings profile
use crate::callback::CallbackResolver;
use crate::models::{UserProfile, VerificationRequest};
use crate::provider::IdentityProvider;
use crate::session::SessionCookieFactory;
use crate::settings::AuthGateSettings;
use crate::utils::ResponseBuilder;
use crate::views::pages::{auth_page, reset_password_page};
use crate::views::AuthView;
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};
use log::{debug, warn};
use serde::Deserialize;

use super::callback::resolution_response;

#[derive(Deserialize)]
pub struct AuthPageQuery {
    pub view: Option<String>,
    pub error: Option<String>,
}

/// Auth panel page; unknown `view` values fall back to sign-in
///
/// # Errors
///
/// Never fails
pub async fn auth_panel(
    query: web::Query<AuthPageQuery>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let view = query
        .view
        .as_deref()
        .and_then(AuthView::from_slug)
        .unwrap_or_default();
    Ok(ResponseBuilder::html(
        StatusCode::OK,
        auth_page(&settings.routes.sign_in_path, view, query.error.as_deref()),
    ))
}

/// Landing page of a password recovery link.
///
/// A link still carrying credentials is resolved first and redirected back
/// here without them, so the form is only ever shown to a signed-in user.
///
/// # Errors
///
/// Never fails
pub async fn reset_password_form(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let mut request = VerificationRequest::from_query(req.query_string());
    if request.code().is_some() || request.has_token() {
        request.next = Some(settings.routes.reset_password_path.clone());
        let resolution = CallbackResolver::new(provider.into_inner())
            .resolve(&request, cookies.read_code_verifier(&req).as_deref())
            .await;
        return Ok(resolution_response(&req, resolution, &cookies, &settings));
    }

    match cookies.read_session(&req) {
        Ok(Some(_)) => Ok(ResponseBuilder::html(
            StatusCode::OK,
            reset_password_page(None),
        )),
        Ok(None) => Ok(ResponseBuilder::redirect(&settings.routes.sign_in_path).build()),
        Err(e) => {
            warn!("Unreadable session cookie on password reset page: {e}");
            Ok(ResponseBuilder::redirect(&settings.routes.sign_in_path)
                .with_cookies(cookies.clear_session_cookies(&req))
                .build())
        }
    }
}

/// Signed-in user's profile, or a redirect to sign-in
///
/// # Errors
///
/// Never fails; backend outages become JSON error bodies
pub async fn user_settings(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let sign_in = || ResponseBuilder::redirect(&settings.routes.sign_in_path).build();

    let session = match cookies.read_session(&req) {
        Ok(Some(session)) => session,
        Ok(None) => return Ok(sign_in()),
        Err(e) => {
            warn!("Unreadable session cookie on settings page: {e}");
            return Ok(sign_in());
        }
    };

    match provider.get_user(&session.access_token).await {
        Ok(user) => Ok(HttpResponse::Ok().json(UserProfile::from(user))),
        Err(e) if e.is_rejection() => {
            debug!("Session no longer valid: {e}");
            Ok(sign_in())
        }
        Err(e) => Ok(ResponseBuilder::provider_error(&e)),
    }
}
