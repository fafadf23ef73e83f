// Auth action handlers: JSON in, JSON out
use crate::provider::{IdentityProvider, SignUpRequest, UNEXPECTED_ERROR_MESSAGE};
use crate::session::SessionCookieFactory;
use crate::settings::AuthGateSettings;
use crate::utils::pkce::PkcePair;
use crate::utils::{site_link, LoggingHelper, ResponseBuilder};
use crate::validation::{
    ForgotPasswordForm, FormError, OAuthForm, ResetPasswordForm, SignInForm, SignUpForm,
};
use crate::views::{AuthView, AuthViewEvent};
use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{error, info, warn};

/// Landing page after a password sign-in
pub const HOME_PATH: &str = "/";

fn invalid(action: &str, err: FormError) -> HttpResponse {
    let message = err.to_string();
    LoggingHelper::log_validation_failed(action, &message);
    ResponseBuilder::bad_request(&message)
}

/// A fresh PKCE pair and the cookie that keeps its verifier for the callback
fn pkce_with_cookie(
    cookies: &SessionCookieFactory,
) -> std::result::Result<(PkcePair, Cookie<'static>), HttpResponse> {
    let pkce = PkcePair::generate();
    match cookies.create_code_verifier_cookie(&pkce.verifier) {
        Ok(cookie) => Ok((pkce, cookie)),
        Err(e) => {
            error!("Failed to encode code verifier cookie: {e}");
            Err(ResponseBuilder::internal_server_error(
                UNEXPECTED_ERROR_MESSAGE,
            ))
        }
    }
}

/// Password sign-in
///
/// # Errors
///
/// Never fails; validation and provider errors become JSON error bodies
pub async fn sign_in(
    req: HttpRequest,
    form: web::Json<SignInForm>,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
) -> Result<HttpResponse> {
    if let Err(e) = form.validate() {
        return Ok(invalid("Sign in", e));
    }

    match provider
        .sign_in_with_password(&form.email, &form.password)
        .await
    {
        Ok(grant) => {
            LoggingHelper::log_action_succeeded("Sign in");
            Ok(ResponseBuilder::success()
                .with_redirect(HOME_PATH)
                .with_cookies(cookies.replace_session_cookies(&req, grant.cookies))
                .build())
        }
        Err(e) => {
            LoggingHelper::log_action_failed("Sign in", &e);
            Ok(ResponseBuilder::provider_error(&e))
        }
    }
}

/// Register a new account.
///
/// The confirmation link lands on the callback route carrying a `code`,
/// which is exchanged with the verifier stored here.
///
/// # Errors
///
/// Never fails; validation and provider errors become JSON error bodies
pub async fn sign_up(
    req: HttpRequest,
    form: web::Json<SignUpForm>,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    if let Err(e) = form.validate() {
        return Ok(invalid("Sign up", e));
    }
    let (pkce, verifier_cookie) = match pkce_with_cookie(&cookies) {
        Ok(pair) => pair,
        Err(response) => return Ok(response),
    };

    let request = SignUpRequest {
        email: form.email.clone(),
        password: form.password.clone(),
        name: form.display_name(),
        redirect_to: site_link(&settings.application, &req, &settings.routes.callback_path),
        code_challenge: pkce.challenge,
    };

    match provider.sign_up(&request).await {
        Ok(()) => {
            LoggingHelper::log_action_succeeded("Sign up");
            Ok(ResponseBuilder::success()
                .with_cookies(vec![verifier_cookie])
                .build())
        }
        Err(e) => {
            LoggingHelper::log_action_failed("Sign up", &e);
            Ok(ResponseBuilder::provider_error(&e))
        }
    }
}

/// Revoke the session and clear its cookies.
///
/// A request without a session still gets the removal cookies and the
/// redirect, so a stale browser always ends up signed out.
///
/// # Errors
///
/// Never fails; provider errors become JSON error bodies
pub async fn sign_out(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let session = cookies.read_session(&req).unwrap_or_else(|e| {
        warn!("Discarding unreadable session cookie on sign out: {e}");
        None
    });

    if let Some(session) = session {
        if let Err(e) = provider.sign_out(&session.access_token).await {
            LoggingHelper::log_action_failed("Sign out", &e);
            return Ok(ResponseBuilder::provider_error(&e));
        }
    }

    LoggingHelper::log_action_succeeded("Sign out");
    Ok(ResponseBuilder::success()
        .with_redirect(&settings.routes.sign_in_path)
        .with_cookies(cookies.clear_session_cookies(&req))
        .build())
}

/// Send a password recovery email whose link returns a PKCE `code`
///
/// # Errors
///
/// Never fails; validation and provider errors become JSON error bodies
pub async fn forgot_password(
    req: HttpRequest,
    form: web::Json<ForgotPasswordForm>,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    if let Err(e) = form.validate() {
        return Ok(invalid("Forgot password", e));
    }
    let (pkce, verifier_cookie) = match pkce_with_cookie(&cookies) {
        Ok(pair) => pair,
        Err(response) => return Ok(response),
    };

    let redirect_to = site_link(
        &settings.application,
        &req,
        &settings.routes.reset_password_path,
    );
    match provider
        .reset_password_for_email(&form.email, &redirect_to, &pkce.challenge)
        .await
    {
        Ok(()) => {
            LoggingHelper::log_action_succeeded("Forgot password");
            let view = AuthView::ForgotPassword
                .transition(AuthViewEvent::ResetEmailSent)
                .unwrap_or_default();
            Ok(ResponseBuilder::success()
                .with_field("view", view.slug())
                .with_cookies(vec![verifier_cookie])
                .build())
        }
        Err(e) => {
            LoggingHelper::log_action_failed("Forgot password", &e);
            Ok(ResponseBuilder::provider_error(&e))
        }
    }
}

/// Set a new password for the signed-in (usually just recovered) user
///
/// # Errors
///
/// Never fails; validation and provider errors become JSON error bodies
pub async fn reset_password(
    req: HttpRequest,
    form: web::Json<ResetPasswordForm>,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    if let Err(e) = form.validate() {
        return Ok(invalid("Reset password", e));
    }

    let Ok(Some(session)) = cookies.read_session(&req) else {
        return Ok(ResponseBuilder::not_signed_in());
    };

    match provider
        .update_password(&session.access_token, &form.password)
        .await
    {
        Ok(_) => {
            LoggingHelper::log_action_succeeded("Reset password");
            Ok(ResponseBuilder::success()
                .with_redirect(&settings.routes.sign_in_path)
                .build())
        }
        Err(e) => {
            LoggingHelper::log_action_failed("Reset password", &e);
            Ok(ResponseBuilder::provider_error(&e))
        }
    }
}

/// Begin an OAuth sign-in.
///
/// Stores a fresh PKCE verifier in a cookie and returns the provider URL; the
/// callback route exchanges the resulting code using that verifier.
///
/// # Errors
///
/// Never fails; provider errors become JSON error bodies
pub async fn oauth_sign_in(
    req: HttpRequest,
    form: web::Json<OAuthForm>,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let (pkce, verifier_cookie) = match pkce_with_cookie(&cookies) {
        Ok(pair) => pair,
        Err(response) => return Ok(response),
    };

    let redirect_to = site_link(&settings.application, &req, &settings.routes.callback_path);
    match provider.authorize_url(form.provider, &redirect_to, &pkce.challenge) {
        Ok(url) => {
            info!("Starting {} OAuth sign-in", form.provider);
            Ok(ResponseBuilder::success()
                .with_field("url", url)
                .with_cookies(vec![verifier_cookie])
                .build())
        }
        Err(e) => {
            LoggingHelper::log_action_failed("OAuth sign in", &e);
            Ok(ResponseBuilder::provider_error(&e))
        }
    }
}
