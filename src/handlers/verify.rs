// Email verification page
use crate::models::{VerificationOutcome, VerificationRequest};
use crate::provider::IdentityProvider;
use crate::session::SessionCookieFactory;
use crate::settings::AuthGateSettings;
use crate::utils::{sanitize_next, ResponseBuilder};
use crate::verifier::{EmailVerifier, REDIRECT_DELAY};
use crate::views::pages::{verify_error_page, verify_success_page};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};

/// Render the verifier's terminal state.
///
/// Success sets the session cookies and refreshes to `next` after the
/// verifier's redirect delay; failure offers a link back to sign-in.
///
/// # Errors
///
/// Never fails; provider errors are rendered into the page
pub async fn verify_email(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let request = VerificationRequest::from_query(req.query_string());
    let verifier = EmailVerifier::new(provider.into_inner())
        .with_sign_in_path(&settings.routes.sign_in_path);

    let response = match verifier.verify(&request).await {
        VerificationOutcome::Verified(grant) => ResponseBuilder::html_with_cookies(
            StatusCode::OK,
            verify_success_page(&sanitize_next(request.next()), REDIRECT_DELAY.as_secs()),
            cookies.replace_session_cookies(&req, grant.cookies),
        ),
        VerificationOutcome::Rejected(message) => ResponseBuilder::html(
            StatusCode::OK,
            verify_error_page(&message, &settings.routes.sign_in_path),
        ),
    };
    Ok(response)
}
