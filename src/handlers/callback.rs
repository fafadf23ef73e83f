// Callback handler: provider redirects and email links land here
use crate::callback::{CallbackResolver, CredentialPath, Resolution};
use crate::models::VerificationRequest;
use crate::provider::IdentityProvider;
use crate::session::SessionCookieFactory;
use crate::settings::AuthGateSettings;
use crate::utils::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse, Result};

/// Authentication callback handler
///
/// Always answers with a 302: to `next` with the session cookies, or to the
/// error view with a reason.
///
/// # Errors
///
/// Never fails; every input resolves to a redirect
pub async fn auth_callback(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
    cookies: web::Data<SessionCookieFactory>,
    settings: web::Data<AuthGateSettings>,
) -> Result<HttpResponse> {
    let request = VerificationRequest::from_query(req.query_string());
    let code_verifier = cookies.read_code_verifier(&req);

    let resolution = CallbackResolver::new(provider.into_inner())
        .resolve(&request, code_verifier.as_deref())
        .await;
    Ok(resolution_response(&req, resolution, &cookies, &settings))
}

/// Turn a resolver outcome into the redirect the browser follows
pub(crate) fn resolution_response(
    req: &HttpRequest,
    resolution: Resolution,
    cookies: &SessionCookieFactory,
    settings: &AuthGateSettings,
) -> HttpResponse {
    match resolution {
        Resolution::Authenticated {
            location,
            cookies: session_cookies,
            via,
        } => {
            let redirect = ResponseBuilder::redirect(&location)
                .with_cookies(cookies.replace_session_cookies(req, session_cookies));
            match via {
                CredentialPath::CodeExchange => redirect
                    .with_cookie(cookies.clear_code_verifier_cookie())
                    .build(),
                CredentialPath::TokenVerification => redirect.build(),
            }
        }
        Resolution::Failed { reason } => ResponseBuilder::redirect(&settings.routes.error_path)
            .with_error(reason.as_str())
            .build(),
    }
}
