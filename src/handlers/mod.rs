// HTTP request handlers for the authentication gateway
pub mod actions;
pub mod callback;
pub mod health;
pub mod pages;
pub mod verify;


use crate::utils::ResponseBuilder;
use actix_web::{error::InternalError, web};

// Re-export the main handler functions
pub use actions::{forgot_password, oauth_sign_in, reset_password, sign_in, sign_out, sign_up};
pub use callback::auth_callback;
pub use health::{health, ping};
pub use pages::{auth_panel, reset_password_form, user_settings};
pub use verify::verify_email;

/// Register every route.
///
/// Expects `web::Data<dyn IdentityProvider>`, `web::Data<SessionCookieFactory>`
/// and `web::Data<AuthGateSettings>` in the app data.
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = ResponseBuilder::bad_request(&err.to_string());
        InternalError::from_response(err, response).into()
    }))
    // Callback and verification
    .route("/auth/callback", web::get().to(auth_callback))
    .route("/auth/verify", web::get().to(verify_email))
    // Pages
    .route("/auth", web::get().to(auth_panel))
    .route("/auth/reset-password", web::get().to(reset_password_form))
    .route("/settings", web::get().to(user_settings))
    // Actions
    .route("/auth/sign_in", web::post().to(sign_in))
    .route("/auth/sign_up", web::post().to(sign_up))
    .route("/auth/sign_out", web::post().to(sign_out))
    .route("/auth/forgot_password", web::post().to(forgot_password))
    .route("/auth/reset_password", web::post().to(reset_password))
    .route("/auth/oauth", web::post().to(oauth_sign_in))
    // System
    .route("/health", web::get().to(health))
    .route("/ping", web::get().to(ping));
}
