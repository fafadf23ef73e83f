#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use authgate::{
    configure_services, AuthGateSettings, GoTrueClient, IdentityProvider, SessionCookieFactory,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = AuthGateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let cookies = SessionCookieFactory::from_settings(&settings);
    let client = GoTrueClient::from_settings(&settings, cookies.clone()).map_err(|e| {
        std::io::Error::other(format!("Failed to initialize identity client: {e}"))
    })?;

    start_server(Arc::new(client), cookies, settings).await
}

/// Start the server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    provider: Arc<dyn IdentityProvider>,
    cookies: SessionCookieFactory,
    settings: AuthGateSettings,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings, &cookies);

    let provider = web::Data::from(provider);
    let cookies = web::Data::new(cookies);
    let cors_origins = settings.get_cors_origins();
    let settings = web::Data::new(settings);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(provider.clone())
            .app_data(cookies.clone())
            .app_data(settings.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(
    bind_address: &str,
    settings: &AuthGateSettings,
    cookies: &SessionCookieFactory,
) {
    println!(
        "Starting authgate {} on http://{bind_address}",
        authgate::VERSION
    );
    println!("Identity backend: {}", settings.identity.url);
    println!("Session cookie: {}", cookies.storage_key());
    println!();
    println!("Callback endpoints:");
    println!("  GET  /auth/callback        - Provider redirects and email links");
    println!("  GET  /auth/verify          - Email verification page");
    println!();
    println!("Auth actions (JSON):");
    println!("  POST /auth/sign_in         - Email and password sign-in");
    println!("  POST /auth/sign_up         - Create an account");
    println!("  POST /auth/sign_out        - Clear session");
    println!("  POST /auth/forgot_password - Send password reset email");
    println!("  POST /auth/reset_password  - Set a new password");
    println!("  POST /auth/oauth           - Begin Google or GitHub sign-in");
    println!();
    println!("Pages:");
    println!("  GET  /auth                 - Sign-in panels");
    println!("  GET  /auth/reset-password  - New password form");
    println!("  GET  /settings             - Profile of the signed-in user");
    println!();
    match &settings.application.site_url {
        Some(site_url) => println!("Email links and OAuth return to: {site_url}/auth/callback"),
        None => println!("Email links and OAuth return to: <request origin>/auth/callback"),
    }
    println!();
    println!("System endpoints:");
    println!("  GET  /health - Identity backend health");
    println!("  GET  /ping   - Liveness check");
}
