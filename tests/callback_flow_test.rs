// End-to-end tests for GET /auth/callback against the scripted provider
use actix_web::{test, web, App};
use authgate::otp::{ProviderOtpType, VerifyOtpParams};
use authgate::testing::constants::TEST_STORAGE_KEY;
use authgate::testing::{
    assert_no_live_cookies, assert_redirect_to, assert_sets_cookie, removed_cookie_names,
    MockIdentityProvider, ProviderCall, TestFixtures,
};
use authgate::{configure_services, IdentityProvider, SessionCookieFactory};
use std::sync::Arc;

macro_rules! app {
    ($mock:expr) => {{
        let provider: Arc<dyn IdentityProvider> = $mock.clone();
        let settings = TestFixtures::settings();
        test::init_service(
            App::new()
                .app_data(web::Data::from(provider))
                .app_data(web::Data::new(SessionCookieFactory::from_settings(&settings)))
                .app_data(web::Data::new(settings))
                .configure(configure_services),
        )
        .await
    }};
}

fn callback(query: &str) -> test::TestRequest {
    test::TestRequest::get().uri(&format!("/auth/callback?{query}"))
}

#[actix_web::test]
async fn test_code_exchange_redirects_to_next_with_session() {
    let mock = Arc::new(MockIdentityProvider::new().with_code("good-code"));
    let app = app!(mock);

    let response = test::call_service(
        &app,
        callback("code=good-code&next=/settings").to_request(),
    )
    .await;

    assert_redirect_to(&response, "/settings");
    assert_sets_cookie(&response, TEST_STORAGE_KEY);
    assert!(removed_cookie_names(&response)
        .contains(&format!("{TEST_STORAGE_KEY}-code-verifier")));
    assert!(mock.verify_calls().is_empty());
}

#[actix_web::test]
async fn test_code_exchange_short_circuits_token_path() {
    let mock = Arc::new(
        MockIdentityProvider::new()
            .with_code("good-code")
            .with_token_hash("hash"),
    );
    let app = app!(mock);

    let response = test::call_service(
        &app,
        callback("code=good-code&token_hash=hash&type=signup").to_request(),
    )
    .await;

    assert_redirect_to(&response, "/");
    assert_eq!(mock.exchange_calls().len(), 1);
    assert!(mock.verify_calls().is_empty());
}

#[actix_web::test]
async fn test_failed_exchange_reports_code_reason() {
    let mock = Arc::new(MockIdentityProvider::new());
    let app = app!(mock);

    let response = test::call_service(&app, callback("code=bad-code").to_request()).await;

    assert_redirect_to(
        &response,
        "/auth?error=Could%20not%20exchange%20code%20for%20session",
    );
    assert_no_live_cookies(&response);
    assert!(mock.verify_calls().is_empty());
}

#[actix_web::test]
async fn test_failed_exchange_falls_through_to_token() {
    let mock = Arc::new(MockIdentityProvider::new().with_token_hash("hash"));
    let app = app!(mock);

    let response = test::call_service(
        &app,
        callback("code=stale&token_hash=hash&type=magiclink&next=/welcome").to_request(),
    )
    .await;

    assert_redirect_to(&response, "/welcome");
    assert_sets_cookie(&response, TEST_STORAGE_KEY);
    assert!(!removed_cookie_names(&response)
        .contains(&format!("{TEST_STORAGE_KEY}-code-verifier")));
}

#[actix_web::test]
async fn test_token_hash_is_preferred() {
    let mock = Arc::new(MockIdentityProvider::new().with_token_hash("hash"));
    let app = app!(mock);

    test::call_service(
        &app,
        callback("token_hash=hash&token=123456&type=recovery&email=a%40b.co").to_request(),
    )
    .await;

    assert_eq!(
        mock.verify_calls(),
        vec![VerifyOtpParams::TokenHash {
            token_hash: "hash".to_string(),
            otp_type: ProviderOtpType::Recovery,
        }]
    );
}

#[actix_web::test]
async fn test_plain_token_carries_email() {
    let mock = Arc::new(MockIdentityProvider::new().with_token("123456"));
    let app = app!(mock);

    let response = test::call_service(
        &app,
        callback("token=123456&type=magiclink&email=user%40example.com").to_request(),
    )
    .await;

    assert_redirect_to(&response, "/");
    assert_eq!(
        mock.verify_calls(),
        vec![VerifyOtpParams::Token {
            token: "123456".to_string(),
            otp_type: ProviderOtpType::Magiclink,
            email: Some("user@example.com".to_string()),
        }]
    );
}

#[actix_web::test]
async fn test_unknown_type_uses_generic_email() {
    let mock = Arc::new(MockIdentityProvider::new());
    let app = app!(mock);

    let response = test::call_service(
        &app,
        callback("token_hash=hash&type=invite").to_request(),
    )
    .await;

    assert_redirect_to(&response, "/auth?error=Could%20not%20verify%20token");
    let calls = mock.verify_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].otp_type(), ProviderOtpType::Email);
}

#[actix_web::test]
async fn test_missing_parameters() {
    let mock = Arc::new(MockIdentityProvider::new());
    let app = app!(mock);

    for query in ["", "next=/settings", "type=signup", "email=a%40b.co"] {
        let response = test::call_service(&app, callback(query).to_request()).await;
        assert_redirect_to(&response, "/auth?error=Missing%20authentication%20parameters");
    }
    assert!(mock.calls().is_empty());
}

#[actix_web::test]
async fn test_replayed_code_fails() {
    let mock = Arc::new(MockIdentityProvider::new().with_code("once"));
    let app = app!(mock);

    let first = test::call_service(&app, callback("code=once").to_request()).await;
    assert_redirect_to(&first, "/");

    let second = test::call_service(&app, callback("code=once").to_request()).await;
    assert_redirect_to(
        &second,
        "/auth?error=Could%20not%20exchange%20code%20for%20session",
    );
    assert_eq!(mock.exchange_calls().len(), 2);
}

#[actix_web::test]
async fn test_code_verifier_cookie_is_forwarded() {
    let mock = Arc::new(MockIdentityProvider::new().with_code("oauth-code"));
    let app = app!(mock);
    let verifier_cookie = TestFixtures::cookie_factory()
        .create_code_verifier_cookie("pkce-verifier")
        .unwrap();

    let response = test::call_service(
        &app,
        callback("code=oauth-code").cookie(verifier_cookie).to_request(),
    )
    .await;

    assert_redirect_to(&response, "/");
    assert_eq!(
        mock.exchange_calls(),
        vec![ProviderCall::ExchangeCode {
            code: "oauth-code".to_string(),
            code_verifier: Some("pkce-verifier".to_string()),
        }]
    );
}

#[actix_web::test]
async fn test_offsite_next_is_replaced() {
    for next in ["https://evil.example/", "//evil.example", "/..%2F..%2Fetc", "settings"] {
        let mock = Arc::new(MockIdentityProvider::new().with_code("good-code"));
        let app = app!(mock);

        let query = format!("code=good-code&next={}", urlencoding::encode(next));
        let response = test::call_service(&app, callback(&query).to_request()).await;
        assert_redirect_to(&response, "/");
    }
}

#[actix_web::test]
async fn test_same_origin_next_with_inner_slashes_is_kept() {
    for next in ["/a//b", "/search?u=https://x"] {
        let mock = Arc::new(MockIdentityProvider::new().with_code("good-code"));
        let app = app!(mock);

        let query = format!("code=good-code&next={}", urlencoding::encode(next));
        let response = test::call_service(&app, callback(&query).to_request()).await;
        assert_redirect_to(&response, next);
    }
}
