//! Assertion helpers for handler responses
//!
//! All helpers take the `ServiceResponse` returned by `test::call_service`.

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};

/// Assert a 302 to exactly `expected`
///
/// # Panics
///
/// Panics if the response is not a redirect to `expected`.
pub fn assert_redirect_to<B>(response: &ServiceResponse<B>, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND, "expected a redirect");
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok());
    assert_eq!(location, Some(expected), "unexpected redirect target");
}

/// Names of cookies set with a non-empty value
#[must_use]
pub fn live_cookie_names<B>(response: &ServiceResponse<B>) -> Vec<String> {
    response
        .response()
        .cookies()
        .filter(|cookie| !cookie.value().is_empty())
        .map(|cookie| cookie.name().to_string())
        .collect()
}

/// Names of cookies the response removes
#[must_use]
pub fn removed_cookie_names<B>(response: &ServiceResponse<B>) -> Vec<String> {
    response
        .response()
        .cookies()
        .filter(|cookie| cookie.value().is_empty())
        .map(|cookie| cookie.name().to_string())
        .collect()
}

/// Assert the response sets a live cookie called `name`
///
/// # Panics
///
/// Panics if no such cookie is set.
pub fn assert_sets_cookie<B>(response: &ServiceResponse<B>, name: &str) {
    let names = live_cookie_names(response);
    assert!(
        names.iter().any(|n| n == name),
        "expected cookie '{name}' in {names:?}"
    );
}

/// Assert the response sets no live cookies at all
///
/// # Panics
///
/// Panics if any cookie with a value is set.
pub fn assert_no_live_cookies<B>(response: &ServiceResponse<B>) {
    let names = live_cookie_names(response);
    assert!(names.is_empty(), "expected no cookies, got {names:?}");
}
