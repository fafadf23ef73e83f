// Centralized logging for the authentication flows.
// Credentials are never written out, only whether they were present.
use crate::models::VerificationRequest;
use crate::provider::ProviderError;
use log::{debug, info, warn};

fn presence(value: Option<&str>) -> &'static str {
    if value.is_some() {
        "present"
    } else {
        "missing"
    }
}

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log which verification parameters arrived with a request
    pub fn log_verification_request(source: &str, request: &VerificationRequest) {
        info!(
            "{source}: code={}, token={}, token_hash={}, email={}, type={:?}, next={}",
            presence(request.code()),
            presence(request.token()),
            presence(request.token_hash()),
            presence(request.email()),
            request.verification_type(),
            request.next()
        );
    }

    pub fn log_exchange_failed(path: &str, err: &ProviderError) {
        warn!("{path} failed: {err}");
    }

    pub fn log_authenticated(path: &str, location: &str, cookie_count: usize) {
        info!("{path} succeeded, redirecting to {location} with {cookie_count} cookies");
    }

    pub fn log_resolution_failed(reason: &str) {
        warn!("Callback resolution failed: {reason}");
    }

    pub fn log_action_failed(action: &str, err: &ProviderError) {
        warn!("Auth action '{action}' failed: {err}");
    }

    pub fn log_action_succeeded(action: &str) {
        info!("Auth action '{action}' succeeded");
    }

    pub fn log_validation_failed(action: &str, message: &str) {
        debug!("Auth action '{action}' rejected input: {message}");
    }
}
