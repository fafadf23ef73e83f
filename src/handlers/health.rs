use crate::models::{HealthCheck, HealthResponse, HealthStatus};
use crate::provider::IdentityProvider;
use actix_web::{web, HttpResponse, Result};
use chrono::{SecondsFormat, Utc};
use log::warn;

/// Liveness endpoint
///
/// # Errors
/// Never fails
pub async fn ping() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: format!("authgate {} is running", crate::VERSION),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Identity backend health: 200 when reachable, 503 otherwise
///
/// # Errors
/// Never fails
pub async fn health(provider: web::Data<dyn IdentityProvider>) -> Result<HttpResponse> {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let check = match provider.health().await {
        Ok(()) => HealthCheck {
            status: HealthStatus::Healthy,
            timestamp,
            message: "Identity backend is accessible and responsive".to_string(),
        },
        Err(e) => {
            warn!("Identity backend health check failed: {e}");
            HealthCheck {
                status: HealthStatus::Unhealthy,
                timestamp,
                message: format!(
                    "Identity backend connection failed: {}",
                    e.message_or_default()
                ),
            }
        }
    };

    Ok(match check.status {
        HealthStatus::Healthy => HttpResponse::Ok().json(check),
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(check),
    })
}
