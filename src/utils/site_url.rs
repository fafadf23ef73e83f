use crate::settings::ApplicationSettings;
use actix_web::HttpRequest;

/// Public origin of this site, without a trailing slash.
///
/// The configured `site_url` wins. Otherwise the origin is rebuilt from the
/// request, honouring `Forwarded` and `X-Forwarded-*` headers.
#[must_use]
pub fn site_url(settings: &ApplicationSettings, req: &HttpRequest) -> String {
    if let Some(configured) = settings.site_url.as_deref().filter(|url| !url.is_empty()) {
        return configured.trim_end_matches('/').to_string();
    }
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}

/// `site_url` joined with an absolute path
#[must_use]
pub fn site_link(settings: &ApplicationSettings, req: &HttpRequest, path: &str) -> String {
    format!("{}{path}", site_url(settings, req))
}
