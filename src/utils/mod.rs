pub mod logging;
pub mod pkce;
pub mod redirect_validator;
pub mod responses;
pub mod site_url;

pub use logging::LoggingHelper;
pub use redirect_validator::sanitize_next;
pub use responses::ResponseBuilder;
pub use site_url::{site_link, site_url};
