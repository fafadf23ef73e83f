//! Auth page view state and markup

pub mod auth_view;
pub mod pages;

pub use auth_view::{AuthView, AuthViewEvent, TRANSITIONS};
pub use pages::escape_html;
